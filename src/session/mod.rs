// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Session lifecycle for one account.
//!
//! A [`SessionManager`] owns the account's active [`PlatformClient`] and mediates the two
//! human-paced login flows (QR and phone code). Each flow is split into independently callable
//! steps; nothing here loops or sleeps waiting on a human.
//!
//! All mutation goes through one `tokio::sync::Mutex`. The lock is never held across a platform
//! call: callers snapshot an `Arc<dyn PlatformClient>` and work against it, so a publish always
//! sees one consistent session even if a login completes concurrently.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::model::{mask_phone, AccountId, Cookie, PhoneLogin, QrCode, QrStatus};
use crate::platform::{remediation_hint, PlatformClient, PlatformConnector, PlatformError};
use crate::store::{CookieStore, StoreError};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no authenticated session")]
    NotAuthenticated,
    #[error("session probe failed: {0}")]
    ProbeFailed(String),
    #[error("cookie is missing required tokens: {0}")]
    InvalidCookie(String),
    #[error("no {0} login is in progress")]
    NoPendingLogin(&'static str),
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl AuthError {
    pub fn suggestion(&self) -> Option<&'static str> {
        remediation_hint(&self.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NoSession,
    Probing,
    Authenticated,
    QrPending,
    PhoneCodeSent,
}

/// Outcome of a single QR poll.
#[derive(Debug, Clone, PartialEq)]
pub enum QrLoginStatus {
    Pending(QrStatus),
    /// Confirmed, persisted and probed; carries the self-info payload.
    Success(Value),
    /// Cancelled or expired; the attempt is gone.
    Failed(QrStatus),
}

#[derive(Clone, Copy)]
enum LoginRoute {
    Qr,
    Phone,
}

impl LoginRoute {
    fn as_str(self) -> &'static str {
        match self {
            Self::Qr => "qr",
            Self::Phone => "phone",
        }
    }
}

struct QrAttempt {
    qr: QrCode,
    client: Arc<dyn PlatformClient>,
}

struct PhoneAttempt {
    login: PhoneLogin,
    client: Arc<dyn PlatformClient>,
}

struct SessionState {
    phase: SessionPhase,
    client: Option<Arc<dyn PlatformClient>>,
    cookie: Option<Cookie>,
    qr: Option<QrAttempt>,
    phone: Option<PhoneAttempt>,
    // Bumped on every install or drop; a probe only applies its outcome if this is unchanged.
    generation: u64,
}

impl SessionState {
    fn new() -> Self {
        Self {
            phase: SessionPhase::NoSession,
            client: None,
            cookie: None,
            qr: None,
            phone: None,
            generation: 0,
        }
    }

    fn install(&mut self, client: Arc<dyn PlatformClient>, cookie: Cookie) {
        self.phase = SessionPhase::Authenticated;
        self.client = Some(client);
        self.cookie = Some(cookie);
        self.qr = None;
        self.phone = None;
        self.generation += 1;
    }

    fn drop_session(&mut self) {
        self.client = None;
        self.cookie = None;
        if matches!(
            self.phase,
            SessionPhase::Authenticated | SessionPhase::Probing
        ) {
            self.phase = SessionPhase::NoSession;
        }
        self.generation += 1;
    }

    fn leave_login(&mut self, pending: SessionPhase) {
        if self.phase == pending {
            self.phase = SessionPhase::NoSession;
        }
    }
}

pub struct SessionManager {
    account: AccountId,
    store: CookieStore,
    connector: Arc<dyn PlatformConnector>,
    state: Mutex<SessionState>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("account", &self.account)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Builds a manager without touching disk or network.
    pub fn new(account: AccountId, store: CookieStore, connector: Arc<dyn PlatformConnector>) -> Self {
        Self {
            account,
            store,
            connector,
            state: Mutex::new(SessionState::new()),
        }
    }

    /// Builds a manager and attempts to restore the persisted session.
    ///
    /// A missing, malformed or rejected cookie leaves the manager in [`SessionPhase::NoSession`];
    /// no interactive login is started.
    pub async fn open(
        account: AccountId,
        store: CookieStore,
        connector: Arc<dyn PlatformConnector>,
    ) -> Self {
        let manager = Self::new(account, store, connector);
        match manager.restore().await {
            Ok(_) => tracing::info!(account = %manager.account, "restored persisted session"),
            Err(err) => tracing::info!(account = %manager.account, reason = %err, "starting without a session"),
        }
        manager
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn store(&self) -> &CookieStore {
        &self.store
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.lock().await.phase
    }

    pub async fn pending_qr(&self) -> Option<QrCode> {
        self.state.lock().await.qr.as_ref().map(|attempt| attempt.qr.clone())
    }

    pub async fn phone_attempt(&self) -> Option<PhoneLogin> {
        self.state
            .lock()
            .await
            .phone
            .as_ref()
            .map(|attempt| attempt.login.clone())
    }

    pub async fn discard_phone_login(&self) {
        let mut state = self.state.lock().await;
        state.phone = None;
        state.leave_login(SessionPhase::PhoneCodeSent);
    }

    /// The authenticated client, restoring it from the cookie store when needed.
    pub async fn ensure_session(&self) -> Result<Arc<dyn PlatformClient>, AuthError> {
        {
            let state = self.state.lock().await;
            if state.phase == SessionPhase::Authenticated {
                if let Some(client) = &state.client {
                    return Ok(Arc::clone(client));
                }
            }
        }
        self.restore().await
    }

    /// `load -> is_valid -> probe`. Storage errors count as "no cookie".
    pub async fn restore(&self) -> Result<Arc<dyn PlatformClient>, AuthError> {
        self.restore_with_info().await.map(|(client, _)| client)
    }

    /// Like [`Self::restore`], also returning the self-info fetched while checking the cookie.
    async fn restore_with_info(&self) -> Result<(Arc<dyn PlatformClient>, Value), AuthError> {
        let cookie = match self.store.load(&self.account) {
            Ok(Some(cookie)) => cookie,
            Ok(None) => return Err(AuthError::NotAuthenticated),
            Err(err) => {
                tracing::warn!(account = %self.account, error = %err, "cannot read stored cookie");
                return Err(AuthError::NotAuthenticated);
            }
        };
        if !cookie.is_valid() {
            return Err(AuthError::InvalidCookie(cookie.redacted()));
        }

        let generation = {
            let mut state = self.state.lock().await;
            if state.phase == SessionPhase::NoSession {
                state.phase = SessionPhase::Probing;
            }
            state.generation
        };

        let outcome = match self.connector.connect(Some(&cookie)) {
            Ok(client) => probe(client.as_ref()).await.map(|info| (client, info)),
            Err(err) => Err(err.into()),
        };

        let mut state = self.state.lock().await;
        let current = state.generation == generation;
        match outcome {
            Ok((client, info)) => {
                if current {
                    let (qr, phone) = (state.qr.take(), state.phone.take());
                    state.install(Arc::clone(&client), cookie);
                    // A restore does not cancel a login the caller started meanwhile.
                    state.qr = qr;
                    state.phone = phone;
                }
                Ok((client, info))
            }
            Err(err) => {
                if current {
                    if state.phase == SessionPhase::Probing {
                        state.phase = SessionPhase::NoSession;
                    }
                    state.client = None;
                    state.cookie = None;
                }
                tracing::debug!(account = %self.account, error = %err, "stored session rejected");
                Err(err)
            }
        }
    }

    /// Requests a fresh QR code on a guest client and remembers the attempt.
    pub async fn start_qr_login(&self) -> Result<QrCode, AuthError> {
        let client = self.connector.connect(None)?;
        let qr = client.create_qrcode().await?;
        if qr.url.trim().is_empty() {
            return Err(PlatformError::MissingQrUrl.into());
        }

        let mut state = self.state.lock().await;
        state.qr = Some(QrAttempt {
            qr: qr.clone(),
            client,
        });
        if state.phase != SessionPhase::Authenticated {
            state.phase = SessionPhase::QrPending;
        }
        tracing::info!(account = %self.account, qr_id = %qr.qr_id, "qr login started");
        Ok(qr)
    }

    /// Exactly one status check against the platform.
    pub async fn poll_qr_login(&self, qr_id: &str, code: &str) -> Result<QrLoginStatus, AuthError> {
        let client = {
            let state = self.state.lock().await;
            match &state.qr {
                Some(attempt) if attempt.qr.qr_id == qr_id && attempt.qr.code == code => {
                    Arc::clone(&attempt.client)
                }
                _ => return Err(AuthError::NoPendingLogin(LoginRoute::Qr.as_str())),
            }
        };

        let check = client.check_qrcode(qr_id, code).await?;
        let status = check.status();
        tracing::debug!(qr_id, code_status = check.code_status, status = %status, "qr polled");
        match status {
            _ if status.is_pending() => Ok(QrLoginStatus::Pending(status)),
            QrStatus::Confirmed => {
                let cookie = check.cookie.unwrap_or_else(|| Cookie::new(""));
                self.complete_login(cookie, LoginRoute::Qr)
                    .await
                    .map(QrLoginStatus::Success)
            }
            _ => {
                let mut state = self.state.lock().await;
                state.qr = None;
                state.leave_login(SessionPhase::QrPending);
                Ok(QrLoginStatus::Failed(status))
            }
        }
    }

    /// Asks the platform to text a one-time code. Nothing is persisted.
    pub async fn send_phone_code(&self, phone: &str, area_code: &str) -> Result<(), AuthError> {
        let client = self.connector.connect(None)?;
        client.send_code(phone, area_code).await?;

        let login = PhoneLogin::new(phone, area_code);
        let mut state = self.state.lock().await;
        state.phone = Some(PhoneAttempt { login, client });
        if state.phase != SessionPhase::Authenticated {
            state.phase = SessionPhase::PhoneCodeSent;
        }
        tracing::info!(account = %self.account, phone = %mask_phone(phone), "phone code sent");
        Ok(())
    }

    /// Exchanges the code for a cookie. Failures are counted on the attempt, which stays
    /// available for another try; bounding the retries is up to the caller.
    pub async fn verify_phone_code(
        &self,
        phone: &str,
        code: &str,
        area_code: &str,
    ) -> Result<Value, AuthError> {
        let client = {
            let state = self.state.lock().await;
            match &state.phone {
                Some(attempt) if attempt.login.matches(phone, area_code) => {
                    Arc::clone(&attempt.client)
                }
                _ => return Err(AuthError::NoPendingLogin(LoginRoute::Phone.as_str())),
            }
        };

        match client.login_code(phone, code, area_code).await {
            Ok(cookie) => self.complete_login(cookie, LoginRoute::Phone).await,
            Err(err) => {
                self.abandon(LoginRoute::Phone).await;
                Err(err.into())
            }
        }
    }

    /// Best-effort probe; every failure reads as `false`.
    pub async fn is_logged_in(&self) -> bool {
        self.current_user().await.is_ok()
    }

    /// Self-info of the active session. A failed probe drops the session.
    pub async fn current_user(&self) -> Result<Value, AuthError> {
        let (client, generation) = {
            let state = self.state.lock().await;
            let client = match state.phase {
                SessionPhase::Authenticated => state.client.clone(),
                _ => None,
            };
            (client, state.generation)
        };
        // A fresh restore has just fetched the self-info; its answer is current.
        let Some(client) = client else {
            return self.restore_with_info().await.map(|(_, info)| info);
        };

        match probe(client.as_ref()).await {
            Ok(info) => Ok(info),
            Err(err) => {
                let mut state = self.state.lock().await;
                if state.generation == generation && state.client.is_some() {
                    state.drop_session();
                    tracing::info!(account = %self.account, error = %err, "session no longer valid");
                }
                Err(err)
            }
        }
    }

    /// Validates, probes, persists and installs a cookie obtained from a login flow.
    async fn complete_login(&self, cookie: Cookie, route: LoginRoute) -> Result<Value, AuthError> {
        if cookie.is_empty() || !cookie.is_valid() {
            self.abandon(route).await;
            return Err(AuthError::InvalidCookie(cookie.redacted()));
        }

        let client = match self.connector.connect(Some(&cookie)) {
            Ok(client) => client,
            Err(err) => {
                self.abandon(route).await;
                return Err(err.into());
            }
        };
        let info = match probe(client.as_ref()).await {
            Ok(info) => info,
            Err(err) => {
                self.abandon(route).await;
                return Err(err);
            }
        };
        if let Err(err) = self.store.save(&self.account, &cookie) {
            self.abandon(route).await;
            return Err(err.into());
        }

        self.state.lock().await.install(client, cookie);
        tracing::info!(account = %self.account, route = route.as_str(), "login completed");
        Ok(info)
    }

    async fn abandon(&self, route: LoginRoute) {
        let mut state = self.state.lock().await;
        match route {
            LoginRoute::Qr => {
                state.qr = None;
                state.leave_login(SessionPhase::QrPending);
            }
            LoginRoute::Phone => {
                if let Some(attempt) = state.phone.as_mut() {
                    attempt.login.failed_verifications += 1;
                }
                state.leave_login(SessionPhase::PhoneCodeSent);
            }
        }
    }
}

/// A session is live iff self-info answers with a non-empty nickname.
pub async fn probe(client: &dyn PlatformClient) -> Result<Value, AuthError> {
    let info = client.self_info().await?;
    if has_nickname(&info) {
        Ok(info)
    } else {
        Err(AuthError::ProbeFailed("self-info returned no nickname".to_owned()))
    }
}

fn has_nickname(info: &Value) -> bool {
    let nickname = info
        .get("nickname")
        .or_else(|| info.get("basic_info").and_then(|basic| basic.get("nickname")));
    nickname
        .and_then(Value::as_str)
        .is_some_and(|nickname| !nickname.trim().is_empty())
}
