// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::{Arc, OnceLock};

use base64::Engine;
use regex::Regex;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::{Json, Parameters};
use rmcp::model::{
    AnnotateAble, ListResourceTemplatesResult, ListResourcesResult, PaginatedRequestParam,
    RawResource, ReadResourceRequestParam, ReadResourceResult, ResourceContents, ResourceTemplate,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{tool, tool_handler, tool_router, ErrorData, RoleServer, ServerHandler, ServiceExt};
use serde_json::{json, Value};

use crate::config::{normalize_area_code, LoginMethod, LoginSettings};
use crate::dispatch::PublishDispatcher;
use crate::model::{mask_phone, PublishRequest, PublishResult, QrStatus, Status};
use crate::session::{AuthError, QrLoginStatus, SessionManager};

use super::types::*;

/// Failed code verifications allowed per sent code.
pub const MAX_VERIFY_ATTEMPTS: u32 = 5;

const USER_URI: &str = "user://";
const NOTE_SCHEME: &str = "note://";
const NOTE_IMAGE_SCHEME: &str = "note-image://";

const PHONE_PATTERN: &str = r"^\d{5,15}$";
const AREA_CODE_PATTERN: &str = r"^\+\d{1,4}$";
const VERIFY_CODE_PATTERN: &str = r"^\d{4,8}$";

static PHONE_REGEX: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
static AREA_CODE_REGEX: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
static VERIFY_CODE_REGEX: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

#[derive(Clone)]
pub struct XhsMcp {
    session: Arc<SessionManager>,
    dispatcher: Arc<PublishDispatcher>,
    login: Arc<LoginSettings>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl XhsMcp {
    pub fn new(
        session: Arc<SessionManager>,
        dispatcher: PublishDispatcher,
        login: LoginSettings,
    ) -> Self {
        Self {
            session,
            dispatcher: Arc::new(dispatcher),
            login: Arc::new(login),
            tool_router: Self::tool_router(),
        }
    }

    pub async fn serve_stdio(self) -> Result<(), rmcp::RmcpError> {
        let service = self.serve((tokio::io::stdin(), tokio::io::stdout())).await?;
        service.waiting().await?;
        Ok(())
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    fn login_hint(&self) -> String {
        match self.login.method {
            LoginMethod::Qrcode => "log in first: call generate_qrcode, scan the code with the \
                                    Xiaohongshu app, then call check_qrcode_status"
                .to_owned(),
            LoginMethod::Phone => {
                "log in first: call login_phone, then verify_code with the code you receive"
                    .to_owned()
            }
        }
    }

    fn suggestion_for(&self, err: &AuthError) -> Option<String> {
        if let Some(hint) = err.suggestion() {
            return Some(hint.to_owned());
        }
        match err {
            AuthError::NotAuthenticated | AuthError::ProbeFailed(_) | AuthError::InvalidCookie(_) => {
                Some(self.login_hint())
            }
            AuthError::NoPendingLogin("qr") => Some("call generate_qrcode first".to_owned()),
            AuthError::NoPendingLogin(_) => Some("call login_phone first".to_owned()),
            AuthError::Platform(_) | AuthError::Storage(_) => None,
        }
    }

    fn error_body(&self, err: &AuthError) -> Value {
        json!({
            "status": Status::Error,
            "error": err.to_string(),
            "suggestion": self.suggestion_for(err),
        })
    }

    fn instructions(&self) -> String {
        let login = match self.login.method {
            LoginMethod::Qrcode => {
                "Login method: QR code (generate_qrcode, then poll check_qrcode_status until it \
                 reports success)."
            }
            LoginMethod::Phone => {
                "Login method: phone code (login_phone, then verify_code with the code received)."
            }
        };
        format!(
            "Xiaohongshu note publisher (tools: publish_text, publish_image, publish_video, \
             generate_qrcode, check_qrcode_status, check_login_status, is_logged_in, login_phone, \
             verify_code; resources: {USER_URI}, {NOTE_SCHEME}{{note_id}}, \
             {NOTE_IMAGE_SCHEME}{{note_id}}). {login}"
        )
    }

    async fn publish(&self, request: PublishRequest) -> PublishResult {
        let client = match self.session.ensure_session().await {
            Ok(client) => client,
            Err(err) => {
                tracing::info!(note_type = %request.kind(), error = %err, "publish without session");
                return PublishResult::failure(request.kind(), err.to_string(), self.suggestion_for(&err));
            }
        };
        self.dispatcher.publish(client.as_ref(), &request).await
    }

    /// Falls back to the configured phone and area code.
    fn resolve_phone(&self, phone: Option<String>, area_code: Option<String>) -> Option<(String, String)> {
        let phone = phone
            .map(|phone| phone.trim().to_owned())
            .filter(|phone| !phone.is_empty())
            .or_else(|| self.login.phone.clone())?;
        let area_code = area_code
            .filter(|code| !code.trim().is_empty())
            .map(|code| normalize_area_code(&code))
            .unwrap_or_else(|| self.login.area_code.clone());
        Some((phone, area_code))
    }

    async fn fetch_note(&self, note_id: &str) -> Result<Value, AuthError> {
        let client = self.session.ensure_session().await?;
        Ok(client.note_by_id(note_id).await?)
    }

    /// Reads `user://`, `note://{note_id}` or `note-image://{note_id}`.
    pub async fn read_resource_uri(&self, uri: &str) -> Result<ReadResourceResult, ErrorData> {
        if uri == USER_URI || uri == "user://me" {
            let body = match self.session.current_user().await {
                Ok(info) => info,
                Err(err) => self.error_body(&err),
            };
            return json_contents(uri, &body);
        }

        if let Some(raw_id) = uri.strip_prefix(NOTE_IMAGE_SCHEME) {
            let note_id = note_id_param(raw_id)?;
            let note = match self.fetch_note(note_id).await {
                Ok(note) => note,
                Err(err) => return json_contents(uri, &self.error_body(&err)),
            };
            let Some(url) = first_image_url(&note) else {
                return json_contents(
                    uri,
                    &json!({"status": Status::Error, "error": format!("note {note_id} has no images")}),
                );
            };
            return match self.dispatcher.stager().fetch_bytes(&url).await {
                Ok(bytes) => blob_contents(uri, sniff_image_mime(&bytes), &bytes),
                Err(err) => json_contents(uri, &json!({"status": Status::Error, "error": err.to_string()})),
            };
        }

        if let Some(raw_id) = uri.strip_prefix(NOTE_SCHEME) {
            let note_id = note_id_param(raw_id)?;
            let body = match self.fetch_note(note_id).await {
                Ok(note) => note,
                Err(err) => self.error_body(&err),
            };
            return json_contents(uri, &body);
        }

        Err(ErrorData::resource_not_found(
            format!("unknown resource uri: {uri}"),
            None,
        ))
    }

    /// Publish a text-only note; `topics` are attached as topic tags.
    #[tool(name = "publish_text")]
    async fn publish_text(
        &self,
        params: Parameters<PublishTextParams>,
    ) -> Result<Json<PublishResult>, ErrorData> {
        let PublishTextParams { content, topics } = params.0;
        Ok(Json(self.publish(PublishRequest::text(content, topics)).await))
    }

    /// Publish an image note; `image_paths` takes local paths and http(s) URLs (at least one).
    /// Images that fail to download are skipped; the call fails if none are left.
    #[tool(name = "publish_image")]
    async fn publish_image(
        &self,
        params: Parameters<PublishImageParams>,
    ) -> Result<Json<PublishResult>, ErrorData> {
        let PublishImageParams {
            content,
            image_paths,
            topics,
        } = params.0;
        Ok(Json(
            self.publish(PublishRequest::image(content, image_paths.as_slice(), topics))
                .await,
        ))
    }

    /// Publish a video note from a local video file, with an optional local cover image.
    #[tool(name = "publish_video")]
    async fn publish_video(
        &self,
        params: Parameters<PublishVideoParams>,
    ) -> Result<Json<PublishResult>, ErrorData> {
        let PublishVideoParams {
            content,
            video_path,
            cover_path,
            topics,
        } = params.0;
        let request = PublishRequest::video(content, video_path, cover_path.map(Into::into), topics);
        Ok(Json(self.publish(request).await))
    }

    /// Start a QR login; show `qr_url` to the user, then poll `check_qrcode_status`.
    #[tool(name = "generate_qrcode")]
    async fn generate_qrcode(&self) -> Result<Json<QrCodeResponse>, ErrorData> {
        let response = match self.session.start_qr_login().await {
            Ok(qr) => QrCodeResponse {
                status: Status::Success,
                message: "scan the QR code with the Xiaohongshu app, then call check_qrcode_status \
                          with qr_id and qr_code"
                    .to_owned(),
                qr_url: Some(qr.url),
                qr_id: Some(qr.qr_id),
                qr_code: Some(qr.code),
                error: None,
                suggestion: None,
            },
            Err(err) => QrCodeResponse {
                status: Status::Error,
                message: "failed to generate QR code".to_owned(),
                qr_url: None,
                qr_id: None,
                qr_code: None,
                error: Some(err.to_string()),
                suggestion: self.suggestion_for(&err),
            },
        };
        Ok(Json(response))
    }

    /// Check a QR login once; returns `pending` until the code is confirmed in the app.
    #[tool(name = "check_qrcode_status")]
    async fn check_qrcode_status(
        &self,
        params: Parameters<CheckQrcodeStatusParams>,
    ) -> Result<Json<LoginStatusResponse>, ErrorData> {
        let CheckQrcodeStatusParams { qr_id, qr_code } = params.0;
        let response = match self.session.poll_qr_login(&qr_id, &qr_code).await {
            Ok(QrLoginStatus::Pending(status)) => {
                let message = if status == QrStatus::ScannedUnconfirmed {
                    "scanned; waiting for confirmation in the app"
                } else {
                    "waiting for the QR code to be scanned"
                };
                LoginStatusResponse::pending(message).with_qr_status(status.as_str())
            }
            Ok(QrLoginStatus::Success(user_info)) => {
                LoginStatusResponse::success("login successful", user_info)
                    .with_qr_status(QrStatus::Confirmed.as_str())
            }
            Ok(QrLoginStatus::Failed(status)) => LoginStatusResponse::error(
                "QR login did not complete",
                format!("qr code {status}"),
                Some("call generate_qrcode for a new code".to_owned()),
            )
            .with_qr_status(status.as_str()),
            Err(err) => LoginStatusResponse::error(
                "QR login failed",
                err.to_string(),
                self.suggestion_for(&err),
            ),
        };
        Ok(Json(response))
    }

    /// Verify the current session against the platform and return the account profile.
    #[tool(name = "check_login_status")]
    async fn check_login_status(&self) -> Result<Json<LoginStatusResponse>, ErrorData> {
        let response = match self.session.current_user().await {
            Ok(user_info) => LoginStatusResponse::success("logged in", user_info),
            Err(err) => {
                LoginStatusResponse::error("not logged in", err.to_string(), self.suggestion_for(&err))
            }
        };
        Ok(Json(response))
    }

    /// Cheap yes/no login check.
    #[tool(name = "is_logged_in")]
    async fn is_logged_in(&self) -> Result<Json<LoggedInResponse>, ErrorData> {
        Ok(Json(LoggedInResponse {
            logged_in: self.session.is_logged_in().await,
        }))
    }

    /// Send a login code by text message; `phone`/`area_code` default to the configured values.
    #[tool(name = "login_phone")]
    async fn login_phone(
        &self,
        params: Parameters<LoginPhoneParams>,
    ) -> Result<Json<PhoneCodeResponse>, ErrorData> {
        let LoginPhoneParams { phone, area_code } = params.0;
        let failure = |error: String, suggestion: Option<String>| PhoneCodeResponse {
            status: Status::Error,
            message: "cannot send verification code".to_owned(),
            data: None,
            error: Some(error),
            suggestion,
        };

        let Some((phone, area_code)) = self.resolve_phone(phone, area_code) else {
            return Ok(Json(failure(
                "no phone number given and none configured".to_owned(),
                Some("pass phone or set XHS_PHONE".to_owned()),
            )));
        };
        if let Some(problem) = phone_problem(&phone, &area_code)? {
            return Ok(Json(failure(problem, None)));
        }

        let response = match self.session.send_phone_code(&phone, &area_code).await {
            Ok(()) => PhoneCodeResponse {
                status: Status::Pending,
                message: "verification code sent; call verify_code with the code".to_owned(),
                data: Some(PhoneCodeData {
                    phone: mask_phone(&phone),
                    area_code,
                }),
                error: None,
                suggestion: None,
            },
            Err(err) => failure(err.to_string(), self.suggestion_for(&err)),
        };
        Ok(Json(response))
    }

    /// Complete a phone login with the received code. Up to five wrong codes are accepted
    /// before a new code has to be requested.
    #[tool(name = "verify_code")]
    async fn verify_code(
        &self,
        params: Parameters<VerifyCodeParams>,
    ) -> Result<Json<LoginStatusResponse>, ErrorData> {
        let VerifyCodeParams {
            code,
            phone,
            area_code,
        } = params.0;
        const FAILED: &str = "verification failed";

        let Some((phone, area_code)) = self.resolve_phone(phone, area_code) else {
            return Ok(Json(LoginStatusResponse::error(
                FAILED,
                "no phone number given and none configured",
                Some("pass phone or set XHS_PHONE".to_owned()),
            )));
        };
        if let Some(problem) = phone_problem(&phone, &area_code)? {
            return Ok(Json(LoginStatusResponse::error(FAILED, problem, None)));
        }
        let code = code.trim();
        if !pattern_matches(&VERIFY_CODE_REGEX, VERIFY_CODE_PATTERN, code)? {
            return Ok(Json(LoginStatusResponse::error(
                FAILED,
                "verification code must be 4 to 8 digits",
                None,
            )));
        }

        let attempt = self
            .session
            .phone_attempt()
            .await
            .filter(|attempt| attempt.matches(&phone, &area_code));
        if attempt.is_some_and(|attempt| attempt.failed_verifications >= MAX_VERIFY_ATTEMPTS) {
            self.session.discard_phone_login().await;
            tracing::info!(phone = %mask_phone(&phone), "phone login locked after repeated failures");
            return Ok(Json(LoginStatusResponse::error(
                FAILED,
                "too many failed verification attempts",
                Some("request a new code with login_phone".to_owned()),
            )));
        }

        let response = match self.session.verify_phone_code(&phone, code, &area_code).await {
            Ok(user_info) => LoginStatusResponse::success("login successful", user_info),
            Err(err) => {
                let attempts_left = self
                    .session
                    .phone_attempt()
                    .await
                    .filter(|attempt| attempt.matches(&phone, &area_code))
                    .map(|attempt| MAX_VERIFY_ATTEMPTS.saturating_sub(attempt.failed_verifications));
                let mut response =
                    LoginStatusResponse::error(FAILED, err.to_string(), self.suggestion_for(&err));
                response.attempts_left = attempts_left;
                response
            }
        };
        Ok(Json(response))
    }
}

#[tool_handler]
impl ServerHandler for XhsMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(self.instructions()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let mut user = RawResource::new(USER_URI, "current-user");
        user.description = Some("Profile of the logged-in account".to_owned());
        user.mime_type = Some("application/json".to_owned());
        Ok(ListResourcesResult::with_all_items(vec![user.no_annotation()]))
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, ErrorData> {
        Ok(ListResourceTemplatesResult::with_all_items(
            resource_templates()?,
        ))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        self.read_resource_uri(&request.uri).await
    }
}

include!("server/helpers.rs");
