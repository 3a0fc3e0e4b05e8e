// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Capability interface to the content platform.
//!
//! Session and publish logic depend only on [`PlatformClient`] and [`PlatformConnector`]; the
//! reqwest-backed implementation lives in [`http`] and tests substitute an in-memory double.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::model::{Cookie, NoteDraft, QrCheck, QrCode};

pub mod http;
pub mod jar;
pub mod sign;

#[cfg(test)]
pub(crate) mod testing;

pub use http::{HttpConnector, HttpPlatformClient};
pub use jar::CookieJar;
pub use sign::{SignHeaders, SignService};

pub const SIGN_SUGGESTION: &str = "the request signing service may be failing; check XHS_SIGN_URL \
     or set XHS_USE_SIGN=false to disable signing";

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("platform rejected {endpoint} (code {code:?}): {message}")]
    Rejected {
        endpoint: String,
        code: Option<i64>,
        message: String,
    },
    #[error("unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
    #[error("sign service error: {0}")]
    Sign(String),
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("platform returned a QR code without a url")]
    MissingQrUrl,
}

impl PlatformError {
    pub fn rejected(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            endpoint: endpoint.into(),
            code: None,
            message: message.into(),
        }
    }

    /// Best-effort remediation hint derived from the rendered error text.
    pub fn suggestion(&self) -> Option<&'static str> {
        remediation_hint(&self.to_string())
    }
}

/// Heuristic: any mention of signing points at the sign service.
pub fn remediation_hint(error_text: &str) -> Option<&'static str> {
    error_text
        .to_ascii_lowercase()
        .contains("sign")
        .then_some(SIGN_SUGGESTION)
}

/// Authenticated (or guest) operations against the platform.
///
/// Result payloads are passed through as JSON; callers only pick out the handful of fields they
/// need and never assume a fixed shape.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn self_info(&self) -> Result<Value, PlatformError>;

    async fn note_by_id(&self, note_id: &str) -> Result<Value, PlatformError>;

    async fn create_text_note(&self, note: &NoteDraft) -> Result<Value, PlatformError>;

    async fn create_image_note(
        &self,
        note: &NoteDraft,
        images: &[PathBuf],
    ) -> Result<Value, PlatformError>;

    async fn create_video_note(
        &self,
        note: &NoteDraft,
        video: &Path,
        cover: Option<&Path>,
    ) -> Result<Value, PlatformError>;

    async fn create_qrcode(&self) -> Result<QrCode, PlatformError>;

    /// A single, non-blocking status check.
    async fn check_qrcode(&self, qr_id: &str, code: &str) -> Result<QrCheck, PlatformError>;

    async fn send_code(&self, phone: &str, area_code: &str) -> Result<(), PlatformError>;

    /// Exchanges a one-time code for a session cookie.
    async fn login_code(
        &self,
        phone: &str,
        code: &str,
        area_code: &str,
    ) -> Result<Cookie, PlatformError>;
}

/// Builds clients bound to a cookie, or guest clients when none is given.
pub trait PlatformConnector: Send + Sync {
    fn connect(&self, cookie: Option<&Cookie>) -> Result<Arc<dyn PlatformClient>, PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::{remediation_hint, PlatformError, SIGN_SUGGESTION};

    #[test]
    fn sign_errors_carry_a_suggestion() {
        let err = PlatformError::Sign("connection refused".to_owned());
        assert_eq!(err.suggestion(), Some(SIGN_SUGGESTION));
    }

    #[test]
    fn hint_matches_case_insensitively() {
        assert!(remediation_hint("X-Sign header invalid").is_some());
        assert!(remediation_hint("network unreachable").is_none());
    }

    #[test]
    fn rejected_without_sign_text_has_no_hint() {
        let err = PlatformError::rejected("/api/x", "quota exceeded");
        assert!(err.suggestion().is_none());
    }
}
