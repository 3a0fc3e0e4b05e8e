// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::Status;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PublishTextParams {
    /// Note body.
    pub content: String,
    /// Topic tags, with or without a leading `#`.
    #[serde(default)]
    pub topics: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PublishImageParams {
    pub content: String,
    /// Local file paths or http(s) URLs; remote images are downloaded for the duration of the call.
    pub image_paths: Vec<String>,
    #[serde(default)]
    pub topics: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PublishVideoParams {
    pub content: String,
    /// Local path of the video file.
    pub video_path: String,
    /// Optional local path of a cover image.
    #[serde(default)]
    pub cover_path: Option<String>,
    #[serde(default)]
    pub topics: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CheckQrcodeStatusParams {
    pub qr_id: String,
    pub qr_code: String,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct LoginPhoneParams {
    /// Defaults to the configured phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Defaults to the configured area code (`+86` unless overridden).
    #[serde(default)]
    pub area_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct VerifyCodeParams {
    /// The code received by text message.
    pub code: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub area_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QrCodeResponse {
    pub status: Status,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Shared by the QR poll, the login check and phone-code verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LoginStatusResponse {
    pub status: Status,
    pub message: String,
    /// QR state as last reported: `pending`, `scanned`, `confirmed`, `cancelled` or `expired`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<Value>,
    /// Remaining verification attempts for the current phone code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts_left: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl LoginStatusResponse {
    pub fn success(message: impl Into<String>, user_info: Value) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
            qr_status: None,
            user_info: Some(user_info),
            attempts_left: None,
            error: None,
            suggestion: None,
        }
    }

    pub fn pending(message: impl Into<String>) -> Self {
        Self {
            status: Status::Pending,
            message: message.into(),
            qr_status: None,
            user_info: None,
            attempts_left: None,
            error: None,
            suggestion: None,
        }
    }

    pub fn error(
        message: impl Into<String>,
        error: impl Into<String>,
        suggestion: Option<String>,
    ) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
            qr_status: None,
            user_info: None,
            attempts_left: None,
            error: Some(error.into()),
            suggestion,
        }
    }

    pub fn with_qr_status(mut self, qr_status: &str) -> Self {
        self.qr_status = Some(qr_status.to_owned());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PhoneCodeData {
    /// Masked to the last four digits.
    pub phone: String,
    pub area_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PhoneCodeResponse {
    pub status: Status,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PhoneCodeData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LoggedInResponse {
    pub logged_in: bool,
}
