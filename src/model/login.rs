// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use super::cookie::Cookie;

/// Status code the platform reports once the companion device confirmed the QR login.
pub const QR_CODE_CONFIRMED: i64 = 2;
/// Status code for a QR code that timed out before confirmation.
pub const QR_CODE_EXPIRED: i64 = 3;

/// QR descriptor issued by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrCode {
    pub qr_id: String,
    pub code: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrStatus {
    Pending,
    ScannedUnconfirmed,
    Confirmed,
    Cancelled,
    Expired,
}

impl QrStatus {
    /// Codes below the confirmed threshold are pending (`0` waiting, `1` scanned), `2` is
    /// confirmed, `3` expired, anything else is treated as cancelled.
    pub fn from_code(code: i64) -> Self {
        match code {
            QR_CODE_CONFIRMED => Self::Confirmed,
            QR_CODE_EXPIRED => Self::Expired,
            1 => Self::ScannedUnconfirmed,
            code if code < QR_CODE_CONFIRMED => Self::Pending,
            _ => Self::Cancelled,
        }
    }

    pub fn is_pending(self) -> bool {
        matches!(self, Self::Pending | Self::ScannedUnconfirmed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ScannedUnconfirmed => "scanned",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for QrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw poll answer from the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrCheck {
    pub code_status: i64,
    /// Present once the platform has attached a session to the polling client.
    pub cookie: Option<Cookie>,
}

impl QrCheck {
    pub fn status(&self) -> QrStatus {
        QrStatus::from_code(self.code_status)
    }
}

/// Transient phone-login state: created by "send code", consumed by "verify code".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneLogin {
    pub phone: String,
    pub area_code: String,
    pub failed_verifications: u32,
}

impl PhoneLogin {
    pub fn new(phone: impl Into<String>, area_code: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            area_code: area_code.into(),
            failed_verifications: 0,
        }
    }

    pub fn matches(&self, phone: &str, area_code: &str) -> bool {
        self.phone == phone && self.area_code == area_code
    }
}

/// Masks all but the last four digits of a phone number for logs and responses.
pub fn mask_phone(phone: &str) -> String {
    let chars = phone.chars().collect::<Vec<_>>();
    let keep = chars.len().min(4);
    let hidden = chars.len() - keep;
    let mut out = "*".repeat(hidden);
    out.extend(&chars[hidden..]);
    out
}

#[cfg(test)]
mod tests {
    use super::{mask_phone, QrStatus};

    #[test]
    fn qr_codes_below_confirmed_are_pending() {
        assert_eq!(QrStatus::from_code(0), QrStatus::Pending);
        assert_eq!(QrStatus::from_code(1), QrStatus::ScannedUnconfirmed);
        assert_eq!(QrStatus::from_code(-1), QrStatus::Pending);
        assert!(QrStatus::from_code(1).is_pending());
    }

    #[test]
    fn qr_terminal_codes() {
        assert_eq!(QrStatus::from_code(2), QrStatus::Confirmed);
        assert_eq!(QrStatus::from_code(3), QrStatus::Expired);
        assert_eq!(QrStatus::from_code(4), QrStatus::Cancelled);
        assert!(!QrStatus::from_code(3).is_pending());
    }

    #[test]
    fn phone_masking_keeps_last_four() {
        assert_eq!(mask_phone("13800138000"), "*******8000");
        assert_eq!(mask_phone("123"), "123");
    }
}
