// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

/// Sub-tokens the platform embeds in every authenticated cookie string.
///
/// `a1` is the device identity, `web_session` the login session and `webId` the browser id.
pub const REQUIRED_COOKIE_TOKENS: [&str; 3] = ["a1", "web_session", "webId"];

/// Opaque session credential as emitted by the platform (`k=v; k=v; ...`).
///
/// The blob is never parsed into a structure here; validity is a substring check only and the
/// value is replaced wholesale on every successful login.
#[derive(Clone, PartialEq, Eq)]
pub struct Cookie(String);

impl Cookie {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// True iff every token in `required` occurs somewhere in the blob.
    pub fn is_valid_with(&self, required: &[&str]) -> bool {
        required.iter().all(|token| self.0.contains(token))
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_with(&REQUIRED_COOKIE_TOKENS)
    }

    /// Loggable summary that never reveals token values.
    pub fn redacted(&self) -> String {
        let present = REQUIRED_COOKIE_TOKENS
            .iter()
            .filter(|token| self.0.contains(*token))
            .copied()
            .collect::<Vec<_>>();
        format!("cookie({} bytes, tokens=[{}])", self.0.len(), present.join(","))
    }
}

// Keep the raw blob out of `{:?}` output.
impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl From<String> for Cookie {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Cookie {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
