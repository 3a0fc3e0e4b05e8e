// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::PlatformError;

const SIGN_TIMEOUT: Duration = Duration::from_secs(10);

/// Request signature headers (`x-s`, `x-t`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignHeaders {
    pub x_s: String,
    pub x_t: String,
}

#[derive(Serialize)]
struct SignRequest<'a> {
    uri: &'a str,
    data: Option<&'a Value>,
    a1: &'a str,
    web_session: &'a str,
}

/// External signing endpoint; POSTs the request shape and reads back the signature headers.
#[derive(Debug, Clone)]
pub struct SignService {
    url: String,
    http: reqwest::Client,
}

impl SignService {
    pub fn new(url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            http,
        }
    }

    pub async fn sign(
        &self,
        uri: &str,
        data: Option<&Value>,
        a1: &str,
        web_session: &str,
    ) -> Result<SignHeaders, PlatformError> {
        let body = SignRequest {
            uri,
            data,
            a1,
            web_session,
        };
        let response = self
            .http
            .post(&self.url)
            .timeout(SIGN_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|err| PlatformError::Sign(err.to_string()))?;
        if !response.status().is_success() {
            return Err(PlatformError::Sign(format!(
                "{} answered {}",
                self.url,
                response.status()
            )));
        }
        let payload = response
            .json::<Value>()
            .await
            .map_err(|err| PlatformError::Sign(err.to_string()))?;
        parse_sign_payload(&payload)
    }
}

/// Accepts `{"x-s": .., "x-t": ..}` either at the top level or under `data`.
pub(crate) fn parse_sign_payload(payload: &Value) -> Result<SignHeaders, PlatformError> {
    let source = match payload.get("data") {
        Some(data) if data.is_object() => data,
        _ => payload,
    };
    let x_s = header_text(source, "x-s")
        .ok_or_else(|| PlatformError::Sign("response lacks x-s".to_owned()))?;
    let x_t = header_text(source, "x-t")
        .ok_or_else(|| PlatformError::Sign("response lacks x-t".to_owned()))?;
    Ok(SignHeaders { x_s, x_t })
}

fn header_text(source: &Value, key: &str) -> Option<String> {
    match source.get(key)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
