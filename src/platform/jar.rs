// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::model::Cookie;

/// Ordered `name=value` pairs backing a flat cookie header.
///
/// Only the HTTP client uses this; everywhere else the cookie stays an opaque blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    pairs: Vec<(String, String)>,
}

impl CookieJar {
    pub fn parse(raw: &str) -> Self {
        let mut jar = Self::default();
        for item in raw.split(';') {
            if let Some((name, value)) = item.trim().split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    jar.set(name, value.trim());
                }
            }
        }
        jar
    }

    pub fn from_cookie(cookie: Option<&Cookie>) -> Self {
        cookie.map(|cookie| Self::parse(cookie.as_str())).unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set(&mut self, name: &str, value: &str) {
        match self.pairs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_owned(),
            None => self.pairs.push((name.to_owned(), value.to_owned())),
        }
    }

    /// Merges the leading `name=value` of a `Set-Cookie` header value.
    pub fn absorb_set_cookie(&mut self, header: &str) {
        let Some(first) = header.split(';').next() else {
            return;
        };
        if let Some((name, value)) = first.trim().split_once('=') {
            let name = name.trim();
            if !name.is_empty() {
                self.set(name, value.trim());
            }
        }
    }

    /// Seeds the device tokens a guest session needs before it can log in.
    pub fn seed_guest_identity(&mut self) {
        if self.get("a1").is_none() {
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis();
            let mut a1 = format!(
                "{millis:x}{}{}",
                uuid::Uuid::new_v4().simple(),
                uuid::Uuid::new_v4().simple()
            );
            a1.truncate(52);
            self.set("a1", &a1);
        }
        if self.get("webId").is_none() {
            self.set("webId", &uuid::Uuid::new_v4().simple().to_string());
        }
    }

    pub fn header_value(&self) -> String {
        self.pairs
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn to_cookie(&self) -> Cookie {
        Cookie::new(self.header_value())
    }
}

#[cfg(test)]
mod tests {
    use super::CookieJar;

    #[test]
    fn parse_keeps_order_and_last_value_wins() {
        let jar = CookieJar::parse("a1=x; webId=y;a1=z; broken; =skip");
        assert_eq!(jar.header_value(), "a1=z; webId=y");
    }

    #[test]
    fn absorb_set_cookie_ignores_attributes() {
        let mut jar = CookieJar::parse("a1=x");
        jar.absorb_set_cookie("web_session=040069; Path=/; HttpOnly; Domain=.example.com");
        assert_eq!(jar.get("web_session"), Some("040069"));
        assert_eq!(jar.header_value(), "a1=x; web_session=040069");
    }

    #[test]
    fn guest_identity_only_fills_missing_tokens() {
        let mut jar = CookieJar::parse("a1=keep");
        jar.seed_guest_identity();
        assert_eq!(jar.get("a1"), Some("keep"));
        assert_eq!(jar.get("webId").map(str::len), Some(32));

        let mut fresh = CookieJar::default();
        fresh.seed_guest_identity();
        assert_eq!(fresh.get("a1").map(str::len), Some(52));
    }

    #[test]
    fn values_may_contain_equals_signs() {
        let jar = CookieJar::parse("gid.sign=PSF1M3U6EBC/Jv6eGddPbmsWzLI=; a1=1");
        assert_eq!(jar.get("gid.sign"), Some("PSF1M3U6EBC/Jv6eGddPbmsWzLI="));
    }
}
