// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Scripted in-memory platform used by unit tests.

use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{PlatformClient, PlatformConnector, PlatformError};
use crate::model::{Cookie, NoteDraft, QrCheck, QrCode};

pub(crate) const GOOD_COOKIE: &str = "a1=dev; webId=web; web_session=good";
pub(crate) const OTHER_COOKIE: &str = "a1=dev; webId=web; web_session=other";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Connect(Option<String>),
    SelfInfo,
    NoteById(String),
    CreateText { content: String, topics: Vec<String> },
    CreateImage { images: Vec<PathBuf> },
    CreateVideo { video: PathBuf, cover: Option<PathBuf> },
    CreateQrcode,
    CheckQrcode { qr_id: String, code: String },
    SendCode { phone: String, area_code: String },
    LoginCode { phone: String, code: String, area_code: String },
}

#[derive(Debug)]
pub(crate) struct Script {
    /// Cookies for which the self-info probe answers with a nickname.
    pub accepted_cookies: BTreeSet<String>,
    pub self_info_error: Option<String>,
    pub qr: Result<QrCode, String>,
    pub qr_checks: VecDeque<Result<QrCheck, String>>,
    pub send_code: Result<(), String>,
    pub login_code: Result<Cookie, String>,
    pub create: Result<Value, String>,
    pub note: Option<Value>,
    pub calls: Vec<Call>,
    /// Image paths as they existed on disk while the create call ran.
    pub images_seen_existing: Vec<bool>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            accepted_cookies: BTreeSet::from([GOOD_COOKIE.to_owned()]),
            self_info_error: None,
            qr: Ok(QrCode {
                qr_id: "qr-1".to_owned(),
                code: "c-1".to_owned(),
                url: "https://example.invalid/qr/1".to_owned(),
            }),
            qr_checks: VecDeque::new(),
            send_code: Ok(()),
            login_code: Ok(Cookie::new(GOOD_COOKIE)),
            create: Ok(json!({"id": "note-1", "create_time": 1_700_000_000})),
            note: None,
            calls: Vec::new(),
            images_seen_existing: Vec::new(),
        }
    }
}

/// Connector and client in one; every client it hands out shares the same script.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakePlatform {
    script: Arc<Mutex<Script>>,
}

impl FakePlatform {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut script)
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.script(|script| script.calls.clone())
    }

    pub(crate) fn client(&self, cookie: Option<&str>) -> FakeClient {
        FakeClient {
            cookie: cookie.map(str::to_owned),
            script: Arc::clone(&self.script),
        }
    }
}

impl PlatformConnector for FakePlatform {
    fn connect(&self, cookie: Option<&Cookie>) -> Result<Arc<dyn PlatformClient>, PlatformError> {
        let cookie = cookie.map(|cookie| cookie.as_str().to_owned());
        self.script(|script| script.calls.push(Call::Connect(cookie.clone())));
        Ok(Arc::new(FakeClient {
            cookie,
            script: Arc::clone(&self.script),
        }))
    }
}

#[derive(Debug)]
pub(crate) struct FakeClient {
    cookie: Option<String>,
    script: Arc<Mutex<Script>>,
}

impl FakeClient {
    fn with<R>(&self, call: Call, f: impl FnOnce(&mut Script) -> R) -> R {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        script.calls.push(call);
        f(&mut script)
    }

    fn create(&self, call: Call, endpoint: &str) -> Result<Value, PlatformError> {
        self.with(call, |script| script.create.clone())
            .map_err(|message| PlatformError::rejected(endpoint, message))
    }
}

#[async_trait]
impl PlatformClient for FakeClient {
    async fn self_info(&self) -> Result<Value, PlatformError> {
        let cookie = self.cookie.clone();
        self.with(Call::SelfInfo, |script| {
            if let Some(message) = &script.self_info_error {
                return Err(PlatformError::rejected("self_info", message.clone()));
            }
            let accepted = cookie
                .as_ref()
                .is_some_and(|cookie| script.accepted_cookies.contains(cookie));
            Ok(if accepted {
                json!({"nickname": "tester", "user_id": "u-1"})
            } else {
                json!({"nickname": ""})
            })
        })
    }

    async fn note_by_id(&self, note_id: &str) -> Result<Value, PlatformError> {
        self.with(Call::NoteById(note_id.to_owned()), |script| script.note.clone())
            .ok_or_else(|| PlatformError::rejected("note_by_id", format!("note {note_id} not found")))
    }

    async fn create_text_note(&self, note: &NoteDraft) -> Result<Value, PlatformError> {
        self.create(
            Call::CreateText {
                content: note.content.clone(),
                topics: note.topics.clone(),
            },
            "create_text_note",
        )
    }

    async fn create_image_note(
        &self,
        _note: &NoteDraft,
        images: &[PathBuf],
    ) -> Result<Value, PlatformError> {
        let existing = images.iter().map(|path| path.exists()).collect::<Vec<_>>();
        self.script(|script| script.images_seen_existing = existing);
        self.create(
            Call::CreateImage {
                images: images.to_vec(),
            },
            "create_image_note",
        )
    }

    async fn create_video_note(
        &self,
        _note: &NoteDraft,
        video: &Path,
        cover: Option<&Path>,
    ) -> Result<Value, PlatformError> {
        self.create(
            Call::CreateVideo {
                video: video.to_path_buf(),
                cover: cover.map(Path::to_path_buf),
            },
            "create_video_note",
        )
    }

    async fn create_qrcode(&self) -> Result<QrCode, PlatformError> {
        self.with(Call::CreateQrcode, |script| script.qr.clone())
            .map_err(|message| PlatformError::rejected("create_qrcode", message))
    }

    async fn check_qrcode(&self, qr_id: &str, code: &str) -> Result<QrCheck, PlatformError> {
        let call = Call::CheckQrcode {
            qr_id: qr_id.to_owned(),
            code: code.to_owned(),
        };
        self.with(call, |script| {
            script.qr_checks.pop_front().unwrap_or(Ok(QrCheck {
                code_status: 0,
                cookie: None,
            }))
        })
        .map_err(|message| PlatformError::rejected("check_qrcode", message))
    }

    async fn send_code(&self, phone: &str, area_code: &str) -> Result<(), PlatformError> {
        let call = Call::SendCode {
            phone: phone.to_owned(),
            area_code: area_code.to_owned(),
        };
        self.with(call, |script| script.send_code.clone())
            .map_err(|message| PlatformError::rejected("send_code", message))
    }

    async fn login_code(
        &self,
        phone: &str,
        code: &str,
        area_code: &str,
    ) -> Result<Cookie, PlatformError> {
        let call = Call::LoginCode {
            phone: phone.to_owned(),
            code: code.to_owned(),
            area_code: area_code.to_owned(),
        };
        self.with(call, |script| script.login_code.clone())
            .map_err(|message| PlatformError::rejected("login_code", message))
    }
}

impl FakeClient {
    fn script<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut script)
    }
}
