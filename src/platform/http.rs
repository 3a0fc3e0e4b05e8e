// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, ORIGIN, REFERER, SET_COOKIE};
use reqwest::{Method, Response, Url};
use serde_json::{json, Value};

use super::jar::CookieJar;
use super::sign::SignService;
use super::{PlatformClient, PlatformConnector, PlatformError};
use crate::model::{Cookie, NoteDraft, QrCheck, QrCode};

const API_HOST: &str = "https://edith.xiaohongshu.com";
const CREATOR_HOST: &str = "https://creator.xiaohongshu.com";
const UPLOAD_HOST: &str = "https://ros-upload.xiaohongshu.com";
const WEB_ORIGIN: &str = "https://www.xiaohongshu.com";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

const SELF_INFO: &str = "/api/sns/web/v2/user/me";
const NOTE_FEED: &str = "/api/sns/web/v1/feed";
const QR_CREATE: &str = "/api/sns/web/v1/login/qrcode/create";
const QR_STATUS: &str = "/api/sns/web/v1/login/qrcode/status";
const SEND_CODE: &str = "/api/sns/web/v2/login/send_code";
const CHECK_CODE: &str = "/api/sns/web/v1/login/check_code";
const LOGIN_CODE: &str = "/api/sns/web/v2/login/code";
const UPLOAD_PERMIT: &str = "/api/media/v1/upload/web/permit";
const CREATE_NOTE: &str = "/web_api/sns/v2/note";

#[derive(Debug, Clone, Copy)]
enum UploadScene {
    Image,
    Video,
}

impl UploadScene {
    fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// Connector producing reqwest-backed clients that share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    http: reqwest::Client,
    sign: Option<Arc<SignService>>,
}

impl HttpConnector {
    /// `sign_url` of `None` sends requests unsigned.
    pub fn new(sign_url: Option<&str>) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| PlatformError::Http {
                endpoint: "client".to_owned(),
                source,
            })?;
        let sign = sign_url
            .filter(|url| !url.trim().is_empty())
            .map(|url| Arc::new(SignService::new(url.trim(), http.clone())));
        Ok(Self { http, sign })
    }

    pub fn signs_requests(&self) -> bool {
        self.sign.is_some()
    }
}

impl PlatformConnector for HttpConnector {
    fn connect(&self, cookie: Option<&Cookie>) -> Result<Arc<dyn PlatformClient>, PlatformError> {
        Ok(Arc::new(HttpPlatformClient::new(
            self.http.clone(),
            cookie,
            self.sign.clone(),
        )))
    }
}

/// One client per cookie; `Set-Cookie` answers are merged into its jar.
#[derive(Debug)]
pub struct HttpPlatformClient {
    http: reqwest::Client,
    sign: Option<Arc<SignService>>,
    jar: Mutex<CookieJar>,
}

impl HttpPlatformClient {
    pub fn new(http: reqwest::Client, cookie: Option<&Cookie>, sign: Option<Arc<SignService>>) -> Self {
        let mut jar = CookieJar::from_cookie(cookie);
        jar.seed_guest_identity();
        Self {
            http,
            sign,
            jar: Mutex::new(jar),
        }
    }

    /// The cookie as the platform currently sees it.
    pub fn cookie(&self) -> Cookie {
        self.jar_snapshot().to_cookie()
    }

    fn jar_snapshot(&self) -> CookieJar {
        self.jar.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_jar_value(&self, name: &str, value: &str) {
        self.jar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set(name, value);
    }

    fn absorb_cookies(&self, response: &Response) {
        let mut jar = self.jar.lock().unwrap_or_else(PoisonError::into_inner);
        for value in response.headers().get_all(SET_COOKIE) {
            if let Ok(value) = value.to_str() {
                jar.absorb_set_cookie(value);
            }
        }
    }

    async fn call(
        &self,
        method: Method,
        host: &str,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Value, PlatformError> {
        let mut url = Url::parse(host)
            .and_then(|base| base.join(path))
            .map_err(|err| PlatformError::Decode {
                endpoint: path.to_owned(),
                message: err.to_string(),
            })?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        let signed_uri = match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_owned(),
        };

        let jar = self.jar_snapshot();
        let mut request = self
            .http
            .request(method, url)
            .header(COOKIE, jar.header_value())
            .header(ORIGIN, WEB_ORIGIN)
            .header(REFERER, format!("{WEB_ORIGIN}/"));
        if let Some(sign) = &self.sign {
            let headers = sign
                .sign(
                    &signed_uri,
                    body.as_ref(),
                    jar.get("a1").unwrap_or_default(),
                    jar.get("web_session").unwrap_or_default(),
                )
                .await?;
            request = request.header("x-s", headers.x_s).header("x-t", headers.x_t);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        tracing::debug!(endpoint = path, signed = self.sign.is_some(), "platform request");
        let response = request.send().await.map_err(|source| PlatformError::Http {
            endpoint: path.to_owned(),
            source,
        })?;
        self.absorb_cookies(&response);

        let status = response.status();
        let text = response.text().await.map_err(|source| PlatformError::Http {
            endpoint: path.to_owned(),
            source,
        })?;
        let payload = serde_json::from_str::<Value>(&text).map_err(|_| PlatformError::Decode {
            endpoint: path.to_owned(),
            message: format!("HTTP {status} with a non-JSON body"),
        })?;
        unwrap_envelope(path, payload)
    }

    async fn upload(&self, path: &Path, scene: UploadScene) -> Result<String, PlatformError> {
        let permit = self
            .call(
                Method::GET,
                CREATOR_HOST,
                UPLOAD_PERMIT,
                &[
                    ("biz_name", "spectrum"),
                    ("scene", scene.as_str()),
                    ("file_count", "1"),
                    ("version", "1"),
                    ("source", "web"),
                ],
                None,
            )
            .await?;
        let temp = &permit["uploadTempPermits"][0];
        let file_id = temp["fileIds"][0].as_str().ok_or_else(|| PlatformError::Decode {
            endpoint: UPLOAD_PERMIT.to_owned(),
            message: "permit lacks fileIds".to_owned(),
        })?;
        let token = temp["token"].as_str().unwrap_or_default();

        let bytes = tokio::fs::read(path).await.map_err(|source| PlatformError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let response = self
            .http
            .put(format!("{UPLOAD_HOST}/{file_id}"))
            .timeout(UPLOAD_TIMEOUT)
            .header("X-Cos-Security-Token", token)
            .body(bytes)
            .send()
            .await
            .map_err(|source| PlatformError::Http {
                endpoint: "upload".to_owned(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(PlatformError::Rejected {
                endpoint: "upload".to_owned(),
                code: Some(i64::from(response.status().as_u16())),
                message: format!("upload of {} failed", path.display()),
            });
        }
        tracing::debug!(file = %path.display(), scene = scene.as_str(), "media uploaded");
        Ok(file_id.to_owned())
    }

    async fn post_note(&self, body: Value) -> Result<Value, PlatformError> {
        self.call(Method::POST, API_HOST, CREATE_NOTE, &[], Some(body))
            .await
    }
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn self_info(&self) -> Result<Value, PlatformError> {
        self.call(Method::GET, API_HOST, SELF_INFO, &[], None).await
    }

    async fn note_by_id(&self, note_id: &str) -> Result<Value, PlatformError> {
        let data = self
            .call(
                Method::POST,
                API_HOST,
                NOTE_FEED,
                &[],
                Some(json!({
                    "source_note_id": note_id,
                    "image_formats": ["jpg", "webp", "avif"],
                    "extra": {"need_body_topic": "1"},
                })),
            )
            .await?;
        data["items"][0]
            .get("note_card")
            .cloned()
            .ok_or_else(|| PlatformError::Decode {
                endpoint: NOTE_FEED.to_owned(),
                message: format!("no note card for {note_id}"),
            })
    }

    async fn create_text_note(&self, note: &NoteDraft) -> Result<Value, PlatformError> {
        self.post_note(note_body(note, "normal", json!({"images": []}), Value::Null))
            .await
    }

    async fn create_image_note(
        &self,
        note: &NoteDraft,
        images: &[PathBuf],
    ) -> Result<Value, PlatformError> {
        let mut uploaded = Vec::with_capacity(images.len());
        for image in images {
            let file_id = self.upload(image, UploadScene::Image).await?;
            uploaded.push(json!({
                "file_id": file_id,
                "metadata": {"source": -1},
                "stickers": {"version": 2, "floating": []},
                "extra_info_json": "{\"mimeType\":\"image/jpeg\"}",
            }));
        }
        self.post_note(note_body(
            note,
            "normal",
            json!({"images": uploaded}),
            Value::Null,
        ))
        .await
    }

    async fn create_video_note(
        &self,
        note: &NoteDraft,
        video: &Path,
        cover: Option<&Path>,
    ) -> Result<Value, PlatformError> {
        let video_id = self.upload(video, UploadScene::Video).await?;
        let mut video_info = json!({
            "fileid": video_id,
            "file_id": video_id,
            "timelines": [],
            "chapters": [],
            "chapter_sync_text": false,
        });
        if let Some(cover) = cover {
            let cover_id = self.upload(cover, UploadScene::Image).await?;
            video_info["cover"] = json!({"fileid": cover_id, "file_id": cover_id, "frame": {"ts": 0}});
        }
        self.post_note(note_body(note, "video", Value::Null, video_info))
            .await
    }

    async fn create_qrcode(&self) -> Result<QrCode, PlatformError> {
        let data = self
            .call(Method::POST, API_HOST, QR_CREATE, &[], Some(json!({"qr_type": 1})))
            .await?;
        Ok(QrCode {
            qr_id: text_field(&data, "qr_id"),
            code: text_field(&data, "code"),
            url: text_field(&data, "url"),
        })
    }

    async fn check_qrcode(&self, qr_id: &str, code: &str) -> Result<QrCheck, PlatformError> {
        let data = self
            .call(
                Method::GET,
                API_HOST,
                QR_STATUS,
                &[("qr_id", qr_id), ("code", code)],
                None,
            )
            .await?;
        let code_status = data
            .get("code_status")
            .and_then(|value| value.as_i64().or_else(|| value.as_str()?.parse().ok()))
            .unwrap_or(0);
        let session = data["login_info"]["session"].as_str().unwrap_or_default();
        if !session.is_empty() {
            self.set_jar_value("web_session", session);
        }
        let cookie = (code_status == crate::model::login::QR_CODE_CONFIRMED).then(|| self.cookie());
        Ok(QrCheck {
            code_status,
            cookie,
        })
    }

    async fn send_code(&self, phone: &str, area_code: &str) -> Result<(), PlatformError> {
        self.call(
            Method::GET,
            API_HOST,
            SEND_CODE,
            &[("phone", phone), ("zone", zone(area_code)), ("type", "login")],
            None,
        )
        .await?;
        Ok(())
    }

    async fn login_code(
        &self,
        phone: &str,
        code: &str,
        area_code: &str,
    ) -> Result<Cookie, PlatformError> {
        let zone = zone(area_code);
        let checked = self
            .call(
                Method::GET,
                API_HOST,
                CHECK_CODE,
                &[("phone", phone), ("zone", zone), ("code", code)],
                None,
            )
            .await?;
        let mobile_token = checked["mobile_token"].as_str().ok_or_else(|| PlatformError::Decode {
            endpoint: CHECK_CODE.to_owned(),
            message: "verification answer lacks mobile_token".to_owned(),
        })?;
        let login = self
            .call(
                Method::POST,
                API_HOST,
                LOGIN_CODE,
                &[],
                Some(json!({"mobile_token": mobile_token, "zone": zone, "phone": phone})),
            )
            .await?;
        if let Some(session) = login["session"].as_str().filter(|session| !session.is_empty()) {
            self.set_jar_value("web_session", session);
        }
        Ok(self.cookie())
    }
}

/// `{success, code, msg, data}`; anything but success becomes [`PlatformError::Rejected`].
pub(crate) fn unwrap_envelope(endpoint: &str, payload: Value) -> Result<Value, PlatformError> {
    let success = payload.get("success").and_then(Value::as_bool);
    let code = payload.get("code").and_then(Value::as_i64);
    if success == Some(true) || (success.is_none() && code == Some(0)) {
        return Ok(payload.get("data").cloned().unwrap_or(Value::Null));
    }
    let message = payload
        .get("msg")
        .and_then(Value::as_str)
        .filter(|msg| !msg.is_empty())
        .unwrap_or("request failed")
        .to_owned();
    Err(PlatformError::Rejected {
        endpoint: endpoint.to_owned(),
        code,
        message,
    })
}

fn note_body(note: &NoteDraft, note_type: &str, image_info: Value, video_info: Value) -> Value {
    let hash_tags = note
        .topics
        .iter()
        .map(|topic| json!({"name": topic, "type": "topic"}))
        .collect::<Vec<_>>();
    json!({
        "common": {
            "type": note_type,
            "title": "",
            "note_id": "",
            "desc": note_desc(note),
            "source": "{\"type\":\"web\",\"ids\":\"\",\"extraInfo\":\"{\\\"subType\\\":\\\"official\\\"}\"}",
            "business_binds": "{\"version\":1,\"noteId\":0}",
            "ats": [],
            "hash_tag": hash_tags,
            "post_loc": {},
            "privacy_info": {"op_type": 1, "type": 0},
        },
        "image_info": image_info,
        "video_info": video_info,
    })
}

/// Topics are appended to the body as `#topic[话题]#` markers.
pub(crate) fn note_desc(note: &NoteDraft) -> String {
    if note.topics.is_empty() {
        return note.content.clone();
    }
    let tags = note
        .topics
        .iter()
        .map(|topic| format!("#{topic}[话题]#"))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} {tags}", note.content.trim_end())
}

fn zone(area_code: &str) -> &str {
    area_code.trim().trim_start_matches('+')
}

fn text_field(data: &Value, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}
