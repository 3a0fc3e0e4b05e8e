// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use xhs_publisher::config::LoginSettings;
use xhs_publisher::dispatch::PublishDispatcher;
use xhs_publisher::mcp::XhsMcp;
use xhs_publisher::model::{
    AccountId, Cookie, NoteDraft, PublishRequest, QrCheck, QrCode, Status,
};
use xhs_publisher::platform::{PlatformClient, PlatformConnector, PlatformError};
use xhs_publisher::session::{QrLoginStatus, SessionManager, SessionPhase};
use xhs_publisher::stage::ResourceStager;
use xhs_publisher::store::CookieStore;

const SESSION_COOKIE: &str = "a1=abc; webId=def; web_session=sess";

#[derive(Debug, Default)]
struct Recorded {
    connects: Vec<Option<String>>,
    /// For every image-note call: the paths and whether each existed at call time.
    image_calls: Vec<Vec<(PathBuf, bool)>>,
}

#[derive(Debug, Clone, Default)]
struct StubPlatform {
    recorded: Arc<Mutex<Recorded>>,
}

impl StubPlatform {
    fn recorded<R>(&self, f: impl FnOnce(&Recorded) -> R) -> R {
        f(&self.recorded.lock().unwrap())
    }
}

impl PlatformConnector for StubPlatform {
    fn connect(&self, cookie: Option<&Cookie>) -> Result<Arc<dyn PlatformClient>, PlatformError> {
        let cookie = cookie.map(|cookie| cookie.as_str().to_owned());
        self.recorded.lock().unwrap().connects.push(cookie.clone());
        Ok(Arc::new(StubClient {
            cookie,
            recorded: Arc::clone(&self.recorded),
        }))
    }
}

struct StubClient {
    cookie: Option<String>,
    recorded: Arc<Mutex<Recorded>>,
}

#[async_trait]
impl PlatformClient for StubClient {
    async fn self_info(&self) -> Result<Value, PlatformError> {
        match self.cookie.as_deref() {
            Some(SESSION_COOKIE) => Ok(json!({"basic_info": {"nickname": "integration"}})),
            _ => Ok(json!({})),
        }
    }

    async fn note_by_id(&self, note_id: &str) -> Result<Value, PlatformError> {
        Ok(json!({"note_id": note_id}))
    }

    async fn create_text_note(&self, _note: &NoteDraft) -> Result<Value, PlatformError> {
        Ok(json!({"id": "text-1", "create_time": 1}))
    }

    async fn create_image_note(
        &self,
        _note: &NoteDraft,
        images: &[PathBuf],
    ) -> Result<Value, PlatformError> {
        let seen = images
            .iter()
            .map(|path| (path.clone(), path.exists()))
            .collect();
        self.recorded.lock().unwrap().image_calls.push(seen);
        Ok(json!({"note_id": "image-1", "time": "2026-10-18 10:00"}))
    }

    async fn create_video_note(
        &self,
        _note: &NoteDraft,
        _video: &Path,
        _cover: Option<&Path>,
    ) -> Result<Value, PlatformError> {
        Ok(json!({"id": "video-1"}))
    }

    async fn create_qrcode(&self) -> Result<QrCode, PlatformError> {
        Ok(QrCode {
            qr_id: "qr-int".to_owned(),
            code: "code-int".to_owned(),
            url: "https://example.invalid/qr".to_owned(),
        })
    }

    async fn check_qrcode(&self, _qr_id: &str, _code: &str) -> Result<QrCheck, PlatformError> {
        Ok(QrCheck {
            code_status: 2,
            cookie: Some(Cookie::new(SESSION_COOKIE)),
        })
    }

    async fn send_code(&self, _phone: &str, _area_code: &str) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn login_code(
        &self,
        _phone: &str,
        _code: &str,
        _area_code: &str,
    ) -> Result<Cookie, PlatformError> {
        Ok(Cookie::new(SESSION_COOKIE))
    }
}

fn new_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}

#[test]
fn qr_login_persists_cookie_for_the_next_process() {
    let tmp = tempfile::tempdir().unwrap();
    let store = CookieStore::new(tmp.path().join("cookies"));
    let platform = StubPlatform::default();
    let runtime = new_runtime();

    runtime.block_on(async {
        let first = SessionManager::open(
            AccountId::default_account(),
            store.clone(),
            Arc::new(platform.clone()),
        )
        .await;
        assert_eq!(first.phase().await, SessionPhase::NoSession);

        let qr = first.start_qr_login().await.unwrap();
        let status = first.poll_qr_login(&qr.qr_id, &qr.code).await.unwrap();
        assert!(matches!(status, QrLoginStatus::Success(_)));

        let second = SessionManager::open(
            AccountId::default_account(),
            store.clone(),
            Arc::new(platform.clone()),
        )
        .await;
        assert_eq!(second.phase().await, SessionPhase::Authenticated);
        assert_eq!(
            second.current_user().await.unwrap(),
            json!({"basic_info": {"nickname": "integration"}})
        );
    });

    let stored = store.load(&AccountId::default_account()).unwrap().unwrap();
    assert_eq!(stored.as_str(), SESSION_COOKIE);
}

#[test]
fn remote_images_are_staged_for_the_call_and_removed_after() {
    let tmp = tempfile::tempdir().unwrap();
    let stage_dir = tmp.path().join("stage");
    let store = CookieStore::new(tmp.path().join("cookies"));
    store
        .save(&AccountId::default_account(), &Cookie::new(SESSION_COOKIE))
        .unwrap();
    let platform = StubPlatform::default();
    let runtime = new_runtime();

    let result = runtime.block_on(async {
        let app = Router::new()
            .route("/one.jpg", get(|| async { &b"one"[..] }))
            .route("/two.png", get(|| async { &b"two"[..] }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let session = SessionManager::open(
            AccountId::default_account(),
            store,
            Arc::new(platform.clone()),
        )
        .await;
        let client = session.ensure_session().await.unwrap();
        let dispatcher = PublishDispatcher::new(ResourceStager::new(&stage_dir).unwrap());
        let one = format!("http://{addr}/one.jpg");
        let two = format!("http://{addr}/two.png");
        let request = PublishRequest::image("trip", &[one.as_str(), two.as_str()], None);
        dispatcher.publish(client.as_ref(), &request).await
    });

    assert_eq!(result.status, Status::Success);
    assert_eq!(result.note_id.as_deref(), Some("image-1"));
    assert_eq!(result.publish_time.as_deref(), Some("2026-10-18 10:00"));
    assert_eq!(result.image_count, Some(2));

    let calls = platform.recorded(|recorded| recorded.image_calls.clone());
    assert_eq!(calls.len(), 1);
    assert!(calls[0].iter().all(|(_, existed)| *existed));
    assert!(calls[0][0].0.to_string_lossy().ends_with("one.jpg"));
    assert!(calls[0][1].0.to_string_lossy().ends_with("two.png"));
    assert_eq!(std::fs::read_dir(&stage_dir).unwrap().count(), 0);
}

#[test]
fn user_resource_reads_through_the_restored_session() {
    let tmp = tempfile::tempdir().unwrap();
    let store = CookieStore::new(tmp.path().join("cookies"));
    store
        .save(&AccountId::default_account(), &Cookie::new(SESSION_COOKIE))
        .unwrap();
    let platform = StubPlatform::default();
    let runtime = new_runtime();

    let body = runtime.block_on(async {
        let session = SessionManager::open(
            AccountId::default_account(),
            store,
            Arc::new(platform.clone()),
        )
        .await;
        let stager = ResourceStager::new(tmp.path().join("stage")).unwrap();
        let server = XhsMcp::new(
            Arc::new(session),
            PublishDispatcher::new(stager),
            LoginSettings::default(),
        );
        let result = server.read_resource_uri("user://").await.unwrap();
        serde_json::to_value(&result.contents[0]).unwrap()
    });

    let text: Value = serde_json::from_str(body["text"].as_str().unwrap()).unwrap();
    assert_eq!(text["basic_info"]["nickname"], "integration");
    assert_eq!(
        platform.recorded(|recorded| recorded.connects.clone()),
        vec![Some(SESSION_COOKIE.to_owned())]
    );
}
