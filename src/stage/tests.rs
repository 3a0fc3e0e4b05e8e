// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::routing::get;
use axum::Router;
use rstest::{fixture, rstest};

use super::{release_files, url_basename, NetworkError, ResourceStager, StagedImages};
use crate::model::ImageRef;

const IMAGE_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-image";
// Nothing listens on port 1; connections are refused immediately.
const UNREACHABLE: &str = "http://127.0.0.1:1/a.jpg";

fn new_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}

async fn spawn_image_server() -> SocketAddr {
    let app = Router::new().route("/img/a.jpg", get(|| async { IMAGE_BYTES }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

struct StageTestCtx {
    tmp: tempfile::TempDir,
    stager: ResourceStager,
    runtime: tokio::runtime::Runtime,
}

impl StageTestCtx {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let stager = ResourceStager::new(tmp.path()).unwrap();
        Self {
            tmp,
            stager,
            runtime: new_runtime(),
        }
    }

    fn files_in_stage_dir(&self) -> usize {
        std::fs::read_dir(self.tmp.path()).unwrap().count()
    }
}

#[fixture]
fn ctx() -> StageTestCtx {
    StageTestCtx::new()
}

#[rstest]
fn empty_input_stages_nothing(ctx: StageTestCtx) {
    let staged = ctx.runtime.block_on(ctx.stager.stage(&[]));
    assert!(staged.is_empty());
    assert!(staged.temp_files().is_empty());
}

#[rstest]
fn local_paths_pass_through_unchanged(ctx: StageTestCtx) {
    let refs = [
        ImageRef::Local(PathBuf::from("/local/b.jpg")),
        ImageRef::Local(PathBuf::from("relative/c.png")),
    ];
    let staged = ctx.runtime.block_on(ctx.stager.stage(&refs));
    assert_eq!(
        staged.paths(),
        &[PathBuf::from("/local/b.jpg"), PathBuf::from("relative/c.png")]
    );
    assert!(staged.temp_files().is_empty());
}

#[rstest]
fn remote_images_are_downloaded_in_order(ctx: StageTestCtx) {
    let staged = ctx.runtime.block_on(async {
        let addr = spawn_image_server().await;
        let refs = [
            ImageRef::Remote(format!("http://{addr}/img/a.jpg?x=1")),
            ImageRef::Local(PathBuf::from("/local/b.jpg")),
        ];
        ctx.stager.stage(&refs).await
    });

    assert_eq!(staged.paths().len(), 2);
    assert_eq!(staged.temp_files().len(), 1);
    let temp = &staged.temp_files()[0];
    assert_eq!(&staged.paths()[0], temp);
    assert!(temp.starts_with(ctx.tmp.path()));
    let name = temp.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("xhs-") && name.ends_with("-a.jpg"), "{name}");
    assert_eq!(std::fs::read(temp).unwrap(), IMAGE_BYTES);
}

#[rstest]
fn missing_stage_dir_is_created_on_first_download(ctx: StageTestCtx) {
    let nested = ctx.tmp.path().join("nested").join("stage");
    let stager = ResourceStager::new(&nested).unwrap();
    let staged = ctx.runtime.block_on(async {
        let addr = spawn_image_server().await;
        stager
            .stage(&[ImageRef::Remote(format!("http://{addr}/img/a.jpg"))])
            .await
    });
    assert_eq!(staged.temp_files().len(), 1);
    assert!(staged.temp_files()[0].starts_with(&nested));
}

#[rstest]
fn failed_download_drops_only_that_item(ctx: StageTestCtx) {
    let refs = [
        ImageRef::Remote(UNREACHABLE.to_owned()),
        ImageRef::Local(PathBuf::from("/local/b.jpg")),
    ];
    let staged = ctx.runtime.block_on(ctx.stager.stage(&refs));
    assert_eq!(staged.paths(), &[PathBuf::from("/local/b.jpg")]);
    assert!(staged.temp_files().is_empty());
    assert_eq!(staged.dropped(), 1);
}

#[rstest]
fn http_error_status_drops_the_item(ctx: StageTestCtx) {
    let (staged, err) = ctx.runtime.block_on(async {
        let addr = spawn_image_server().await;
        let url = format!("http://{addr}/img/missing.jpg");
        let staged = ctx.stager.stage(&[ImageRef::Remote(url.clone())]).await;
        let err = ctx.stager.fetch_bytes(&url).await.unwrap_err();
        (staged, err)
    });
    assert!(staged.is_empty());
    assert!(matches!(err, NetworkError::Status { status: 404, .. }));
    assert_eq!(ctx.files_in_stage_dir(), 0);
}

#[rstest]
fn release_is_idempotent_and_drop_cleans_up(ctx: StageTestCtx) {
    let mut staged = ctx.runtime.block_on(async {
        let addr = spawn_image_server().await;
        let refs = [
            ImageRef::Remote(format!("http://{addr}/img/a.jpg")),
            ImageRef::Remote(format!("http://{addr}/img/a.jpg")),
        ];
        ctx.stager.stage(&refs).await
    });
    assert_eq!(ctx.files_in_stage_dir(), 2);

    // One file vanishes externally before release.
    std::fs::remove_file(&staged.temp_files()[0]).unwrap();
    staged.release();
    staged.release();
    assert_eq!(ctx.files_in_stage_dir(), 0);
    drop(staged);

    let dropped_unreleased = ctx.runtime.block_on(async {
        let addr = spawn_image_server().await;
        ctx.stager
            .stage(&[ImageRef::Remote(format!("http://{addr}/img/a.jpg"))])
            .await
    });
    assert_eq!(ctx.files_in_stage_dir(), 1);
    drop(dropped_unreleased);
    assert_eq!(ctx.files_in_stage_dir(), 0);
}

#[test]
fn release_files_ignores_missing_files() {
    release_files(&[PathBuf::from("/definitely/not/here.jpg")]);
    let mut empty = StagedImages::default();
    empty.release();
}

#[rstest]
#[case::plain("https://cdn.example.com/p/a.jpg", "a.jpg")]
#[case::query("https://cdn.example.com/p/a.jpg?w=100#frag", "a.jpg")]
#[case::no_name("https://cdn.example.com/", "image")]
#[case::odd_chars("https://cdn.example.com/%E5%9B%BE.png", "E59BBE.png")]
fn basename_is_sanitized(#[case] url: &str, #[case] expected: &str) {
    assert_eq!(url_basename(url), expected);
}

#[rstest]
#[case::keeps_extension(".jpg", ".jpg")]
#[case::drops_overlong_extension(".averyveryverylongextension", "")]
fn overlong_basename_is_capped(#[case] suffix: &str, #[case] kept_suffix: &str) {
    let url = format!("https://cdn.example.com/p/{}{suffix}", "a".repeat(300));
    let name = url_basename(&url);
    assert_eq!(name.len(), 64);
    assert!(name.ends_with(kept_suffix));
    assert!(name.starts_with("aaaa"));
}
