// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! End-to-end execution of one [`PublishRequest`].
//!
//! Every path ends in a [`PublishResult`]; failures from validation, staging or the platform
//! are folded into an `error` envelope here and never leave the dispatcher as `Err`.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::model::{NoteKind, PublishRequest, PublishResult};
use crate::platform::{remediation_hint, PlatformClient, PlatformError};
use crate::stage::ResourceStager;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no usable images: every image reference is missing or failed to download")]
    NoImages,
    #[error("{role} file not found: {path:?}")]
    MissingFile { role: &'static str, path: PathBuf },
    #[error("note content is empty")]
    EmptyContent,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl PublishError {
    pub fn suggestion(&self) -> Option<&'static str> {
        remediation_hint(&self.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct PublishDispatcher {
    stager: ResourceStager,
}

impl PublishDispatcher {
    pub fn new(stager: ResourceStager) -> Self {
        Self { stager }
    }

    pub fn stager(&self) -> &ResourceStager {
        &self.stager
    }

    pub async fn publish(&self, client: &dyn PlatformClient, request: &PublishRequest) -> PublishResult {
        let kind = request.kind();
        match self.try_publish(client, request).await {
            Ok(result) => {
                tracing::info!(
                    note_type = %kind,
                    note_id = result.note_id.as_deref().unwrap_or_default(),
                    "note published"
                );
                result
            }
            Err(err) => {
                tracing::warn!(note_type = %kind, error = %err, "publish failed");
                PublishResult::failure(kind, err.to_string(), err.suggestion().map(str::to_owned))
            }
        }
    }

    async fn try_publish(
        &self,
        client: &dyn PlatformClient,
        request: &PublishRequest,
    ) -> Result<PublishResult, PublishError> {
        match request {
            PublishRequest::Text { note } => {
                if note.content.trim().is_empty() && note.topics.is_empty() {
                    return Err(ValidationError::EmptyContent.into());
                }
                let raw = client.create_text_note(note).await?;
                Ok(normalize(NoteKind::Text, &raw, None))
            }
            PublishRequest::Image { note, images } => {
                if images.is_empty() {
                    return Err(ValidationError::NoImages.into());
                }
                let mut staged = self.stager.stage(images).await;
                if staged.is_empty() {
                    return Err(ValidationError::NoImages.into());
                }
                if staged.dropped() > 0 {
                    tracing::info!(
                        requested = images.len(),
                        usable = staged.paths().len(),
                        "publishing with the images that resolved"
                    );
                }
                let outcome = client.create_image_note(note, staged.paths()).await;
                staged.release();
                let raw = outcome?;
                Ok(normalize(NoteKind::Image, &raw, Some(images.len())))
            }
            PublishRequest::Video { note, video, cover } => {
                require_file("video", video).await?;
                if let Some(cover) = cover {
                    require_file("cover", cover).await?;
                }
                let raw = client.create_video_note(note, video, cover.as_deref()).await?;
                Ok(normalize(NoteKind::Video, &raw, None))
            }
        }
    }
}

async fn require_file(role: &'static str, path: &Path) -> Result<(), ValidationError> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => Ok(()),
        _ => Err(ValidationError::MissingFile {
            role,
            path: path.to_path_buf(),
        }),
    }
}

/// Maps the platform's loosely shaped answer onto the fixed result envelope.
///
/// `requested_images` is the fallback image count when the answer has no or an empty `images` list.
pub fn normalize(kind: NoteKind, raw: &Value, requested_images: Option<usize>) -> PublishResult {
    let note_id = first_text(raw, &["id", "note_id"]);
    let publish_time = first_text(raw, &["create_time", "time"]);
    let image_count = requested_images.map(|requested| {
        let count = raw
            .get("images")
            .and_then(Value::as_array)
            .filter(|images| !images.is_empty())
            .map_or(requested, Vec::len);
        count as u64
    });
    PublishResult::success(kind, note_id, publish_time, image_count)
}

fn first_text(raw: &Value, keys: &[&str]) -> String {
    for key in keys {
        match raw.get(*key) {
            Some(Value::String(text)) if !text.is_empty() => return text.clone(),
            Some(Value::Number(number)) => return number.to_string(),
            _ => {}
        }
    }
    String::new()
}
