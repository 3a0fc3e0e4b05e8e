// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::status::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    Text,
    Image,
    Video,
}

impl NoteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body text and topic tags shared by every note variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDraft {
    pub content: String,
    pub topics: Vec<String>,
}

impl NoteDraft {
    pub fn new(content: impl Into<String>, topics: Option<Vec<String>>) -> Self {
        Self {
            content: content.into(),
            topics: topics
                .unwrap_or_default()
                .into_iter()
                .map(|topic| topic.trim().trim_start_matches('#').to_owned())
                .filter(|topic| !topic.is_empty())
                .collect(),
        }
    }
}

/// An image reference as supplied by the caller: either a local path or an http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    Local(PathBuf),
    Remote(String),
}

impl ImageRef {
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("https://") || raw.starts_with("http://") {
            Self::Remote(raw.to_owned())
        } else {
            Self::Local(PathBuf::from(raw))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => f.write_str(url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishRequest {
    Text {
        note: NoteDraft,
    },
    Image {
        note: NoteDraft,
        images: Vec<ImageRef>,
    },
    Video {
        note: NoteDraft,
        video: PathBuf,
        cover: Option<PathBuf>,
    },
}

impl PublishRequest {
    pub fn text(content: impl Into<String>, topics: Option<Vec<String>>) -> Self {
        Self::Text {
            note: NoteDraft::new(content, topics),
        }
    }

    pub fn image<S: AsRef<str>>(
        content: impl Into<String>,
        images: &[S],
        topics: Option<Vec<String>>,
    ) -> Self {
        Self::Image {
            note: NoteDraft::new(content, topics),
            images: images.iter().map(|raw| ImageRef::parse(raw.as_ref())).collect(),
        }
    }

    pub fn video(
        content: impl Into<String>,
        video: impl Into<PathBuf>,
        cover: Option<PathBuf>,
        topics: Option<Vec<String>>,
    ) -> Self {
        Self::Video {
            note: NoteDraft::new(content, topics),
            video: video.into(),
            cover,
        }
    }

    pub fn kind(&self) -> NoteKind {
        match self {
            Self::Text { .. } => NoteKind::Text,
            Self::Image { .. } => NoteKind::Image,
            Self::Video { .. } => NoteKind::Video,
        }
    }

    pub fn note(&self) -> &NoteDraft {
        match self {
            Self::Text { note } | Self::Image { note, .. } | Self::Video { note, .. } => note,
        }
    }
}

/// Uniform envelope returned for every publish attempt.
///
/// Only built through [`PublishResult::success`] and [`PublishResult::failure`], so a success
/// never carries `error` and a failure never carries `note_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PublishResult {
    pub status: Status,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_type: Option<NoteKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl PublishResult {
    pub fn success(
        kind: NoteKind,
        note_id: String,
        publish_time: String,
        image_count: Option<u64>,
    ) -> Self {
        Self {
            status: Status::Success,
            message: format!("{kind} note published"),
            note_type: Some(kind),
            note_id: Some(note_id),
            publish_time: Some(publish_time),
            image_count,
            error: None,
            suggestion: None,
        }
    }

    pub fn failure(kind: NoteKind, error: impl Into<String>, suggestion: Option<String>) -> Self {
        let error = error.into();
        Self {
            status: Status::Error,
            message: format!("failed to publish {kind} note"),
            note_type: Some(kind),
            note_id: None,
            publish_time: None,
            image_count: None,
            error: Some(if error.trim().is_empty() { "unknown error".to_owned() } else { error }),
            suggestion,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}
