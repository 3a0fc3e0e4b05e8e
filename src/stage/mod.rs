// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Materializes remote image references as local temp files for one publish call.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::model::ImageRef;

pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);
const TEMP_PREFIX: &str = "xhs-";

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("download of {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("download of {url} answered HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("cannot write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ResourceStager {
    http: reqwest::Client,
    stage_dir: PathBuf,
}

impl ResourceStager {
    pub fn new(stage_dir: impl Into<PathBuf>) -> Result<Self, NetworkError> {
        let http = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|source| NetworkError::Http {
                url: "client".to_owned(),
                source,
            })?;
        Ok(Self::with_client(http, stage_dir))
    }

    pub fn with_client(http: reqwest::Client, stage_dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            stage_dir: stage_dir.into(),
        }
    }

    /// Resolves every reference to a local path, preserving order.
    ///
    /// Local paths pass through untouched. A remote item that cannot be fetched is logged and
    /// left out, so callers must re-check how many paths came back.
    pub async fn stage(&self, references: &[ImageRef]) -> StagedImages {
        let mut staged = StagedImages::default();
        for reference in references {
            match reference {
                ImageRef::Local(path) => staged.paths.push(path.clone()),
                ImageRef::Remote(url) => match self.download(url).await {
                    Ok(path) => {
                        staged.paths.push(path.clone());
                        staged.temp_files.push(path);
                    }
                    Err(err) => {
                        tracing::warn!(reference = %url, error = %err, "dropping image that failed to download");
                        staged.dropped += 1;
                    }
                },
            }
        }
        staged
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| NetworkError::Http {
                url: url.to_owned(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(|source| NetworkError::Http {
            url: url.to_owned(),
            source,
        })?;
        Ok(bytes.to_vec())
    }

    async fn download(&self, url: &str) -> Result<PathBuf, NetworkError> {
        let bytes = self.fetch_bytes(url).await?;
        tokio::fs::create_dir_all(&self.stage_dir)
            .await
            .map_err(|source| NetworkError::Io {
                path: self.stage_dir.clone(),
                source,
            })?;
        let path = self.stage_dir.join(format!(
            "{TEMP_PREFIX}{}-{}",
            uuid::Uuid::new_v4().simple(),
            url_basename(url)
        ));
        if let Err(source) = tokio::fs::write(&path, &bytes).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(NetworkError::Io { path, source });
        }
        tracing::debug!(reference = %url, path = %path.display(), bytes = bytes.len(), "image staged");
        Ok(path)
    }
}

/// Staged paths plus ownership of the temp files behind them.
///
/// Temp files are removed by [`StagedImages::release`] or, at the latest, on drop.
#[derive(Debug, Default)]
pub struct StagedImages {
    paths: Vec<PathBuf>,
    temp_files: Vec<PathBuf>,
    dropped: usize,
    released: bool,
}

impl StagedImages {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn temp_files(&self) -> &[PathBuf] {
        &self.temp_files
    }

    /// Number of remote references that could not be fetched.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        release_files(&self.temp_files);
    }
}

impl Drop for StagedImages {
    fn drop(&mut self) {
        self.release();
    }
}

/// Best-effort removal; files that are already gone or cannot be removed are ignored.
pub fn release_files(files: &[PathBuf]) {
    for file in files {
        match fs::remove_file(file) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::debug!(path = %file.display(), error = %err, "temp file not removed");
            }
        }
    }
}

/// Longest file-name tail kept from a URL, extension included.
const MAX_BASENAME_LEN: usize = 64;
const MAX_EXTENSION_LEN: usize = 8;

fn url_basename(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let name = path
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_'))
        .collect::<String>();
    if name.is_empty() || name.starts_with('.') {
        return "image".to_owned();
    }
    if name.len() <= MAX_BASENAME_LEN {
        return name;
    }
    // Only ASCII survives the filter, so byte offsets are char boundaries.
    let extension = name
        .rfind('.')
        .map(|dot| &name[dot..])
        .filter(|extension| extension.len() <= MAX_EXTENSION_LEN)
        .unwrap_or_default();
    format!("{}{extension}", &name[..MAX_BASENAME_LEN - extension.len()])
}

#[cfg(test)]
mod tests;
