// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::model::{AccountId, Cookie};

const COOKIE_FILE_EXTENSION: &str = "cookie";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("refusing to write through symlink at {path:?}")]
    SymlinkRefused { path: PathBuf },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Fast, best-effort persistence.
    ///
    /// - Writes a temp file and renames atomically into place.
    /// - Does not perform per-file fsync/sync.
    #[default]
    BestEffort,

    /// Slower, best-effort durability.
    ///
    /// Flushes the temp file and the directory entry after the rename where the platform
    /// supports it.
    Durable,
}

/// One plain-text file per account holding exactly the raw cookie blob.
#[derive(Debug, Clone)]
pub struct CookieStore {
    root: PathBuf,
    durability: WriteDurability,
}

impl CookieStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            durability: WriteDurability::default(),
        }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }

    pub fn cookie_path(&self, account: &AccountId) -> PathBuf {
        self.root
            .join(format!("{}.{COOKIE_FILE_EXTENSION}", account.as_str()))
    }

    /// Reads the stored blob; a missing or whitespace-only file is `Ok(None)`.
    pub fn load(&self, account: &AccountId) -> Result<Option<Cookie>, StoreError> {
        self.ensure_root()?;
        let path = self.cookie_path(account);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        Ok(Some(Cookie::new(trimmed)))
    }

    /// Replaces the account's blob; readers see either the old or the new file, never a mix.
    pub fn save(&self, account: &AccountId, cookie: &Cookie) -> Result<(), StoreError> {
        self.ensure_root()?;
        let path = self.cookie_path(account);
        write_atomic(&path, cookie.as_str().as_bytes(), self.durability)?;
        tracing::debug!(
            account = %account,
            path = %path.display(),
            cookie = %cookie.redacted(),
            "cookie persisted"
        );
        Ok(())
    }

    /// Syntactic check only; never contacts the platform.
    pub fn is_valid(cookie: &Cookie, required_tokens: &[&str]) -> bool {
        cookie.is_valid_with(required_tokens)
    }

    fn ensure_root(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Io {
            path: self.root.clone(),
            source,
        })
    }
}

fn write_atomic(path: &Path, contents: &[u8], durability: WriteDurability) -> Result<(), StoreError> {
    match fs::symlink_metadata(path) {
        Ok(md) if md.file_type().is_symlink() => {
            return Err(StoreError::SymlinkRefused {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    let Some(parent) = path.parent() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no parent"),
        });
    };

    let Some(file_name) = path.file_name() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no file name"),
        });
    };

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let tmp_path = parent.join(format!(
        ".xhs.tmp.{}.{}.{}",
        file_name.to_string_lossy(),
        std::process::id(),
        nanos
    ));

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(&tmp_path).map_err(|source| StoreError::Io {
        path: tmp_path.clone(),
        source,
    })?;

    if let Err(source) = file.write_all(contents) {
        drop(file);
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::Io {
            path: tmp_path,
            source,
        });
    }

    if durability == WriteDurability::Durable {
        file.sync_all().map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
    }
    drop(file);

    if let Err(source) = rename_overwrite(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        });
    }

    if durability == WriteDurability::Durable {
        #[cfg(unix)]
        {
            let dir = fs::File::open(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
            dir.sync_all().map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    Ok(())
}

fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied
                ) =>
            {
                let _ = fs::remove_file(to);
                fs::rename(from, to)
            }
            Err(err) => Err(err),
        }
    }

    #[cfg(not(windows))]
    {
        fs::rename(from, to)
    }
}
