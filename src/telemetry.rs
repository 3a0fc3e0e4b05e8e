// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Log output setup. Stdout belongs to the stdio transport, so logs go to stderr or a file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter {filter:?}: {message}")]
    Filter { filter: String, message: String },
    #[error("cannot open log file {path:?}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot install log subscriber: {0}")]
    Install(String),
}

/// `RUST_LOG` wins over the configured level.
pub fn env_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(level).map_err(|err| TelemetryError::Filter {
            filter: level.to_owned(),
            message: err.to_string(),
        })
    })
}

pub fn init(settings: &Settings) -> Result<(), TelemetryError> {
    let filter = env_filter(&settings.log_level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match &settings.log_file {
        Some(path) => {
            let file = open_log_file(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(io::stderr).try_init(),
    };
    installed.map_err(|err| TelemetryError::Install(err.to_string()))
}

fn open_log_file(path: &Path) -> Result<fs::File, TelemetryError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| TelemetryError::LogFile {
            path: path.to_path_buf(),
            source,
        })?;
    }
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| TelemetryError::LogFile {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::{env_filter, open_log_file, TelemetryError};

    #[test]
    fn configured_level_builds_a_filter() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(env_filter("xhs_publisher=debug,info").is_ok());
            assert!(matches!(
                env_filter("xhs_publisher=loud").unwrap_err(),
                TelemetryError::Filter { .. }
            ));
        }
    }

    #[test]
    fn log_file_parent_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("logs").join("xhs.log");
        open_log_file(&path).unwrap();
        assert!(path.is_file());
    }
}
