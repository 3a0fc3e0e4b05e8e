// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Runtime settings.
//!
//! Resolved once at startup with precedence CLI flags > environment > JSON config file >
//! defaults, then passed by value into the components that need them.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::model::{AccountId, IdError};
use crate::store::WriteDurability;

pub const DEFAULT_COOKIE_DIR: &str = "~/.xhs_cookies";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_AREA_CODE: &str = "+86";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid account {value:?}: {source}")]
    Account {
        value: String,
        #[source]
        source: IdError,
    },
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginMethod {
    #[default]
    Qrcode,
    Phone,
}

impl LoginMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Qrcode => "qrcode",
            Self::Phone => "phone",
        }
    }
}

impl fmt::Display for LoginMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoginMethod {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "qrcode" | "qr" => Ok(Self::Qrcode),
            "phone" | "sms" => Ok(Self::Phone),
            _ => Err(()),
        }
    }
}

/// Login preferences consumed by the tool surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSettings {
    pub method: LoginMethod,
    pub phone: Option<String>,
    pub area_code: String,
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self {
            method: LoginMethod::default(),
            phone: None,
            area_code: DEFAULT_AREA_CODE.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub account: AccountId,
    pub cookie_dir: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub sign_url: Option<String>,
    pub use_sign: bool,
    pub login: LoginSettings,
    pub durable_writes: bool,
    pub mcp_http_port: Option<u16>,
}

impl Settings {
    /// The sign service to use, if signing is enabled and configured.
    pub fn effective_sign_url(&self) -> Option<&str> {
        if self.use_sign {
            self.sign_url.as_deref()
        } else {
            None
        }
    }

    pub fn durability(&self) -> WriteDurability {
        if self.durable_writes {
            WriteDurability::Durable
        } else {
            WriteDurability::BestEffort
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub help: bool,
    pub config: Option<String>,
    pub account: Option<String>,
    pub cookie_dir: Option<String>,
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    pub sign_url: Option<String>,
    pub no_sign: bool,
    pub login_method: Option<LoginMethod>,
    pub phone: Option<String>,
    pub area_code: Option<String>,
    pub durable_writes: bool,
    pub mcp_http_port: Option<u16>,
}

fn take_value(
    slot: &mut Option<String>,
    args: &mut impl Iterator<Item = String>,
) -> Result<(), ()> {
    if slot.is_some() {
        return Err(());
    }
    *slot = Some(args.next().ok_or(())?);
    Ok(())
}

fn set_flag(flag: &mut bool) -> Result<(), ()> {
    if *flag {
        return Err(());
    }
    *flag = true;
    Ok(())
}

/// Parses flags after the program name. Duplicate, unknown or positional arguments are errors.
pub fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => set_flag(&mut options.help)?,
            "--config" => take_value(&mut options.config, &mut args)?,
            "--account" => take_value(&mut options.account, &mut args)?,
            "--cookie-dir" => take_value(&mut options.cookie_dir, &mut args)?,
            "--log-level" => take_value(&mut options.log_level, &mut args)?,
            "--log-file" => take_value(&mut options.log_file, &mut args)?,
            "--sign-url" => take_value(&mut options.sign_url, &mut args)?,
            "--no-sign" => set_flag(&mut options.no_sign)?,
            "--login-method" => {
                if options.login_method.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                options.login_method = Some(raw.parse()?);
            }
            "--phone" => take_value(&mut options.phone, &mut args)?,
            "--area-code" => take_value(&mut options.area_code, &mut args)?,
            "--durable-writes" => set_flag(&mut options.durable_writes)?,
            "--mcp-http-port" => {
                if options.mcp_http_port.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                let port: u16 = raw.parse().map_err(|_| ())?;
                options.mcp_http_port = Some(port);
            }
            _ => return Err(()),
        }
    }

    Ok(options)
}

/// Optional JSON file; every key may be omitted.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub account: Option<String>,
    pub cookie_dir: Option<String>,
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    pub sign_url: Option<String>,
    pub use_sign: Option<bool>,
    pub login_method: Option<LoginMethod>,
    pub phone: Option<String>,
    pub area_code: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Resolves settings from the process environment.
pub fn from_env(cli: CliOptions) -> Result<Settings, ConfigError> {
    resolve(cli, |key| std::env::var(key).ok())
}

/// Resolves settings with an injectable environment lookup. Empty values count as unset.
pub fn resolve(
    cli: CliOptions,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings, ConfigError> {
    let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());

    let file = match cli.config.clone().or_else(|| env("XHS_CONFIG")) {
        Some(path) => FileConfig::load(&expand_tilde(&path))?,
        None => FileConfig::default(),
    };

    let account_raw = cli
        .account
        .or_else(|| env("XHS_ACCOUNT"))
        .or(file.account)
        .unwrap_or_else(|| AccountId::DEFAULT.to_owned());
    let account = AccountId::new(account_raw.trim()).map_err(|source| ConfigError::Account {
        value: account_raw.clone(),
        source,
    })?;

    let cookie_dir = cli
        .cookie_dir
        .or_else(|| env("XHS_COOKIE_DIR"))
        .or(file.cookie_dir)
        .unwrap_or_else(|| DEFAULT_COOKIE_DIR.to_owned());

    let log_level = cli
        .log_level
        .or_else(|| env("XHS_LOG_LEVEL"))
        .or_else(|| env("MCP_LOG_LEVEL"))
        .or(file.log_level)
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned());

    let log_file = cli
        .log_file
        .or_else(|| env("XHS_LOG_FILE"))
        .or(file.log_file)
        .map(|path| expand_tilde(&path));

    let sign_url = cli
        .sign_url
        .or_else(|| env("XHS_SIGN_URL"))
        .or(file.sign_url)
        .map(|url| url.trim().to_owned());

    let use_sign = if cli.no_sign {
        false
    } else {
        match env("XHS_USE_SIGN") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidValue {
                key: "XHS_USE_SIGN",
                value: raw,
            })?,
            None => file.use_sign.unwrap_or(true),
        }
    };

    let login_method = match cli.login_method {
        Some(method) => method,
        None => match env("XHS_LOGIN_METHOD") {
            Some(raw) => raw.parse().map_err(|()| ConfigError::InvalidValue {
                key: "XHS_LOGIN_METHOD",
                value: raw,
            })?,
            None => file.login_method.unwrap_or_default(),
        },
    };

    let phone = cli
        .phone
        .or_else(|| env("XHS_PHONE"))
        .or(file.phone)
        .map(|phone| phone.trim().to_owned());
    let area_code = cli
        .area_code
        .or_else(|| env("XHS_AREA_CODE"))
        .or(file.area_code)
        .map(|code| normalize_area_code(&code))
        .unwrap_or_else(|| DEFAULT_AREA_CODE.to_owned());

    let durable_writes = match (cli.durable_writes, env("XHS_DURABLE_WRITES")) {
        (true, _) => true,
        (false, Some(raw)) => parse_bool(&raw).ok_or(ConfigError::InvalidValue {
            key: "XHS_DURABLE_WRITES",
            value: raw,
        })?,
        (false, None) => false,
    };

    let mcp_http_port = match (cli.mcp_http_port, env("XHS_MCP_HTTP_PORT")) {
        (Some(port), _) => Some(port),
        (None, Some(raw)) => Some(raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: "XHS_MCP_HTTP_PORT",
            value: raw,
        })?),
        (None, None) => None,
    };

    Ok(Settings {
        account,
        cookie_dir: expand_tilde(&cookie_dir),
        log_level,
        log_file,
        sign_url,
        use_sign,
        login: LoginSettings {
            method: login_method,
            phone,
            area_code,
        },
        durable_writes,
        mcp_http_port,
    })
}

/// `~` and `~/rest` resolve against the home directory; anything else is taken literally.
pub fn expand_tilde(raw: &str) -> PathBuf {
    let rest = if raw == "~" {
        Some("")
    } else {
        raw.strip_prefix("~/")
    };
    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw),
    }
}

/// Area codes are kept with a leading `+`.
pub fn normalize_area_code(raw: &str) -> String {
    let digits = raw.trim().trim_start_matches('+');
    format!("+{digits}")
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
