//! Configuration management for LanShare Server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::archive::ArchiveFormat;
use crate::paths::PathRole;
use crate::signal::FailureSignal;

/// Port used when none (or garbage) is supplied
pub const DEFAULT_PORT: u16 = 8080;

/// Upload write buffer: 64KB
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub paths: PathsConfig,
    pub transfer: TransferConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Escalate server-side request errors to the failure signal
    pub fail_fast: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    pub browse: Option<PathBuf>,
    pub download: Option<PathBuf>,
    pub upload: Option<PathBuf>,
}

impl PathsConfig {
    pub fn get(&self, role: PathRole) -> Option<&PathBuf> {
        match role {
            PathRole::Browse => self.browse.as_ref(),
            PathRole::Download => self.download.as_ref(),
            PathRole::Upload => self.upload.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    pub archive_format: ArchiveFormat,
    /// Where archives are staged; defaults to the archived directory's parent
    pub archive_temp_dir: Option<PathBuf>,
    pub upload_chunk_size: usize,
    /// 0 = unlimited
    pub max_upload_bytes: u64,
    pub browse_max_depth: Option<usize>,
}

/// Errors for values that are present but unusable
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: DEFAULT_PORT,
                fail_fast: false,
            },
            paths: PathsConfig::default(),
            transfer: TransferConfig {
                archive_format: ArchiveFormat::Zip,
                archive_temp_dir: None,
                upload_chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
                max_upload_bytes: 0,
                browse_max_depth: None,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config for startup. An invalid value raises `failure` and
    /// yields `None`; the service never starts on a partial config.
    pub fn load_or_signal<F>(lookup: F, failure: &FailureSignal) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match Self::from_lookup(lookup) {
            Ok(config) => Some(config),
            Err(e) => {
                failure.signal(format!("configuration error: {}", e));
                None
            }
        }
    }

    /// Build a config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Config::default();

        let archive_format = match get("ARCHIVE_FORMAT") {
            Some(value) => value.parse().map_err(|reason| ConfigError::Invalid {
                key: "ARCHIVE_FORMAT",
                value,
                reason,
            })?,
            None => defaults.transfer.archive_format,
        };

        let upload_chunk_size = match get("UPLOAD_CHUNK_SIZE") {
            Some(value) => match value.parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "UPLOAD_CHUNK_SIZE",
                        value,
                        reason: "expected a positive byte count".to_string(),
                    })
                }
            },
            None => defaults.transfer.upload_chunk_size,
        };

        let max_upload_bytes = match get("MAX_UPLOAD_BYTES") {
            Some(value) => value.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                key: "MAX_UPLOAD_BYTES",
                value,
                reason: e.to_string(),
            })?,
            None => defaults.transfer.max_upload_bytes,
        };

        // Depth 1 is the browse root's direct children
        let browse_max_depth = match get("BROWSE_MAX_DEPTH") {
            Some(value) => match value.parse::<usize>() {
                Ok(depth) if depth > 0 => Some(depth),
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "BROWSE_MAX_DEPTH",
                        value,
                        reason: "expected a positive depth".to_string(),
                    })
                }
            },
            None => None,
        };

        Ok(Config {
            server: ServerConfig {
                host: get("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_port(get("SERVER_PORT").as_deref()),
                fail_fast: get("FAIL_FAST")
                    .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                    .unwrap_or(false),
            },
            paths: PathsConfig {
                browse: get("BROWSE_PATH").map(PathBuf::from),
                download: get("DOWNLOAD_PATH").map(PathBuf::from),
                upload: get("UPLOAD_PATH").map(PathBuf::from),
            },
            transfer: TransferConfig {
                archive_format,
                archive_temp_dir: get("ARCHIVE_TEMP_DIR").map(PathBuf::from),
                upload_chunk_size,
                max_upload_bytes,
                browse_max_depth,
            },
        })
    }
}

/// Parse a port value, falling back to [`DEFAULT_PORT`] when it is missing,
/// blank, zero or not a number.
pub fn parse_port(value: Option<&str>) -> u16 {
    value
        .map(str::trim)
        .and_then(|v| v.parse::<u16>().ok())
        .filter(|port| *port != 0)
        .unwrap_or(DEFAULT_PORT)
}
