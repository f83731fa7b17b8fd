//! Configured filesystem roots
//!
//! Each [`PathRole`] maps to at most one absolute path. Paths are set once
//! at startup and then read by every request handler.

use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::config::PathsConfig;
use crate::error::{AppError, Result};

/// Which operation a configured path serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathRole {
    Browse,
    Download,
    Upload,
}

impl PathRole {
    pub const ALL: [PathRole; 3] = [PathRole::Browse, PathRole::Download, PathRole::Upload];

    pub fn as_str(&self) -> &'static str {
        match self {
            PathRole::Browse => "browse",
            PathRole::Download => "download",
            PathRole::Upload => "upload",
        }
    }
}

impl fmt::Display for PathRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct Slots {
    browse: Option<PathBuf>,
    download: Option<PathBuf>,
    upload: Option<PathBuf>,
}

impl Slots {
    fn slot(&mut self, role: PathRole) -> &mut Option<PathBuf> {
        match role {
            PathRole::Browse => &mut self.browse,
            PathRole::Download => &mut self.download,
            PathRole::Upload => &mut self.upload,
        }
    }

    fn get(&self, role: PathRole) -> Option<&PathBuf> {
        match role {
            PathRole::Browse => self.browse.as_ref(),
            PathRole::Download => self.download.as_ref(),
            PathRole::Upload => self.upload.as_ref(),
        }
    }
}

/// Registry of the browse, download and upload roots
#[derive(Debug, Clone, Default)]
pub struct PathRegistry {
    inner: Arc<RwLock<Slots>>,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `path` against the working directory and store it for `role`.
    ///
    /// Last write wins. On failure the role's previous value is cleared, so a
    /// bad path never leaves a stale one in service.
    pub fn set_path(&self, path: impl AsRef<Path>, role: PathRole) -> Result<PathBuf> {
        let path = path.as_ref();
        let resolved = resolve(path);

        let mut slots = self.inner.write();
        match resolved {
            Ok(abs) => {
                tracing::info!(role = %role, path = %abs.display(), "Path configured");
                *slots.slot(role) = Some(abs.clone());
                Ok(abs)
            }
            Err(source) => {
                *slots.slot(role) = None;
                Err(AppError::Resolution {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    /// Apply every path present in the configuration
    pub fn apply(&self, config: &PathsConfig) -> Result<()> {
        for role in PathRole::ALL {
            if let Some(path) = config.get(role) {
                self.set_path(path, role)?;
            }
        }
        Ok(())
    }

    /// Get the configured path, or `NotConfigured` when the role is unset
    pub fn get(&self, role: PathRole) -> Result<PathBuf> {
        self.inner
            .read()
            .get(role)
            .cloned()
            .ok_or(AppError::NotConfigured(role))
    }

    pub fn is_configured(&self, role: PathRole) -> bool {
        self.inner.read().get(role).is_some()
    }

    /// Current value of every role, for startup logging
    pub fn snapshot(&self) -> Vec<(PathRole, Option<PathBuf>)> {
        let slots = self.inner.read();
        PathRole::ALL
            .iter()
            .map(|role| (*role, slots.get(*role).cloned()))
            .collect()
    }
}

/// Make `path` absolute against the current directory and drop `.` segments.
///
/// The path does not have to exist yet.
fn resolve(path: &Path) -> io::Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty path"));
    }

    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    Ok(joined
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect())
}
