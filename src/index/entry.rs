//! Listing record

use serde::{Deserialize, Serialize};
use std::path::Path;

/// One filesystem node discovered during a walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseEntry {
    /// Absolute path of the node
    pub path: String,
    pub is_dir: bool,
    /// Final path component
    pub base_name: String,
}

impl BrowseEntry {
    pub fn new(path: &Path, is_dir: bool) -> Self {
        let base_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        Self {
            path: path.to_string_lossy().into_owned(),
            is_dir,
            base_name,
        }
    }
}
