//! On-demand directory archives
//!
//! Builds a single compressed file from a directory so it can be served by
//! `GET /download`. ZIP is the default container; tar+gzip is available via
//! `ARCHIVE_FORMAT=tar.gz`.
//!
//! Archives are staged as temporary files owned by an [`ArchiveJob`]. The
//! file is removed when the job is dropped, which for downloads means once the
//! response body has been fully sent or abandoned.

mod tar_format;
mod zip_format;

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::TempPath;
use walkdir::WalkDir;

use crate::error::{AppError, Result};

/// Container format for directory downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ArchiveFormat {
    #[default]
    #[serde(rename = "zip")]
    Zip,
    #[serde(rename = "tar.gz", alias = "tgz")]
    TarGz,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar.gz",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "application/zip",
            ArchiveFormat::TarGz => "application/gzip",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArchiveFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zip" => Ok(ArchiveFormat::Zip),
            "tar.gz" | "tgz" | "targz" => Ok(ArchiveFormat::TarGz),
            other => Err(format!("unsupported archive format '{}', expected zip or tar.gz", other)),
        }
    }
}

/// One item to store, named relative to the archived directory
#[derive(Debug)]
pub(crate) enum ArchiveEntry {
    Dir { name: String, path: PathBuf },
    File { name: String, path: PathBuf, len: u64 },
}

/// Builds archives of directories
#[derive(Debug, Clone, Default)]
pub struct ArchiveBuilder {
    format: ArchiveFormat,
    staging_dir: Option<PathBuf>,
}

impl ArchiveBuilder {
    pub fn new(format: ArchiveFormat) -> Self {
        Self {
            format,
            staging_dir: None,
        }
    }

    /// Stage archives in `dir` instead of next to the source directory
    pub fn with_staging_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.staging_dir = dir;
        self
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// Archive every descendant of `source_dir`.
    ///
    /// On error the partially written file is removed before returning.
    pub fn build(&self, source_dir: &Path) -> Result<ArchiveJob> {
        let start = std::time::Instant::now();

        let dir_name = source_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "archive".to_string());

        let staging = self
            .staging_dir
            .clone()
            .or_else(|| source_dir.parent().map(Path::to_path_buf))
            .unwrap_or_else(std::env::temp_dir);

        let temp = tempfile::Builder::new()
            .prefix(&format!("{}.", dir_name))
            .suffix(&format!(".{}", self.format.extension()))
            .tempfile_in(&staging)?;
        let (file, temp_path) = temp.into_parts();

        // From here on, dropping `temp_path` on an error path deletes the
        // partial archive.
        let entries = collect_entries(source_dir, &temp_path)?;
        let len = match self.format {
            ArchiveFormat::Zip => zip_format::write(file, &entries)?,
            ArchiveFormat::TarGz => tar_format::write(file, &entries)?,
        };

        let files = entries
            .iter()
            .filter(|e| matches!(e, ArchiveEntry::File { .. }))
            .count();
        tracing::info!(
            source = %source_dir.display(),
            archive = %temp_path.display(),
            format = %self.format,
            files,
            bytes = len,
            elapsed = ?start.elapsed(),
            "Archive built"
        );

        Ok(ArchiveJob {
            source: source_dir.to_path_buf(),
            format: self.format,
            download_name: format!("{}.{}", dir_name, self.format.extension()),
            len,
            path: Some(temp_path),
        })
    }

    /// [`build`](Self::build) on the blocking pool
    pub async fn build_blocking(&self, source_dir: PathBuf) -> Result<ArchiveJob> {
        let builder = self.clone();
        tokio::task::spawn_blocking(move || builder.build(&source_dir)).await?
    }
}

/// A built archive on disk, deleted on drop
#[derive(Debug)]
pub struct ArchiveJob {
    source: PathBuf,
    format: ArchiveFormat,
    download_name: String,
    len: u64,
    path: Option<TempPath>,
}

impl ArchiveJob {
    pub fn path(&self) -> &Path {
        // Only `Drop` takes the path out.
        self.path.as_deref().unwrap_or(Path::new(""))
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// File name offered to the client, e.g. `docs.zip`
    pub fn download_name(&self) -> &str {
        &self.download_name
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for ArchiveJob {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let shown = path.display().to_string();
            match path.close() {
                Ok(()) => tracing::debug!(archive = %shown, "Temporary archive removed"),
                Err(e) => tracing::warn!(archive = %shown, "Failed to remove temporary archive: {}", e),
            }
        }
    }
}

/// Enumerate `source_dir` depth-first, directories before their contents.
///
/// `exclude` keeps the archive being written out of its own contents when it
/// is staged inside the source tree.
fn collect_entries(source_dir: &Path, exclude: &Path) -> Result<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();

    for item in WalkDir::new(source_dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let item = item?;
        if item.path() == exclude {
            continue;
        }

        let relative = item
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| AppError::Internal(format!("Walk left the archive root: {}", e)))?;
        let name = archive_name(relative);
        let file_type = item.file_type();

        if file_type.is_dir() {
            entries.push(ArchiveEntry::Dir {
                name,
                path: item.into_path(),
            });
        } else if file_type.is_file() {
            let len = item.metadata()?.len();
            entries.push(ArchiveEntry::File {
                name,
                path: item.into_path(),
                len,
            });
        } else {
            tracing::debug!(path = %item.path().display(), "Skipping non-regular file");
        }
    }

    Ok(entries)
}

/// `/`-separated archive member name for a relative path
fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs;
    use std::io::{Cursor, Read};
    use tempfile::TempDir;

    /// Relative file name -> contents for every regular file under `root`
    pub(crate) fn tree_contents(root: &Path) -> BTreeMap<String, Vec<u8>> {
        WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .map(|e| e.unwrap())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let name = archive_name(e.path().strip_prefix(root).unwrap());
                (name, fs::read(e.path()).unwrap())
            })
            .collect()
    }

    pub(crate) fn unzip(bytes: &[u8]) -> BTreeMap<String, Vec<u8>> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut files = BTreeMap::new();
        for i in 0..archive.len() {
            let mut member = archive.by_index(i).unwrap();
            if member.is_dir() {
                continue;
            }
            let mut data = Vec::new();
            member.read_to_end(&mut data).unwrap();
            files.insert(member.name().to_string(), data);
        }
        files
    }

    pub(crate) fn untar(bytes: &[u8]) -> BTreeMap<String, Vec<u8>> {
        let decoder = flate2::read::GzDecoder::new(Cursor::new(bytes));
        let mut archive = tar::Archive::new(decoder);
        let mut files = BTreeMap::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            files.insert(name, data);
        }
        files
    }

    /// `<tmp>/share/docs` with nested content, so staging lands in `share`
    fn sample_source() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("share/docs");
        fs::create_dir_all(docs.join("notes/deep")).unwrap();
        fs::create_dir_all(docs.join("empty")).unwrap();
        fs::write(docs.join("readme.md"), b"# Docs\n").unwrap();
        fs::write(docs.join("notes/todo.txt"), b"ship it").unwrap();
        let binary: Vec<u8> = (0..=255u8).cycle().take(300_000).collect();
        fs::write(docs.join("notes/deep/blob.bin"), binary).unwrap();
        (temp, docs)
    }

    fn leftovers(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".zip") || name.ends_with(".tar.gz"))
            .collect()
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("zip".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Zip);
        assert_eq!("TAR.GZ".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::TarGz);
        assert_eq!("tgz".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::TarGz);
        assert!("7z".parse::<ArchiveFormat>().is_err());
        assert_eq!(ArchiveFormat::Zip.mime_type(), "application/zip");
    }

    #[test]
    fn test_archive_name_uses_forward_slashes() {
        let relative: PathBuf = ["notes", "deep", "blob.bin"].iter().collect();
        assert_eq!(archive_name(&relative), "notes/deep/blob.bin");
    }

    #[test]
    fn test_zip_round_trip() {
        let (_temp, docs) = sample_source();
        let job = ArchiveBuilder::new(ArchiveFormat::Zip).build(&docs).unwrap();

        assert_eq!(job.download_name(), "docs.zip");
        assert_eq!(job.path().parent().unwrap(), docs.parent().unwrap());
        assert!(!job.is_empty());

        let bytes = fs::read(job.path()).unwrap();
        assert_eq!(bytes.len() as u64, job.len());
        assert_eq!(unzip(&bytes), tree_contents(&docs));
    }

    #[test]
    fn test_zip_keeps_empty_directories() {
        let (_temp, docs) = sample_source();
        let job = ArchiveBuilder::new(ArchiveFormat::Zip).build(&docs).unwrap();

        let bytes = fs::read(job.path()).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<_> = archive.file_names().collect();
        assert!(names.contains(&"empty/"));
        assert!(names.iter().all(|n| !n.starts_with('/')));
    }

    #[test]
    fn test_tar_gz_round_trip() {
        let (_temp, docs) = sample_source();
        let job = ArchiveBuilder::new(ArchiveFormat::TarGz).build(&docs).unwrap();

        assert_eq!(job.download_name(), "docs.tar.gz");
        let bytes = fs::read(job.path()).unwrap();
        assert_eq!(untar(&bytes), tree_contents(&docs));
    }

    #[test]
    fn test_rebuild_extracts_identically() {
        let (_temp, docs) = sample_source();
        let builder = ArchiveBuilder::new(ArchiveFormat::Zip);

        let first = builder.build(&docs).unwrap();
        let second = builder.build(&docs).unwrap();
        assert_ne!(first.path(), second.path());

        let a = unzip(&fs::read(first.path()).unwrap());
        let b = unzip(&fs::read(second.path()).unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn test_archive_removed_on_drop() {
        let (_temp, docs) = sample_source();
        let job = ArchiveBuilder::new(ArchiveFormat::Zip).build(&docs).unwrap();
        let path = job.path().to_path_buf();
        assert!(path.exists());

        drop(job);
        assert!(!path.exists());
        assert!(leftovers(docs.parent().unwrap()).is_empty());
    }

    #[test]
    fn test_failed_build_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing");

        let result = ArchiveBuilder::new(ArchiveFormat::Zip).build(&missing);
        assert!(result.is_err());
        assert!(leftovers(temp.path()).is_empty());
    }

    #[test]
    fn test_staging_inside_source_is_excluded() {
        let (_temp, docs) = sample_source();
        let job = ArchiveBuilder::new(ArchiveFormat::Zip)
            .with_staging_dir(Some(docs.clone()))
            .build(&docs)
            .unwrap();

        let files = unzip(&fs::read(job.path()).unwrap());
        assert!(files.keys().all(|name| !name.ends_with(".zip")));
        assert_eq!(files.len(), 3);
    }

    #[tokio::test]
    async fn test_build_blocking() {
        let (_temp, docs) = sample_source();
        let job = ArchiveBuilder::new(ArchiveFormat::Zip)
            .build_blocking(docs.clone())
            .await
            .unwrap();
        assert_eq!(job.source(), docs.as_path());
        assert_eq!(job.format(), ArchiveFormat::Zip);
    }
}
