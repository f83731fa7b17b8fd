//! Recursive directory indexer

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::Result;

use super::entry::BrowseEntry;

/// Walks a root into an ordered listing of [`BrowseEntry`] records
#[derive(Debug, Clone, Default)]
pub struct DirectoryIndexer {
    max_depth: Option<usize>,
}

impl DirectoryIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop descending below `depth` levels (direct children are depth 1)
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Index everything below `root` in depth-first pre-order.
    ///
    /// The root itself is not listed. Siblings are visited in file-name
    /// order, so the listing is stable for an unchanging tree. Any unreadable
    /// node, the root included, fails the whole walk.
    pub fn index(&self, root: &Path) -> Result<Vec<BrowseEntry>> {
        tracing::debug!(root = %root.display(), "Indexing directory");
        let start = std::time::Instant::now();

        let mut walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name();
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut entries = Vec::new();

        for item in walker {
            let item = item?;

            let relative = item.path().strip_prefix(root).unwrap_or(item.path());
            let absolute = root.join(relative);

            if !seen.insert(absolute.clone()) {
                tracing::debug!(path = %absolute.display(), "Skipping duplicate entry");
                continue;
            }

            entries.push(BrowseEntry::new(&absolute, item.file_type().is_dir()));
        }

        tracing::info!(
            root = %root.display(),
            entries = entries.len(),
            elapsed = ?start.elapsed(),
            "Index complete"
        );

        Ok(entries)
    }

    /// [`index`](Self::index) on the blocking pool
    pub async fn index_blocking(&self, root: PathBuf) -> Result<Vec<BrowseEntry>> {
        let indexer = self.clone();
        tokio::task::spawn_blocking(move || indexer.index(&root)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::fs;
    use tempfile::TempDir;

    fn sample_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), b"alpha").unwrap();
        fs::create_dir(temp.path().join("b")).unwrap();
        fs::write(temp.path().join("b/c.txt"), b"charlie").unwrap();
        temp
    }

    fn listing_paths(entries: &[BrowseEntry]) -> Vec<String> {
        entries.iter().map(|e| e.path.clone()).collect()
    }

    #[test]
    fn test_index_scenario() {
        let temp = sample_tree();
        let root = temp.path();

        let entries = DirectoryIndexer::new().index(root).unwrap();

        assert_eq!(entries.len(), 3);

        let shape: Vec<_> = entries
            .iter()
            .map(|e| (e.base_name.as_str(), e.is_dir))
            .collect();
        assert_eq!(shape, vec![("a.txt", false), ("b", true), ("c.txt", false)]);

        assert_eq!(entries[0].path, root.join("a.txt").to_string_lossy());
        assert_eq!(entries[1].path, root.join("b").to_string_lossy());
        assert_eq!(entries[2].path, root.join("b/c.txt").to_string_lossy());
    }

    #[test]
    fn test_paths_unique_and_classified() {
        let temp = sample_tree();
        fs::create_dir_all(temp.path().join("b/d/e")).unwrap();
        fs::write(temp.path().join("b/d/e/f.bin"), [0u8, 1, 2]).unwrap();
        fs::write(temp.path().join("b/d/g.txt"), b"golf").unwrap();

        let entries = DirectoryIndexer::new().index(temp.path()).unwrap();

        let unique: HashSet<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(unique.len(), entries.len());

        for entry in &entries {
            let meta = fs::symlink_metadata(&entry.path).unwrap();
            assert_eq!(entry.is_dir, meta.is_dir(), "{}", entry.path);
            assert!(Path::new(&entry.path).is_absolute());
        }

        let files = entries.iter().filter(|e| !e.is_dir).count();
        assert_eq!(files, 4);
    }

    #[test]
    fn test_directory_precedes_children() {
        let temp = sample_tree();
        let entries = DirectoryIndexer::new().index(temp.path()).unwrap();
        let paths = listing_paths(&entries);

        let dir = paths.iter().position(|p| p.ends_with("b")).unwrap();
        let child = paths.iter().position(|p| p.ends_with("c.txt")).unwrap();
        assert!(dir < child);
    }

    #[test]
    fn test_listing_is_stable() {
        let temp = sample_tree();
        let indexer = DirectoryIndexer::new();

        let first = listing_paths(&indexer.index(temp.path()).unwrap());
        let second = listing_paths(&indexer.index(temp.path()).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_max_depth_bounds_walk() {
        let temp = sample_tree();
        let entries = DirectoryIndexer::new()
            .with_max_depth(Some(1))
            .index(temp.path())
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.base_name != "c.txt"));
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = DirectoryIndexer::new().index(&temp.path().join("missing"));
        assert!(matches!(result, Err(AppError::Walk(_))));
    }

    #[tokio::test]
    async fn test_index_blocking() {
        let temp = sample_tree();
        let entries = DirectoryIndexer::new()
            .index_blocking(temp.path().to_path_buf())
            .await
            .unwrap();
        assert_eq!(entries.len(), 3);
    }
}
