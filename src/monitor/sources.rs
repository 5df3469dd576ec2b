//! Source provider abstraction for the monitor.
//!
//! The monitor never walks the filesystem itself; it receives a
//! `SourceProvider` that supplies the file list and contents. The CLI plugs in
//! a disk-backed walker, tests plug in `MockSourceProvider`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use anyhow::bail;

/// Supplies the files of one repository and their contents.
///
/// Implementations must be `Send + Sync`: cycles run on the blocking pool and
/// read files in parallel.
pub trait SourceProvider: Send + Sync {
    /// All files to scan this cycle. An error fails the whole cycle.
    fn files(&self) -> anyhow::Result<Vec<PathBuf>>;

    /// File content, or None if it can no longer be read.
    fn content(&self, path: &Path) -> Option<Arc<String>>;

    /// Root used to display paths relative to the repository.
    fn repo_path(&self) -> &Path;

    /// `path` relative to the repository root, with forward slashes
    fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(self.repo_path())
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

/// In-memory provider for tests and embedding.
pub struct MockSourceProvider {
    repo_path: PathBuf,
    contents: RwLock<BTreeMap<PathBuf, Arc<String>>>,
    failures_left: AtomicUsize,
}

impl MockSourceProvider {
    /// Build a mock from `(relative_path, content)` pairs.
    ///
    /// Paths are prefixed with `/mock/repo/` so tests never touch real files.
    pub fn new(entries: Vec<(&str, &str)>) -> Self {
        let repo_path = PathBuf::from("/mock/repo");
        let contents = entries
            .into_iter()
            .map(|(rel, body)| (repo_path.join(rel), Arc::new(body.to_string())))
            .collect();
        Self {
            repo_path,
            contents: RwLock::new(contents),
            failures_left: AtomicUsize::new(0),
        }
    }

    /// Make the next `n` calls to `files()` fail
    pub fn failing(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    /// Add or replace a file between cycles
    pub fn set(&self, rel: &str, body: &str) {
        if let Ok(mut contents) = self.contents.write() {
            contents.insert(self.repo_path.join(rel), Arc::new(body.to_string()));
        }
    }
}

impl SourceProvider for MockSourceProvider {
    fn files(&self) -> anyhow::Result<Vec<PathBuf>> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            bail!("mock source listing failed ({} failure(s) left)", left - 1);
        }
        match self.contents.read() {
            Ok(contents) => Ok(contents.keys().cloned().collect()),
            Err(_) => bail!("mock source map poisoned"),
        }
    }

    fn content(&self, path: &Path) -> Option<Arc<String>> {
        self.contents.read().ok()?.get(path).cloned()
    }

    fn repo_path(&self) -> &Path {
        &self.repo_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_lists_and_reads() {
        let mock = MockSourceProvider::new(vec![("app/b.py", "b"), ("app/a.py", "a")]);
        let files = mock.files().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(mock.display_path(&files[0]), "app/a.py");
        assert_eq!(mock.content(&files[1]).as_deref().map(String::as_str), Some("b"));
        assert!(mock.content(Path::new("/mock/repo/missing.py")).is_none());
    }

    #[test]
    fn test_mock_failures_then_recovers() {
        let mock = MockSourceProvider::new(vec![("a.py", "")]).failing(2);
        assert!(mock.files().is_err());
        assert!(mock.files().is_err());
        assert!(mock.files().is_ok());
    }

    #[test]
    fn test_set_replaces_content() {
        let mock = MockSourceProvider::new(vec![("a.py", "old")]);
        mock.set("a.py", "new");
        mock.set("b.py", "added");
        assert_eq!(mock.files().unwrap().len(), 2);
        assert_eq!(
            mock.content(Path::new("/mock/repo/a.py")).as_deref().map(String::as_str),
            Some("new")
        );
    }
}
