//! Bounded-depth discovery of module entry files.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{PluginError, Result};

/// File stem every module entry file carries.
pub const MODULE_FILE_STEM: &str = "cli-module";

/// Supported module entry extensions.
pub const MODULE_EXTENSIONS: [&str; 2] = ["json", "toml"];

/// Kind of a listed directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Other,
}

/// A single entry returned by a [`FileLister`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Lists directory contents for the crawler.
pub trait FileLister: Send + Sync {
    fn list(&self, dir: &Path) -> io::Result<Vec<ListedEntry>>;
}

/// Lists the real filesystem. Entries are sorted by file name.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLister;

impl FileLister for FsLister {
    fn list(&self, dir: &Path) -> io::Result<Vec<ListedEntry>> {
        let mut entries = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            // Follows symlinks; dangling links are neither file nor directory.
            let kind = match std::fs::metadata(&path) {
                Ok(meta) if meta.is_dir() => EntryKind::Directory,
                Ok(meta) if meta.is_file() => EntryKind::File,
                _ => EntryKind::Other,
            };
            entries.push(ListedEntry { path, kind });
        }

        entries.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
        Ok(entries)
    }
}

/// In-memory directory tree.
///
/// Entries are listed in insertion order. Every listing call is counted so
/// callers can check how often the tree was walked.
#[derive(Debug, Default)]
pub struct MemoryLister {
    dirs: HashMap<PathBuf, Vec<ListedEntry>>,
    unreadable: Vec<PathBuf>,
    calls: AtomicUsize,
}

impl MemoryLister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, creating its parent directories.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.insert(path.into(), EntryKind::File);
        self
    }

    /// Adds an empty directory, creating its parents.
    pub fn with_dir(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.dirs.entry(path.clone()).or_default();
        self.insert(path, EntryKind::Directory);
        self
    }

    /// Marks a directory as failing to list.
    pub fn with_unreadable(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.unreadable.push(path.clone());
        self.with_dir(path)
    }

    /// Number of listing calls served so far.
    pub fn list_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn insert(&mut self, path: PathBuf, kind: EntryKind) {
        let Some(parent) = path.parent().map(Path::to_path_buf) else {
            return;
        };
        if parent.as_os_str().is_empty() {
            return;
        }

        let siblings = self.dirs.entry(parent.clone()).or_default();
        if siblings.iter().any(|e| e.path == path) {
            return;
        }
        siblings.push(ListedEntry { path, kind });

        self.insert(parent, EntryKind::Directory);
    }
}

impl FileLister for MemoryLister {
    fn list(&self, dir: &Path) -> io::Result<Vec<ListedEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.unreadable.iter().any(|p| p == dir) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {}", dir.display()),
            ));
        }

        self.dirs.get(dir).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", dir.display()),
            )
        })
    }
}

/// Returns true if `path` names a module entry file.
pub fn is_module_file(path: &Path) -> bool {
    let stem_matches = path.file_stem().and_then(|s| s.to_str()) == Some(MODULE_FILE_STEM);
    let ext_matches = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MODULE_EXTENSIONS.contains(&e));

    stem_matches && ext_matches
}

/// Walks a directory tree collecting module entry files.
#[derive(Clone)]
pub struct DirectoryCrawler {
    lister: Arc<dyn FileLister>,
}

impl DirectoryCrawler {
    pub fn new(lister: Arc<dyn FileLister>) -> Self {
        Self { lister }
    }

    /// Crawler over the real filesystem.
    pub fn filesystem() -> Self {
        Self::new(Arc::new(FsLister))
    }

    /// Collects module files under `base`, descending at most `max_depth` levels.
    ///
    /// Traversal is depth-first in lister order. Any listing failure aborts the
    /// whole crawl.
    pub fn crawl(&self, base: &Path, max_depth: i32) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        self.crawl_into(base, max_depth, &mut found)?;
        Ok(found)
    }

    fn crawl_into(&self, dir: &Path, depth: i32, found: &mut Vec<PathBuf>) -> Result<()> {
        if depth <= 0 {
            return Ok(());
        }

        let entries = self.lister.list(dir).map_err(|source| PluginError::Crawl {
            path: dir.to_path_buf(),
            source,
        })?;

        for entry in entries {
            match entry.kind {
                EntryKind::Directory => self.crawl_into(&entry.path, depth - 1, found)?,
                EntryKind::File if is_module_file(&entry.path) => found.push(entry.path),
                _ => {}
            }
        }

        Ok(())
    }
}

impl Default for DirectoryCrawler {
    fn default() -> Self {
        Self::filesystem()
    }
}
