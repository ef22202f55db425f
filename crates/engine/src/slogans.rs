//! Slogan catalog and balanced random selection.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use plexus_core::PackageMetadata;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Returned when no slogans are available at all.
pub const FALLBACK_SLOGAN: &str = "Command-line interface for Plexus modules";

/// Location of a package's slogan file, relative to the package root.
pub const SLOGAN_FILE: &str = "workdocs/assets/slogans.json";

/// A slogan source that could not be read. Never surfaced to callers.
#[derive(Debug, Error)]
pub enum SloganSourceError {
    #[error("Failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed slogan file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct SloganRecord {
    #[serde(rename = "Slogan")]
    slogan: String,
}

/// Slogans of one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSlogans {
    pub name: String,
    pub slogans: Vec<String>,
}

/// Every slogan known to a selector, grouped by source.
#[derive(Debug, Clone, Default)]
pub struct SloganCatalog {
    /// Slogans of the host package.
    pub host: Vec<String>,

    /// Slogans of sibling packages, ordered by directory name.
    pub siblings: Vec<PackageSlogans>,
}

impl SloganCatalog {
    /// Reads the host slogan file and those of every sibling package.
    pub fn gather(root: &Path, sibling_dir: &Path) -> Self {
        let host = read_or_empty(&root.join(SLOGAN_FILE));

        let mut dirs = match fs::read_dir(sibling_dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect::<Vec<_>>(),
            Err(e) => {
                debug!(dir = %sibling_dir.display(), error = %e, "no sibling packages");
                Vec::new()
            }
        };
        dirs.sort();

        let siblings = dirs
            .into_iter()
            .map(|dir| PackageSlogans {
                name: package_name(&dir),
                slogans: read_or_empty(&dir.join(SLOGAN_FILE)),
            })
            .collect();

        Self { host, siblings }
    }

    /// Splits the catalog into the slogans of `priority` and all others.
    pub fn pool(&self, priority: Option<&str>) -> SloganPool {
        let mut pool = SloganPool {
            priority: Vec::new(),
            other: self.host.clone(),
        };

        for sibling in &self.siblings {
            if Some(sibling.name.as_str()) == priority {
                pool.priority.extend(sibling.slogans.iter().cloned());
            } else {
                pool.other.extend(sibling.slogans.iter().cloned());
            }
        }

        pool
    }
}

/// Slogans split into a priority group and everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SloganPool {
    pub priority: Vec<String>,
    pub other: Vec<String>,
}

impl SloganPool {
    /// Interleaves both groups, cycling the shorter, priority first.
    ///
    /// The result holds `2 * max(p, o)` items, so each group has an even
    /// chance of being picked. Empty when either group is empty.
    pub fn balanced(&self) -> Vec<&str> {
        if self.priority.is_empty() || self.other.is_empty() {
            return Vec::new();
        }

        let len = self.priority.len().max(self.other.len());
        let mut pool = Vec::with_capacity(len * 2);
        for i in 0..len {
            pool.push(self.priority[i % self.priority.len()].as_str());
            pool.push(self.other[i % self.other.len()].as_str());
        }
        pool
    }

    /// Picks one slogan uniformly from the pool that applies.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let chosen = match (self.priority.is_empty(), self.other.is_empty()) {
            (true, true) => None,
            (false, true) => self.priority.choose(rng).map(String::as_str),
            (true, false) => self.other.choose(rng).map(String::as_str),
            (false, false) => self.balanced().choose(rng).copied(),
        };

        chosen.unwrap_or(FALLBACK_SLOGAN).to_string()
    }
}

/// Picks banner slogans from the host and sibling packages.
#[derive(Debug)]
pub struct SloganSelector {
    root: PathBuf,
    sibling_dir: PathBuf,
    catalog: OnceLock<SloganCatalog>,
}

impl SloganSelector {
    /// `sibling_dir` is resolved against `root` when relative.
    pub fn new(root: impl Into<PathBuf>, sibling_dir: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let sibling_dir = root.join(sibling_dir.into());
        Self {
            root,
            sibling_dir,
            catalog: OnceLock::new(),
        }
    }

    /// The catalog, gathered on first use.
    pub fn catalog(&self) -> &SloganCatalog {
        self.catalog
            .get_or_init(|| SloganCatalog::gather(&self.root, &self.sibling_dir))
    }

    pub fn select(&self, priority: Option<&str>) -> String {
        self.select_with(priority, &mut rand::thread_rng())
    }

    pub fn select_with<R: Rng + ?Sized>(&self, priority: Option<&str>, rng: &mut R) -> String {
        self.catalog().pool(priority).pick(rng)
    }

    /// Drops the cached catalog so the next selection reads it again.
    pub fn invalidate(&mut self) {
        self.catalog.take();
    }
}

fn read_or_empty(path: &Path) -> Vec<String> {
    match read_slogans(path) {
        Ok(slogans) => slogans,
        Err(e) => {
            debug!(error = %e, "ignoring slogan source");
            Vec::new()
        }
    }
}

/// Reads a slogan file. A missing file holds no slogans.
pub fn read_slogans(path: &Path) -> Result<Vec<String>, SloganSourceError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(SloganSourceError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let records: Vec<SloganRecord> =
        serde_json::from_str(&content).map_err(|source| SloganSourceError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(records.into_iter().map(|r| r.slogan).collect())
}

fn package_name(dir: &Path) -> String {
    match PackageMetadata::read(dir) {
        Ok(meta) => meta.unscoped_name().to_string(),
        Err(_) => dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::tempdir;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn write_slogans(dir: &Path, slogans: &[&str]) {
        let path = dir.join(SLOGAN_FILE);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let records: Vec<_> = slogans
            .iter()
            .map(|s| serde_json::json!({ "Slogan": s }))
            .collect();
        fs::write(path, serde_json::to_string(&records).unwrap()).unwrap();
    }

    #[test]
    fn test_empty_pool_falls_back() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(SloganPool::default().pick(&mut rng), FALLBACK_SLOGAN);
    }

    #[test]
    fn test_single_group_is_used_alone() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = SloganPool {
            priority: Vec::new(),
            other: strings(&["a", "b"]),
        };
        for _ in 0..20 {
            assert!(["a", "b"].contains(&pool.pick(&mut rng).as_str()));
        }

        let pool = SloganPool {
            priority: strings(&["p"]),
            other: Vec::new(),
        };
        assert_eq!(pool.pick(&mut rng), "p");
    }

    #[test]
    fn test_balanced_pool_interleaves() {
        let pool = SloganPool {
            priority: strings(&["p1"]),
            other: strings(&["o1", "o2", "o3"]),
        };
        assert_eq!(pool.balanced(), vec!["p1", "o1", "p1", "o2", "p1", "o3"]);

        let pool = SloganPool {
            priority: strings(&["p1", "p2"]),
            other: strings(&["o1"]),
        };
        assert_eq!(pool.balanced(), vec!["p1", "o1", "p2", "o1"]);
    }

    #[test]
    fn test_balanced_pick_reaches_both_groups() {
        let pool = SloganPool {
            priority: strings(&["p"]),
            other: strings(&["o1", "o2", "o3", "o4"]),
        };

        let mut rng = StdRng::seed_from_u64(42);
        let picks: Vec<String> = (0..200).map(|_| pool.pick(&mut rng)).collect();
        let priority = picks.iter().filter(|s| *s == "p").count();

        // Half the balanced pool is the priority slogan.
        assert!(priority > 60 && priority < 140, "{}", priority);
    }

    #[test]
    fn test_gather_reads_host_and_siblings() {
        let root = tempdir().unwrap();
        write_slogans(root.path(), &["host"]);

        let siblings = root.path().join("node_modules/@plexus");
        let demo = siblings.join("demo-pkg");
        fs::create_dir_all(&demo).unwrap();
        fs::write(
            demo.join("package.json"),
            r#"{ "name": "@plexus/demo", "version": "1.0.0" }"#,
        )
        .unwrap();
        write_slogans(&demo, &["demo slogan"]);

        let other = siblings.join("other");
        fs::create_dir_all(&other).unwrap();
        write_slogans(&other, &["other slogan"]);

        let selector = SloganSelector::new(root.path(), "node_modules/@plexus");
        let pool = selector.catalog().pool(Some("demo"));
        assert_eq!(pool.priority, strings(&["demo slogan"]));
        assert_eq!(pool.other, strings(&["host", "other slogan"]));
    }

    #[test]
    fn test_broken_sources_are_ignored() {
        let root = tempdir().unwrap();
        let path = root.path().join(SLOGAN_FILE);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        assert!(matches!(read_slogans(&path), Err(SloganSourceError::Parse { .. })));

        let selector = SloganSelector::new(root.path(), "node_modules/@plexus");
        assert_eq!(selector.select(None), FALLBACK_SLOGAN);
    }

    #[test]
    fn test_catalog_is_cached_until_invalidated() {
        let root = tempdir().unwrap();
        let mut selector = SloganSelector::new(root.path(), "node_modules/@plexus");
        assert_eq!(selector.select(None), FALLBACK_SLOGAN);

        write_slogans(root.path(), &["fresh"]);
        assert_eq!(selector.select(None), FALLBACK_SLOGAN);

        selector.invalidate();
        assert_eq!(selector.select(None), "fresh");
    }
}
