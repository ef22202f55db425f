//! Host package discovery.

use std::path::{Path, PathBuf};

use miette::{Result, miette};
use plexus_core::DESCRIPTOR_FILE;

/// Finds the host package root by searching from the current directory upwards.
///
/// Falls back to the current directory when no ancestor holds a descriptor.
pub fn find_package_root() -> Result<PathBuf> {
    let cwd =
        std::env::current_dir().map_err(|e| miette!("Cannot get current directory: {}", e))?;
    Ok(find_package_root_from(&cwd).unwrap_or(cwd))
}

/// Returns the nearest directory at or above `start` holding a package descriptor.
pub fn find_package_root_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(DESCRIPTOR_FILE).is_file())
        .map(Path::to_path_buf)
}

/// Returns the configuration file location, if the platform has a config directory.
pub fn config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("plexus").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_find_root_in_current() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(DESCRIPTOR_FILE), "{}").unwrap();

        assert_eq!(find_package_root_from(dir.path()), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_find_root_in_parent() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(DESCRIPTOR_FILE), "{}").unwrap();

        let subdir = dir.path().join("packages").join("tools");
        fs::create_dir_all(&subdir).unwrap();

        assert_eq!(find_package_root_from(&subdir), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_directory_named_like_descriptor_is_ignored() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir_all(nested.join(DESCRIPTOR_FILE)).unwrap();

        assert_ne!(find_package_root_from(&nested), Some(nested.clone()));
    }
}
