/**
 * Project Directories Module
 *
 * Resolves the project root and the directories derived from it.
 *
 * All LRA data is stored under:
 * - {project_root}/data/input/lra_data/
 *
 * The project root is taken from `--root`, then `LRA_DATA_ROOT`,
 * then the current working directory.
 */
use std::path::{Path, PathBuf};

use crate::error::{DataError, Result};

/// Environment variable that overrides the project root
pub const ROOT_ENV_VAR: &str = "LRA_DATA_ROOT";

/// Default data directory, relative to the project root
pub const DEFAULT_DATA_DIR: &str = "data/input/lra_data";

/// Resolve the project root
///
/// An explicit path wins, then `LRA_DATA_ROOT`, then the current directory.
pub fn resolve_project_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(root) = explicit {
        return Ok(root.to_path_buf());
    }

    if let Some(root) = std::env::var_os(ROOT_ENV_VAR) {
        if !root.is_empty() {
            return Ok(PathBuf::from(root));
        }
    }

    std::env::current_dir().map_err(|e| DataError::io(".", e))
}

/// Get the LRA data directory
///
/// Returns: {project_root}/{relative}/
pub fn data_dir(project_root: &Path, relative: &Path) -> PathBuf {
    project_root.join(relative)
}

/// Get the base directory the training side uses
///
/// The data directory is `{base_dir}/input/lra_data`, so the base is `{project_root}/data`.
pub fn base_dir(project_root: &Path) -> PathBuf {
    project_root.join("data")
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| DataError::io(path, e))?;
    }
    Ok(())
}

/// Remove a file or a directory tree. A missing path is not an error.
pub fn remove_path(path: &Path) -> Result<bool> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(DataError::io(path, e)),
    };

    if metadata.is_dir() {
        std::fs::remove_dir_all(path).map_err(|e| DataError::io(path, e))?;
    } else {
        std::fs::remove_file(path).map_err(|e| DataError::io(path, e))?;
    }
    Ok(true)
}

/// Calculate the size of a file or directory recursively
pub fn dir_size(path: &Path) -> u64 {
    if !path.exists() {
        return 0;
    }

    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_root_wins() {
        let root = resolve_project_root(Some(Path::new("/tmp/project"))).unwrap();
        assert_eq!(root, PathBuf::from("/tmp/project"));
    }

    #[test]
    fn test_default_data_dir_layout() {
        let dir = data_dir(Path::new("/p"), Path::new(DEFAULT_DATA_DIR));
        assert_eq!(dir, PathBuf::from("/p/data/input/lra_data"));
        assert!(dir.starts_with(base_dir(Path::new("/p"))));
    }

    #[test]
    fn test_remove_path_handles_files_dirs_and_missing() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.txt");
        let dir = tmp.path().join("tree/nested");
        std::fs::write(&file, b"x").unwrap();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("b.txt"), b"yy").unwrap();

        assert!(remove_path(&file).unwrap());
        assert!(remove_path(&tmp.path().join("tree")).unwrap());
        assert!(!remove_path(&tmp.path().join("missing")).unwrap());
        assert!(!file.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn test_dir_size_counts_nested_files() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("x/y")).unwrap();
        std::fs::write(tmp.path().join("x/a"), vec![0u8; 10]).unwrap();
        std::fs::write(tmp.path().join("x/y/b"), vec![0u8; 5]).unwrap();

        assert_eq!(dir_size(tmp.path()), 15);
        assert_eq!(dir_size(&tmp.path().join("nope")), 0);
    }
}
