//! Platform-specific paths for topology files.
//!
//! # Directory Structure
//!
//! - **User config**: `~/.config/multiroom/` (Linux), `~/Library/Application Support/multiroom/` (macOS), `%APPDATA%\multiroom\` (Windows)
//! - **User topologies**: `<user config>/topologies/`
//!
//! # Example
//!
//! ```rust,no_run
//! use multiroom_config::paths;
//!
//! // Find a topology by name (searches the working directory, then the user directory)
//! if let Some(path) = paths::find_topology("house") {
//!     println!("Found topology at: {:?}", path);
//! }
//! ```

use std::path::{Path, PathBuf};

/// Application name used for directory paths.
const APP_NAME: &str = "multiroom";

/// Subdirectory name for topologies.
const TOPOLOGIES_SUBDIR: &str = "topologies";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the user-specific topologies directory.
pub fn user_topologies_dir() -> PathBuf {
    user_config_dir().join(TOPOLOGIES_SUBDIR)
}

/// Find a topology file by name.
///
/// Searches in the following order:
/// 1. The name as a path (absolute or relative to the working directory)
/// 2. `<name>.toml` in the working directory
/// 3. `<name>.toml` in the user topologies directory
pub fn find_topology(name: &str) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }

    let filename = if name.ends_with(".toml") {
        name.to_string()
    } else {
        format!("{}.toml", name)
    };

    let local = PathBuf::from(&filename);
    if local.is_file() {
        return Some(local);
    }

    let user_path = user_topologies_dir().join(&filename);
    if user_path.is_file() {
        return Some(user_path);
    }

    None
}

/// List all topology files in the user topologies directory.
///
/// Returns an empty vector if the directory doesn't exist or can't be read.
pub fn list_user_topologies() -> Vec<PathBuf> {
    list_toml_in_dir(&user_topologies_dir())
}

fn list_toml_in_dir(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    files.sort();
    files
}

/// Get the topology name from a file path (the file stem).
///
/// # Example
///
/// ```rust
/// use multiroom_config::paths::topology_name_from_path;
/// use std::path::Path;
///
/// let name = topology_name_from_path(Path::new("/path/to/house.toml"));
/// assert_eq!(name, Some("house".to_string()));
/// ```
pub fn topology_name_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_user_topologies_dir() {
        let dir = user_topologies_dir();
        let dir_str = dir.to_string_lossy();
        assert!(dir_str.contains("multiroom"));
        assert!(dir_str.ends_with("topologies"));
    }

    #[test]
    fn test_find_topology_by_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("house.toml");
        fs::write(&path, "name = \"house\"").unwrap();

        let found = find_topology(path.to_str().unwrap());
        assert_eq!(found, Some(path));
    }

    #[test]
    fn test_find_topology_not_found() {
        assert!(find_topology("nonexistent_topology_12345").is_none());
    }

    #[test]
    fn test_list_toml_in_dir() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.toml"), "").unwrap();
        fs::write(temp_dir.path().join("a.toml"), "").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "").unwrap();

        let files = list_toml_in_dir(temp_dir.path());
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| topology_name_from_path(p))
            .collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_list_nonexistent_dir() {
        assert!(list_toml_in_dir(Path::new("/nonexistent/path/12345")).is_empty());
    }
}
