//! Manifest path resolution for flatpak-compose
//!
//! # Resolution Priority
//!
//! 1. `-f/--file` (or `FLATPAK_COMPOSE_FILE`), with `~` and variables expanded
//! 2. `flatpak-compose.yaml` in the working directory
//! 3. `flatpak-compose.yml` in the working directory
//!
//! An explicit path is never replaced by a fallback.

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

/// Environment variable naming the manifest
pub const ENV_MANIFEST: &str = "FLATPAK_COMPOSE_FILE";

/// Default manifest file name
pub const DEFAULT_MANIFEST: &str = "flatpak-compose.yaml";

/// Tried when the default does not exist
pub const FALLBACK_MANIFEST: &str = "flatpak-compose.yml";

/// Find the manifest to load
pub fn manifest_path(explicit: Option<&str>) -> Result<PathBuf> {
    manifest_path_in(Path::new("."), explicit)
}

fn manifest_path_in(dir: &Path, explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(file) = explicit {
        let path = expand(file);
        let path = if path.is_absolute() {
            path
        } else {
            dir.join(path)
        };
        if !path.exists() {
            bail!("Compose file not found: {}", path.display());
        }
        return Ok(path);
    }

    for name in [DEFAULT_MANIFEST, FALLBACK_MANIFEST] {
        let path = dir.join(name);
        if path.exists() {
            log::debug!("Using compose file {}", path.display());
            return Ok(path);
        }
    }

    bail!(
        "No compose file found; pass -f FILE or create {DEFAULT_MANIFEST} or {FALLBACK_MANIFEST} in the current directory"
    )
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_expand_with_tilde() {
        let result = expand("~/test/path");
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join("test").join("path"));
    }

    #[test]
    fn test_expand_absolute() {
        assert_eq!(expand("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAR_12345/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_VAR_12345/file"));
    }

    #[test]
    fn test_default_manifest_preferred() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DEFAULT_MANIFEST), "").unwrap();
        std::fs::write(dir.path().join(FALLBACK_MANIFEST), "").unwrap();
        let path = manifest_path_in(dir.path(), None).unwrap();
        assert_eq!(path, dir.path().join(DEFAULT_MANIFEST));
    }

    #[test]
    fn test_fallback_manifest() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(FALLBACK_MANIFEST), "").unwrap();
        let path = manifest_path_in(dir.path(), None).unwrap();
        assert_eq!(path, dir.path().join(FALLBACK_MANIFEST));
    }

    #[test]
    fn test_no_manifest_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = manifest_path_in(dir.path(), None).unwrap_err();
        assert!(err.to_string().contains("No compose file found"));
    }

    #[test]
    fn test_explicit_path_has_no_fallback() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DEFAULT_MANIFEST), "").unwrap();
        assert!(manifest_path_in(dir.path(), Some("other.yaml")).is_err());

        std::fs::write(dir.path().join("other.yaml"), "").unwrap();
        let path = manifest_path_in(dir.path(), Some("other.yaml")).unwrap();
        assert_eq!(path, dir.path().join("other.yaml"));
    }
}
