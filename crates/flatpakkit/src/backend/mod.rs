//! Backend abstraction for Flatpak operations.
//!
//! The [`Backend`] trait returns raw command output; parsing lives in the
//! crate so that mock backends only need fixture text.

pub mod flatpak;

use crate::error::{Error, Result};
use crate::types::Installation;
use std::path::PathBuf;

/// Backend trait for reading Flatpak state.
///
/// This trait abstracts the underlying Flatpak implementation, enabling:
/// - Real CLI execution via the `flatpak` command
/// - Mock implementations for testing
pub trait Backend: Send + Sync {
    /// Output of `flatpak list --app --columns=application,branch,origin,installation`.
    fn list_apps(&self) -> Result<String>;

    /// Output of `flatpak override --show` for one installation scope.
    fn show_overrides(&self, app: &str, scope: Installation) -> Result<String>;

    /// Output of `flatpak info -M` (the application's own metadata).
    fn metadata(&self, app: &str, installation: Installation) -> Result<String>;

    /// Output of `flatpak permission-show`.
    fn permission_table(&self, app: &str) -> Result<String>;

    /// Base directory of an installation.
    fn installation_dir(&self, installation: Installation) -> Result<PathBuf> {
        installation.default_dir().ok_or_else(|| {
            Error::Other(format!(
                "cannot determine the {installation} installation directory"
            ))
        })
    }
}
