//! Real Flatpak CLI backend using `flatpak` commands.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::Installation;
use std::path::PathBuf;
use std::process::{Command, Output};

const LIST_COLUMNS: &str = "--columns=application,branch,origin,installation";

/// Backend that executes real `flatpak` commands.
pub struct FlatpakBackend {
    /// Path to the flatpak executable
    flatpak_path: PathBuf,
}

impl FlatpakBackend {
    /// Create a new FlatpakBackend.
    ///
    /// Returns an error if flatpak is not installed.
    pub fn new() -> Result<Self> {
        let flatpak_path = which::which("flatpak").map_err(|_| Error::FlatpakNotFound)?;
        Ok(Self { flatpak_path })
    }

    /// Run a flatpak command and return output.
    fn run_flatpak(&self, args: &[&str]) -> Result<Output> {
        log::trace!("flatpak {}", args.join(" "));
        Command::new(&self.flatpak_path)
            .args(args)
            .output()
            .map_err(|e| Error::CommandFailed {
                message: format!("failed to execute flatpak: {e}"),
                stderr: String::new(),
            })
    }

    /// Run a flatpak command and check for success.
    fn run_flatpak_checked(&self, args: &[&str], subject: Option<&str>) -> Result<String> {
        let output = self.run_flatpak(args)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::from_flatpak_output(&stderr, subject));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Backend for FlatpakBackend {
    fn list_apps(&self) -> Result<String> {
        self.run_flatpak_checked(&["list", "--app", LIST_COLUMNS], None)
    }

    fn show_overrides(&self, app: &str, scope: Installation) -> Result<String> {
        self.run_flatpak_checked(&["override", scope.flag(), "--show", app], Some(app))
    }

    fn metadata(&self, app: &str, installation: Installation) -> Result<String> {
        self.run_flatpak_checked(&["info", installation.flag(), "-M", app], Some(app))
    }

    fn permission_table(&self, app: &str) -> Result<String> {
        self.run_flatpak_checked(&["permission-show", app], Some(app))
    }
}
