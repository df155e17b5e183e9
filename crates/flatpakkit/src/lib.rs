//! # flatpakkit
//!
//! Pure Rust library for reading the state of Flatpak installations.
//!
//! This crate provides functionality for:
//! - Listing installed applications
//! - Reading static overrides and application metadata as override flags
//! - Reading dynamic permission-store grants
//! - Reading remotes and core settings from ostree repo configs
//! - Describing `flatpak`/`ostree` commands as printable [`Invocation`]s
//!
//! ## Example
//!
//! ```no_run
//! use flatpakkit::{Client, Installation};
//!
//! let client = Client::new().expect("flatpak not available");
//!
//! for app in client.installed_apps().expect("list failed") {
//!     let flags = client
//!         .overrides(&app.application, Installation::System)
//!         .expect("override lookup failed");
//!     println!("{} ({}): {}", app.application, app.installation, flags.join(" "));
//! }
//!
//! let remotes = client.repo_config(Installation::User).expect("config unreadable");
//! for name in remotes.remotes.keys() {
//!     println!("user remote: {name}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod invocation;
pub mod keyfile;
pub mod permission_table;
pub mod repo_config;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use invocation::Invocation;
pub use repo_config::GPG_KEY_ATTRIBUTE;
pub use types::{Installation, InstalledApp, PermissionEntry, RemoteConfig, RepoConfig};

use backend::{Backend, flatpak::FlatpakBackend};

/// High-level client for reading Flatpak state.
///
/// The client wraps a backend and turns its raw output into typed values.
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a new Client with the default backend.
    ///
    /// Returns an error if flatpak is not installed.
    pub fn new() -> Result<Self> {
        let backend = FlatpakBackend::new()?;
        Ok(Self {
            backend: Box::new(backend),
        })
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// List installed applications of the user and system installations.
    pub fn installed_apps(&self) -> Result<Vec<InstalledApp>> {
        Ok(parse_app_list(&self.backend.list_apps()?))
    }

    /// Static overrides of an application in one scope, as flags.
    pub fn overrides(&self, app: &str, scope: Installation) -> Result<Vec<String>> {
        Ok(keyfile::parse_override_flags(
            &self.backend.show_overrides(app, scope)?,
        ))
    }

    /// Permissions an application's metadata requests, as flags.
    pub fn metadata_permissions(
        &self,
        app: &str,
        installation: Installation,
    ) -> Result<Vec<String>> {
        Ok(keyfile::parse_override_flags(
            &self.backend.metadata(app, installation)?,
        ))
    }

    /// Dynamic permission-store entries of an application.
    pub fn permissions(&self, app: &str) -> Result<Vec<PermissionEntry>> {
        permission_table::parse(&self.backend.permission_table(app)?)
    }

    /// Repo config of an installation, with remote GPG keyrings attached.
    pub fn repo_config(&self, installation: Installation) -> Result<RepoConfig> {
        let dir = self.backend.installation_dir(installation)?;
        repo_config::read(&dir.join("repo"))
    }
}

/// Parse `flatpak list --columns=application,branch,origin,installation`.
///
/// Rows of named extra installations are skipped.
fn parse_app_list(output: &str) -> Vec<InstalledApp> {
    output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [application, branch, origin, installation] = fields.as_slice() else {
                if !line.trim().is_empty() {
                    log::debug!("Skipping unexpected list row: {line}");
                }
                return None;
            };
            let Some(installation) = Installation::parse(installation) else {
                log::debug!("Skipping {application} from installation '{installation}'");
                return None;
            };
            Some(InstalledApp {
                application: (*application).to_string(),
                branch: (*branch).to_string(),
                origin: (*origin).to_string(),
                installation,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct MockBackend {
        root: PathBuf,
    }

    impl Backend for MockBackend {
        fn list_apps(&self) -> Result<String> {
            Ok("org.gnome.Maps\tstable\tflathub\tsystem\n\
                org.mozilla.firefox\tstable\tflathub\tuser\n"
                .to_string())
        }

        fn show_overrides(&self, app: &str, scope: Installation) -> Result<String> {
            match (app, scope) {
                ("org.gnome.Maps", Installation::System) => {
                    Ok("[Context]\nshared=!network;\n".to_string())
                }
                _ => Ok(String::new()),
            }
        }

        fn metadata(&self, _app: &str, _installation: Installation) -> Result<String> {
            let metadata = "[Application]\nname=x\n\n[Context]\nsockets=wayland;\n";
            Ok(metadata.to_string())
        }

        fn permission_table(&self, app: &str) -> Result<String> {
            let stderr = "error: app not installed";
            Err(Error::from_flatpak_output(stderr, Some(app)))
        }

        fn installation_dir(&self, installation: Installation) -> Result<PathBuf> {
            Ok(self.root.join(installation.as_str()))
        }
    }

    fn client(root: &TempDir) -> Client {
        Client::with_backend(Box::new(MockBackend {
            root: root.path().to_path_buf(),
        }))
    }

    #[test]
    fn test_installed_apps() {
        let dir = TempDir::new().unwrap();
        let apps = client(&dir).installed_apps().unwrap();
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[1].application, "org.mozilla.firefox");
        assert_eq!(apps[1].installation, Installation::User);
    }

    #[test]
    fn test_overrides_and_metadata_are_flags() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir);
        let maps = "org.gnome.Maps";
        let overrides = client.overrides(maps, Installation::System).unwrap();
        assert_eq!(overrides, vec!["--unshare=network"]);
        let user = client.overrides(maps, Installation::User).unwrap();
        assert!(user.is_empty());
        let metadata = client.metadata_permissions(maps, Installation::System);
        assert_eq!(metadata.unwrap(), vec!["--socket=wayland"]);
    }

    #[test]
    fn test_permission_error_is_categorized() {
        let dir = TempDir::new().unwrap();
        let err = client(&dir).permissions("org.gnome.Maps").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::NotInstalled);
    }

    #[test]
    fn test_repo_config_reads_installation_dir() {
        let dir = TempDir::new().unwrap();
        let repo = dir.path().join("user").join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        std::fs::write(
            repo.join("config"),
            "[remote \"flathub\"]\nurl=https://dl.flathub.org/repo/\n",
        )
        .unwrap();

        let client = client(&dir);
        let user = client.repo_config(Installation::User).unwrap();
        assert_eq!(
            user.remotes["flathub"]["url"],
            "https://dl.flathub.org/repo/"
        );
        assert!(client.repo_config(Installation::System).unwrap().is_empty());
    }

    #[test]
    fn test_parse_app_list_skips_odd_rows() {
        let apps = parse_app_list(
            "org.a.A\tstable\tflathub\tsystem\n\norg.b.B\tstable\tflathub\tsdcard\nbroken row\n",
        );
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].application, "org.a.A");
    }
}
