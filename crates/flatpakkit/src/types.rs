//! Core types for Flatpak installation state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A Flatpak installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Installation {
    /// Per-user installation (`~/.local/share/flatpak`)
    User,
    /// System-wide installation (`/var/lib/flatpak`)
    System,
}

impl Installation {
    /// Both installations, in the order flatpak lists them.
    pub const ALL: [Self; 2] = [Self::User, Self::System];

    /// Name as printed by `flatpak list --columns=installation`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::System => "system",
        }
    }

    /// Command-line flag selecting this installation.
    pub fn flag(&self) -> &'static str {
        match self {
            Self::User => "--user",
            Self::System => "--system",
        }
    }

    /// Parse an installation name; named extra installations are not supported.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "user" => Some(Self::User),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    /// Default base directory of this installation.
    ///
    /// Honors `FLATPAK_USER_DIR` and `FLATPAK_SYSTEM_DIR` like flatpak itself.
    pub fn default_dir(&self) -> Option<PathBuf> {
        match self {
            Self::User => std::env::var_os("FLATPAK_USER_DIR")
                .map(PathBuf::from)
                .or_else(|| dirs::data_dir().map(|d| d.join("flatpak"))),
            Self::System => Some(
                std::env::var_os("FLATPAK_SYSTEM_DIR")
                    .map_or_else(|| PathBuf::from("/var/lib/flatpak"), PathBuf::from),
            ),
        }
    }
}

impl fmt::Display for Installation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An installed application as reported by `flatpak list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledApp {
    /// Application id (e.g., "org.gnome.Maps")
    pub application: String,
    /// Branch (e.g., "stable")
    pub branch: String,
    /// Remote the application was installed from
    pub origin: String,
    /// Installation it lives in
    pub installation: Installation,
}

/// One row of `flatpak permission-show`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    /// Permission-store table (e.g., "documents", "devices")
    pub table: String,
    /// Object id within the table
    pub object: String,
    /// Application id the row belongs to
    pub app: String,
    /// Comma-separated permission values
    pub permissions: String,
    /// Extra data, often empty
    pub data: String,
}

/// Settings of one remote in an ostree repo config.
pub type RemoteConfig = BTreeMap<String, String>;

/// Parsed ostree repo `config` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// `[core]` section
    pub core: BTreeMap<String, String>,
    /// `[remote "NAME"]` sections keyed by remote name
    pub remotes: BTreeMap<String, RemoteConfig>,
}

impl RepoConfig {
    /// Check if neither core keys nor remotes are present.
    pub fn is_empty(&self) -> bool {
        self.core.is_empty() && self.remotes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installation_parse() {
        assert_eq!(Installation::parse("user"), Some(Installation::User));
        assert_eq!(Installation::parse("system\n"), Some(Installation::System));
        assert_eq!(Installation::parse("extra-sdcard"), None);
    }

    #[test]
    fn test_installation_flag() {
        assert_eq!(Installation::User.flag(), "--user");
        assert_eq!(Installation::System.flag(), "--system");
    }
}
