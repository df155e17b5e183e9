//! Core state model shared by the diff engine and the action synthesizer

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Branch assumed when an application does not declare one
pub const DEFAULT_BRANCH: &str = "stable";

/// Scoped key/value settings of an installation (`[core]` section)
pub type CoreSettings = BTreeMap<String, String>;

/// Attributes of a single remote (url, title, gpg settings, ...)
pub type RemoteAttributes = BTreeMap<String, String>;

/// Remotes of an installation keyed by remote name
pub type Remotes = BTreeMap<String, RemoteAttributes>;

/// Which Flatpak installation a repository or application lives in
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum InstallationType {
    /// Per-user installation
    User,
    /// System-wide installation
    #[default]
    System,
}

impl InstallationType {
    /// Both installation types, in probe order
    pub const ALL: [Self; 2] = [Self::User, Self::System];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::System => "system",
        }
    }
}

impl fmt::Display for InstallationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstallationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "user" => Ok(Self::User),
            "system" => Ok(Self::System),
            other => Err(format!(
                "invalid installation type '{other}' (expected user or system)"
            )),
        }
    }
}

/// Scope a static override applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideScope {
    /// `overrides` - system-wide override store
    System,
    /// `overrides_user` - per-user override store
    User,
}

impl OverrideScope {
    pub const ALL: [Self; 2] = [Self::System, Self::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
        }
    }
}

impl fmt::Display for OverrideScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repositories of one installation type
///
/// At most one environment per installation type is allowed in a [`State`];
/// [`State::validate`] rejects duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Environment {
    #[serde(rename = "type", default)]
    pub installation_type: InstallationType,
    #[serde(default)]
    pub core: CoreSettings,
    #[serde(default)]
    pub remotes: Remotes,
}

impl Environment {
    /// Create an empty environment for an installation type
    pub fn new(installation_type: InstallationType) -> Self {
        Self {
            installation_type,
            core: CoreSettings::new(),
            remotes: Remotes::new(),
        }
    }

    /// Add a core setting (builder style)
    pub fn with_core(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.core.insert(key.into(), value.into());
        self
    }

    /// Add a remote with its attributes (builder style)
    pub fn with_remote<K, V>(
        mut self,
        name: impl Into<String>,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let attributes = attributes
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.remotes.insert(name.into(), attributes);
        self
    }

    /// Whether a remote with this name exists in this installation type
    pub fn remote_exists(&self, installation_type: InstallationType, remote: &str) -> bool {
        self.installation_type == installation_type && self.remotes.contains_key(remote)
    }

    /// True when neither core settings nor remotes are present
    pub fn is_empty(&self) -> bool {
        self.core.is_empty() && self.remotes.is_empty()
    }
}

/// A fine-grained permission-store grant (documents, portals, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Permission {
    pub table: String,
    pub object: String,
    pub permission: String,
    #[serde(default)]
    pub data: String,
}

impl Permission {
    pub fn new(
        table: impl Into<String>,
        object: impl Into<String>,
        permission: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            object: object.into(),
            permission: permission.into(),
            data: data.into(),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} {}", self.table, self.object, self.permission)?;
        if !self.data.is_empty() {
            write!(f, " ({})", self.data)?;
        }
        Ok(())
    }
}

/// Identity of an application: `(repo, installationType, name)`
///
/// Branch and permissions are deliberately not part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppKey {
    pub repo: String,
    pub installation_type: InstallationType,
    pub name: String,
}

impl fmt::Display for AppKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {})",
            self.name, self.repo, self.installation_type
        )
    }
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

/// An installed (or declared) application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(rename = "type", default)]
    pub installation_type: InstallationType,
    /// Full permission set declared by the application metadata (informational)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all: Vec<String>,
    /// System-scope override flags
    #[serde(default)]
    pub overrides: Vec<String>,
    /// User-scope override flags
    #[serde(rename = "overrides_user", default)]
    pub overrides_user: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Permission>,
}

impl Application {
    pub fn new(
        name: impl Into<String>,
        repo: impl Into<String>,
        installation_type: InstallationType,
    ) -> Self {
        Self {
            name: name.into(),
            repo: repo.into(),
            branch: default_branch(),
            installation_type,
            all: Vec::new(),
            overrides: Vec::new(),
            overrides_user: Vec::new(),
            permissions: Vec::new(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_overrides<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.overrides = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_user_overrides<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.overrides_user = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }

    /// Identity key of this application
    pub fn key(&self) -> AppKey {
        AppKey {
            repo: self.repo.clone(),
            installation_type: self.installation_type,
            name: self.name.clone(),
        }
    }

    /// Copy carrying only the identity fields and branch
    pub fn identity(&self) -> Self {
        Self {
            name: self.name.clone(),
            repo: self.repo.clone(),
            branch: self.branch.clone(),
            installation_type: self.installation_type,
            all: Vec::new(),
            overrides: Vec::new(),
            overrides_user: Vec::new(),
            permissions: Vec::new(),
        }
    }

    /// Override flags of one scope
    pub fn overrides_for(&self, scope: OverrideScope) -> &[String] {
        match scope {
            OverrideScope::System => &self.overrides,
            OverrideScope::User => &self.overrides_user,
        }
    }

    pub fn overrides_for_mut(&mut self, scope: OverrideScope) -> &mut Vec<String> {
        match scope {
            OverrideScope::System => &mut self.overrides,
            OverrideScope::User => &mut self.overrides_user,
        }
    }

    /// Whether any override in either scope is declared
    pub fn has_overrides(&self) -> bool {
        !self.overrides.is_empty() || !self.overrides_user.is_empty()
    }
}

/// Aggregate snapshot: environments plus applications
///
/// Equality of members is defined by identity keys, never by list position.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct State {
    #[serde(rename = "envs", default)]
    pub environments: Vec<Environment>,
    #[serde(default)]
    pub applications: Vec<Application>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment for an installation type, if declared
    pub fn environment(&self, installation_type: InstallationType) -> Option<&Environment> {
        self.environments
            .iter()
            .find(|e| e.installation_type == installation_type)
    }

    pub fn environment_mut(
        &mut self,
        installation_type: InstallationType,
    ) -> Option<&mut Environment> {
        self.environments
            .iter_mut()
            .find(|e| e.installation_type == installation_type)
    }

    /// Find an application by identity key
    pub fn application(&self, key: &AppKey) -> Option<&Application> {
        self.applications.iter().find(|a| &a.key() == key)
    }

    /// Whether an application's `(repo, installationType)` resolves to a known remote
    pub fn resolves(&self, app: &Application) -> bool {
        resolves_in(&self.environments, app)
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty() && self.applications.is_empty()
    }
}

/// Whether `app`'s repository exists in any of `environments`
pub fn resolves_in(environments: &[Environment], app: &Application) -> bool {
    environments
        .iter()
        .any(|env| env.remote_exists(app.installation_type, &app.repo))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installation_type_parse() {
        assert_eq!(
            "user".parse::<InstallationType>(),
            Ok(InstallationType::User)
        );
        assert_eq!(
            " system ".parse::<InstallationType>(),
            Ok(InstallationType::System)
        );
        assert!("both".parse::<InstallationType>().is_err());
    }

    #[test]
    fn test_application_defaults_from_json() {
        let app: Application =
            serde_json::from_str(r#"{"name": "org.app.Foo", "repo": "flathub"}"#).unwrap();
        assert_eq!(app.branch, DEFAULT_BRANCH);
        assert_eq!(app.installation_type, InstallationType::System);
        assert!(app.overrides.is_empty());
    }

    #[test]
    fn test_key_ignores_branch_and_overrides() {
        let a = Application::new("org.app.Foo", "flathub", InstallationType::User)
            .with_branch("beta")
            .with_overrides(["--share=network"]);
        let b = Application::new("org.app.Foo", "flathub", InstallationType::User);
        assert_eq!(a.key(), b.key());

        let c = Application::new("org.app.Foo", "flathub", InstallationType::System);
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_remote_exists_checks_installation_type() {
        let env = Environment::new(InstallationType::System)
            .with_remote("flathub", [("url", "https://dl.flathub.org/repo/")]);
        let system = InstallationType::System;
        assert!(env.remote_exists(system, "flathub"));
        assert!(!env.remote_exists(InstallationType::User, "flathub"));
        assert!(!env.remote_exists(system, "gnome-nightly"));
    }

    #[test]
    fn test_state_resolves() {
        let state = State {
            environments: vec![
                Environment::new(InstallationType::User).with_remote("flathub", [("url", "x")]),
            ],
            applications: Vec::new(),
        };
        let ok = Application::new("org.app.Foo", "flathub", InstallationType::User);
        let wrong_type = Application::new("org.app.Foo", "flathub", InstallationType::System);
        assert!(state.resolves(&ok));
        assert!(!state.resolves(&wrong_type));
    }
}
