//! Live-system snapshot over the `flatpak` command surface

use anyhow::{Context, Result};
use flatpakkit::{Client, Installation, PermissionEntry, RepoConfig};
use reconcile::{
    Application, Environment, InstallationType, OverrideScope, Permission, SnapshotProvider, State,
};

use crate::progress;

/// Snapshot provider backed by a [`flatpakkit::Client`]
pub struct FlatpakProbe {
    client: Client,
}

impl FlatpakProbe {
    /// Probe the host through the real `flatpak` executable
    pub fn new() -> Result<Self> {
        let client = Client::new().context("Cannot probe the live system")?;
        Ok(Self { client })
    }

    #[cfg(test)]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Full live state, with a spinner while the probes run
    pub fn snapshot(&self) -> Result<State> {
        let pb = progress::spinner("Reading Flatpak installations...");
        match reconcile::probe_state(self) {
            Ok(state) => {
                progress::finish_clear(&pb);
                log::info!(
                    "Found {} application(s) across {} installation(s)",
                    state.applications.len(),
                    state.environments.len()
                );
                Ok(state)
            }
            Err(e) => {
                progress::finish_error(&pb, "Failed to read Flatpak state");
                Err(e)
            }
        }
    }
}

const fn installation(t: InstallationType) -> Installation {
    match t {
        InstallationType::User => Installation::User,
        InstallationType::System => Installation::System,
    }
}

const fn installation_type(installation: Installation) -> InstallationType {
    match installation {
        Installation::User => InstallationType::User,
        Installation::System => InstallationType::System,
    }
}

const fn scope_installation(scope: OverrideScope) -> Installation {
    match scope {
        OverrideScope::System => Installation::System,
        OverrideScope::User => Installation::User,
    }
}

fn environment_from(t: InstallationType, config: RepoConfig) -> Environment {
    Environment {
        installation_type: t,
        core: config.core,
        remotes: config.remotes,
    }
}

fn permission_from(entry: PermissionEntry) -> Permission {
    Permission::new(entry.table, entry.object, entry.permissions, entry.data)
}

impl SnapshotProvider for FlatpakProbe {
    fn installed_applications(&self) -> Result<Vec<Application>> {
        let apps = self.client.installed_apps()?;
        Ok(apps
            .into_iter()
            .map(|app| {
                let installation = installation_type(app.installation);
                Application::new(app.application, app.origin, installation).with_branch(app.branch)
            })
            .collect())
    }

    fn environment(&self, t: InstallationType) -> Result<Environment> {
        let config = self
            .client
            .repo_config(installation(t))
            .with_context(|| format!("Failed to read the {t} repo config"))?;
        Ok(environment_from(t, config))
    }

    fn overrides(&self, app: &Application, scope: OverrideScope) -> Result<Vec<String>> {
        Ok(self.client.overrides(&app.name, scope_installation(scope))?)
    }

    fn metadata_permissions(&self, app: &Application) -> Result<Vec<String>> {
        Ok(self
            .client
            .metadata_permissions(&app.name, installation(app.installation_type))?)
    }

    fn dynamic_permissions(&self, app: &Application) -> Result<Vec<Permission>> {
        let entries = self.client.permissions(&app.name)?;
        Ok(entries
            .into_iter()
            .filter(|e| e.app == app.name)
            .map(permission_from)
            .collect())
    }
}
