//! Snapshot provider seam
//!
//! The live state is only reachable through the host's command surface. The
//! engine never talks to it directly; instead it asks a [`SnapshotProvider`]
//! one probe at a time and assembles the answers into a [`State`].

use crate::types::{Application, Environment, InstallationType, OverrideScope, Permission, State};
use anyhow::{Context, Result};
use rayon::prelude::*;

/// Source of live-system facts, one method per probe
///
/// Implementations must be `Sync`: per-application probes run in parallel.
pub trait SnapshotProvider: Sync {
    /// Installed applications with identity fields and branch filled in
    fn installed_applications(&self) -> Result<Vec<Application>>;

    /// Core settings and remotes of one installation
    fn environment(&self, installation: InstallationType) -> Result<Environment>;

    /// Static override flags of an application in one scope
    fn overrides(&self, app: &Application, scope: OverrideScope) -> Result<Vec<String>>;

    /// Full permission set declared by the application's own metadata
    fn metadata_permissions(&self, app: &Application) -> Result<Vec<String>>;

    /// Dynamic permission-store grants of an application
    fn dynamic_permissions(&self, app: &Application) -> Result<Vec<Permission>>;
}

/// Assemble a full snapshot from a provider
///
/// Application probes run in parallel; the result keeps the order reported by
/// [`SnapshotProvider::installed_applications`].
pub fn probe_state<P: SnapshotProvider + ?Sized>(provider: &P) -> Result<State> {
    let installed = provider
        .installed_applications()
        .context("Failed to list installed applications")?;
    log::debug!("Probing {} installed application(s)", installed.len());

    let environments = InstallationType::ALL
        .iter()
        .map(|t| {
            provider
                .environment(*t)
                .with_context(|| format!("Failed to read the {t} installation"))
        })
        .collect::<Result<Vec<_>>>()?;

    let applications = installed
        .into_par_iter()
        .map(|app| probe_application(provider, app))
        .collect::<Result<Vec<_>>>()?;

    Ok(State {
        environments,
        applications,
    })
}

fn probe_application<P: SnapshotProvider + ?Sized>(
    provider: &P,
    mut app: Application,
) -> Result<Application> {
    for scope in OverrideScope::ALL {
        *app.overrides_for_mut(scope) = provider
            .overrides(&app, scope)
            .with_context(|| {
                format!("Failed to read {scope} overrides of {}", app.name)
            })?;
    }
    app.all = provider
        .metadata_permissions(&app)
        .with_context(|| format!("Failed to read metadata of {}", app.name))?;
    app.permissions = provider
        .dynamic_permissions(&app)
        .with_context(|| format!("Failed to read permissions of {}", app.name))?;
    log::trace!("Probed {}", app.key());
    Ok(app)
}
