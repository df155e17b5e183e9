//! Command implementations
//!
//! - `plan` / `apply` live in [`apply`]
//! - `export-state` lives in [`export`]
//! - `validate` lives in [`validate`]

pub mod apply;
pub mod export;
pub mod validate;

use anyhow::Result;
use reconcile::{ActionPlan, ReconciliationPlan, State, compose, diff, normalize_current};

use crate::cli::{ManifestArgs, StateMode};
use crate::probe::FlatpakProbe;
use crate::{manifest, paths};

/// Load the compose file named by the arguments
pub fn load_manifest(args: &ManifestArgs) -> Result<State> {
    let path = paths::manifest_path(args.file.as_deref())?;
    manifest::load(&path)
}

/// The current state for a mode
pub fn current_state(mode: StateMode, desired: &State, system: State) -> State {
    match mode {
        StateMode::System => system,
        StateMode::SystemCompose => compose(desired, &system),
    }
}

/// The diff of two states and the actions that close it
pub struct Reconciliation {
    pub plan: ReconciliationPlan,
    pub actions: ActionPlan,
}

impl Reconciliation {
    /// Compare a desired state with a current one
    pub fn compute(current: &State, desired: &State, target: Option<&str>) -> Self {
        let current = normalize_current(current, desired);
        let plan = diff(&current, desired);
        let actions = ActionPlan::from_plan(&plan).filter_by_target(target);
        log::debug!(
            "{} change(s), {} action(s), {} diagnostic(s)",
            plan.change_count(),
            actions.len(),
            plan.diagnostics.len()
        );
        Self { plan, actions }
    }

    /// Probe the host and compare it with the compose file
    pub fn from_host(
        manifest: &ManifestArgs,
        mode: StateMode,
        target: Option<&str>,
    ) -> Result<Self> {
        let desired = load_manifest(manifest)?;
        let system = FlatpakProbe::new()?.snapshot()?;
        let current = current_state(mode, &desired, system);
        Ok(Self::compute(&current, &desired, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Renderer;
    use reconcile::{Application, Environment, InstallationType, Permission, Phase};

    fn flathub(t: InstallationType) -> Environment {
        Environment::new(t).with_remote("flathub", [("url", "https://dl.flathub.org/repo/")])
    }

    fn maps() -> Application {
        Application::new("org.gnome.Maps", "flathub", InstallationType::System)
    }

    fn system() -> State {
        let mut live = flathub(InstallationType::System)
            .with_core("repo_version", "1")
            .with_core("mode", "bare-user-only");
        if let Some(remote) = live.remotes.get_mut("flathub") {
            remote.insert("GPGKey".to_string(), "mQINBF...".to_string());
        }
        State {
            environments: vec![Environment::new(InstallationType::User), live],
            applications: vec![
                maps().with_overrides(["--share=network", "--persist=.maps"]),
                Application::new("org.gnome.Weather", "flathub", InstallationType::System),
            ],
        }
    }

    #[test]
    fn test_system_compose_leaves_unmentioned_things_alone() {
        let desired = State {
            environments: vec![flathub(InstallationType::System)],
            applications: vec![
                maps().with_overrides(["--share=network", "--socket=wayland"]),
            ],
        };
        let current = current_state(StateMode::SystemCompose, &desired, system());
        let r = Reconciliation::compute(&current, &desired, None);

        assert_eq!(r.actions.len(), 1);
        assert_eq!(r.actions.phase(Phase::OverrideGrant).len(), 1);
        assert!(r.actions.phase(Phase::ApplicationRemove).is_empty());
    }

    #[test]
    fn test_system_mode_removes_undeclared_applications() {
        let desired = State {
            environments: vec![flathub(InstallationType::System)],
            applications: vec![maps().with_overrides(["--share=network"])],
        };
        let current = current_state(StateMode::System, &desired, system());
        let r = Reconciliation::compute(&current, &desired, None);

        let removed = r.actions.phase(Phase::ApplicationRemove);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].target(), "org.gnome.Weather (flathub, system)");
        assert!(r.actions.phase(Phase::EnvironmentUpdate).is_empty());
    }

    #[test]
    fn test_system_mode_leaves_repository_internals_alone() {
        let desired = State {
            environments: vec![flathub(InstallationType::System)],
            applications: vec![maps().with_overrides(["--share=network"])],
        };
        let current = current_state(StateMode::System, &desired, system());
        let r = Reconciliation::compute(&current, &desired, None);

        assert!(r.actions.phase(Phase::EnvironmentRemove).is_empty());
        assert!(r.actions.phase(Phase::OverrideRevoke).is_empty());
        assert_eq!(r.actions.len(), 1);
    }

    #[test]
    fn test_every_planned_action_renders_a_command() {
        let renderer = Renderer::new("/tmp/user/repo", "/tmp/system/repo");
        let desired = State {
            environments: vec![
                flathub(InstallationType::System)
                    .with_core("xa.languages", "en")
                    .with_core("min-free-space-size", "1GB"),
                flathub(InstallationType::User),
            ],
            applications: vec![
                maps()
                    .with_overrides(["--unshare=network", "--filesystem=home"])
                    .with_permission(Permission::new("devices", "camera", "yes", "")),
                Application::new("org.gnome.Clocks", "flathub", InstallationType::User)
                    .with_user_overrides(["--socket=wayland"]),
            ],
        };

        for (mode, manifest) in [
            (StateMode::System, desired.clone()),
            (StateMode::SystemCompose, desired.clone()),
            (StateMode::System, State::new()),
        ] {
            let current = current_state(mode, &manifest, system());
            let r = Reconciliation::compute(&current, &manifest, None);
            assert!(!r.actions.is_empty());
            for action in &r.actions {
                let rendered = renderer.render(action);
                assert!(
                    !rendered.commands.is_empty(),
                    "{action} renders nothing: {:?}",
                    rendered.warnings
                );
            }
        }
    }

    #[test]
    fn test_target_filter() {
        let desired = State {
            environments: vec![flathub(InstallationType::System)],
            applications: vec![maps()],
        };
        let current = current_state(StateMode::System, &desired, system());
        let r = Reconciliation::compute(&current, &desired, Some("app"));
        assert!(r.actions.iter().all(|a| a.application().is_some()));
        assert!(!r.actions.is_empty());
    }
}
