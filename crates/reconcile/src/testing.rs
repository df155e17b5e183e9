//! Test fixtures and an in-memory model of applying actions

use crate::compose::MANAGED_CORE_PREFIX;
use crate::flags;
use crate::planner::{Action, ActionPlan};
use crate::types::{Application, Environment, InstallationType, State};

pub fn flathub() -> &'static str {
    "https://dl.flathub.org/repo/"
}

/// System environment with the flathub remote
pub fn system_env() -> Environment {
    Environment::new(InstallationType::System).with_remote("flathub", [("url", flathub())])
}

/// User environment with the flathub remote
pub fn user_env() -> Environment {
    Environment::new(InstallationType::User).with_remote("flathub", [("url", flathub())])
}

/// System-wide flathub application
pub fn app(name: &str) -> Application {
    Application::new(name, "flathub", InstallationType::System)
}

/// Apply actions to a state the way the host would
///
/// Only what the host commands can express takes effect: revoked override
/// flags leave their negation behind, as `flatpak override` does, a flag with
/// no negation stays, and core keys outside the flatpak namespace are never unset.
pub fn simulate(current: &State, actions: &ActionPlan) -> State {
    let mut state = current.clone();

    for action in actions {
        match action {
            Action::AddEnvironment { environment } | Action::UpdateEnvironment { environment } => {
                let target = environment_entry(&mut state, environment.installation_type);
                for (k, v) in &environment.core {
                    target.core.insert(k.clone(), v.clone());
                }
                for (name, attributes) in &environment.remotes {
                    let remote = target.remotes.entry(name.clone()).or_default();
                    for (k, v) in attributes {
                        remote.insert(k.clone(), v.clone());
                    }
                }
            }
            Action::RemoveEnvironment { environment } => {
                let target = environment_entry(&mut state, environment.installation_type);
                for k in environment.core.keys() {
                    if k.starts_with(MANAGED_CORE_PREFIX) {
                        target.core.remove(k);
                    }
                }
                for (name, attributes) in &environment.remotes {
                    if attributes.contains_key("url") {
                        target.remotes.remove(name);
                    } else if let Some(remote) = target.remotes.get_mut(name) {
                        for k in attributes.keys() {
                            remote.remove(k);
                        }
                    }
                }
            }
            Action::InstallApplication { application } => {
                state.applications.push(application.clone());
            }
            Action::UninstallApplication { application } => {
                let key = application.key();
                state.applications.retain(|a| a.key() != key);
            }
            Action::GrantOverrides {
                application,
                scope,
                flags: granted,
            } => {
                let target = application_entry(&mut state, application).overrides_for_mut(*scope);
                for flag in granted {
                    if let Some(neg) = flags::negate(flag) {
                        target.retain(|f| *f != neg);
                    }
                    if !target.contains(flag) {
                        target.push(flag.clone());
                    }
                }
            }
            Action::RevokeOverrides {
                application,
                scope,
                flags: revoked,
            } => {
                let target = application_entry(&mut state, application).overrides_for_mut(*scope);
                for flag in revoked {
                    let Some(neg) = flags::negate(flag) else {
                        continue;
                    };
                    target.retain(|f| f != flag);
                    if !target.contains(&neg) {
                        target.push(neg);
                    }
                }
            }
            Action::GrantPermission {
                application,
                permission,
            } => {
                let target = application_entry(&mut state, application);
                if !target.permissions.contains(permission) {
                    target.permissions.push(permission.clone());
                }
            }
            Action::RevokePermission {
                application,
                permission,
            } => {
                application_entry(&mut state, application)
                    .permissions
                    .retain(|p| p != permission);
            }
        }
    }

    state
}

fn environment_entry(state: &mut State, installation_type: InstallationType) -> &mut Environment {
    if state.environment(installation_type).is_none() {
        state.environments.push(Environment::new(installation_type));
    }
    state
        .environment_mut(installation_type)
        .expect("environment was just inserted")
}

fn application_entry<'a>(state: &'a mut State, application: &Application) -> &'a mut Application {
    let key = application.key();
    state
        .applications
        .iter_mut()
        .find(|a| a.key() == key)
        .expect("permission action targets an installed application")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::normalize_current;
    use crate::diff::diff;
    use crate::types::Permission;

    /// Plan, apply in memory, then re-diff through the same normalization
    fn assert_converges(current: &State, desired: &State) {
        let first = diff(&normalize_current(current, desired), desired);
        let actions = ActionPlan::from_plan(&first);
        let after = simulate(current, &actions);
        let second = diff(&normalize_current(&after, desired), desired);
        assert!(
            second.is_empty(),
            "plan did not converge\nactions: {:#?}\nremaining: {second:#?}",
            actions.iter().collect::<Vec<_>>()
        );
    }

    fn busy_system() -> State {
        State {
            environments: vec![
                system_env()
                    .with_core("xa.languages", "en")
                    .with_remote(
                        "fedora",
                        [("url", "oci+https://registry.fedoraproject.org")],
                    ),
                user_env().with_core("xa.min-free-space-percent", "3"),
            ],
            applications: vec![
                app("org.app.Foo")
                    .with_overrides(["--share=network", "--socket=x11", "--env=A=1"])
                    .with_user_overrides(["--filesystem=home"])
                    .with_permission(Permission::new("documents", "doc1", "read", "")),
                app("org.app.Old"),
                Application::new("org.app.Moved", "flathub", InstallationType::System),
            ],
        }
    }

    #[test]
    fn test_converges_from_empty_system() {
        let desired = busy_system();
        let current = State {
            environments: vec![
                Environment::new(InstallationType::System),
                Environment::new(InstallationType::User),
            ],
            applications: Vec::new(),
        };
        assert_converges(&current, &desired);
    }

    #[test]
    fn test_converges_to_empty_manifest() {
        assert_converges(&busy_system(), &State::new());
    }

    #[test]
    fn test_converges_with_mixed_changes() {
        let desired = State {
            environments: vec![
                system_env()
                    .with_core("xa.languages", "de")
                    .with_remote("flathub", [("url", flathub()), ("xa.title", "Flathub")]),
                user_env(),
            ],
            applications: vec![
                app("org.app.Foo")
                    .with_overrides(["--unshare=network", "--socket=wayland", "--env=A=2"])
                    .with_permission(Permission::new("documents", "doc1", "read,write", ""))
                    .with_permission(Permission::new("devices", "camera", "yes", "")),
                Application::new("org.app.Moved", "flathub", InstallationType::User)
                    .with_user_overrides(["--talk-name=org.freedesktop.Notifications"]),
                app("org.app.New").with_overrides(["--device=dri"]),
                Application::new("org.app.Orphan", "nightly", InstallationType::System),
            ],
        };
        assert_converges(&busy_system(), &desired);
    }

    #[test]
    fn test_converges_after_revoke_residue() {
        // A second pass over a host that already carries negations from an earlier revoke
        let current = State {
            environments: vec![system_env()],
            applications: vec![app("org.app.Foo").with_overrides(["--unshare=network"])],
        };
        let desired = State {
            environments: vec![system_env()],
            applications: vec![app("org.app.Foo")],
        };
        let plan = diff(&normalize_current(&current, &desired), &desired);
        assert!(plan.is_empty());
        assert_converges(&current, &desired);
    }

    #[test]
    fn test_converges_over_repository_internals() {
        let mut current = busy_system();
        for env in &mut current.environments {
            env.core.insert("repo_version".to_string(), "1".to_string());
            env.core
                .insert("mode".to_string(), "bare-user-only".to_string());
        }
        assert_converges(&current, &State::new());

        let desired = State {
            environments: vec![system_env().with_core("min-free-space-size", "1GB")],
            applications: Vec::new(),
        };
        assert_converges(&current, &desired);
    }

    #[test]
    fn test_converges_with_unrevocable_flags() {
        let current = State {
            environments: vec![system_env()],
            applications: vec![
                app("org.app.Foo").with_overrides(["--persist=.foo", "--filesystem=home:ro"]),
            ],
        };
        let desired = State {
            environments: vec![system_env()],
            applications: vec![app("org.app.Foo").with_overrides(["--filesystem=home"])],
        };
        assert_converges(&current, &desired);
        assert_converges(&current, &State::new());
    }

    #[test]
    fn test_bus_policy_swap_converges() {
        let current = State {
            environments: vec![system_env()],
            applications: vec![app("org.app.Foo").with_overrides(["--talk-name=org.x"])],
        };
        let desired = State {
            environments: vec![system_env()],
            applications: vec![app("org.app.Foo").with_overrides(["--own-name=org.x"])],
        };
        assert_converges(&current, &desired);
    }
}
