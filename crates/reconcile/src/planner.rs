//! Action synthesizer - turns a reconciliation plan into ordered actions

use crate::diff::ReconciliationPlan;
use crate::flags;
use crate::types::{AppKey, Application, Environment, OverrideScope, Permission};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Kind tag of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ActionKind {
    #[serde(rename = "env.add")]
    EnvAdd,
    #[serde(rename = "env.remove")]
    EnvRemove,
    #[serde(rename = "env.update")]
    EnvUpdate,
    #[serde(rename = "app.install")]
    AppInstall,
    #[serde(rename = "app.uninstall")]
    AppUninstall,
    #[serde(rename = "perm.override.grant")]
    OverrideGrant,
    #[serde(rename = "perm.override.revoke")]
    OverrideRevoke,
    #[serde(rename = "perm.dynamic.grant")]
    DynamicGrant,
    #[serde(rename = "perm.dynamic.revoke")]
    DynamicRevoke,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnvAdd => "env.add",
            Self::EnvRemove => "env.remove",
            Self::EnvUpdate => "env.update",
            Self::AppInstall => "app.install",
            Self::AppUninstall => "app.uninstall",
            Self::OverrideGrant => "perm.override.grant",
            Self::OverrideRevoke => "perm.override.revoke",
            Self::DynamicGrant => "perm.dynamic.grant",
            Self::DynamicRevoke => "perm.dynamic.revoke",
        }
    }

    /// Phase the action runs in
    pub fn phase(&self) -> Phase {
        match self {
            Self::EnvRemove => Phase::EnvironmentRemove,
            Self::EnvAdd => Phase::EnvironmentAdd,
            Self::EnvUpdate => Phase::EnvironmentUpdate,
            Self::AppUninstall => Phase::ApplicationRemove,
            Self::AppInstall => Phase::ApplicationAdd,
            Self::OverrideRevoke => Phase::OverrideRevoke,
            Self::OverrideGrant => Phase::OverrideGrant,
            Self::DynamicRevoke => Phase::DynamicRevoke,
            Self::DynamicGrant => Phase::DynamicGrant,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution phases in the order they run
///
/// Destructive phases precede constructive ones: environment removals run
/// first, uninstalls precede installs, and revokes precede grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    EnvironmentRemove,
    EnvironmentAdd,
    EnvironmentUpdate,
    ApplicationRemove,
    ApplicationAdd,
    OverrideRevoke,
    OverrideGrant,
    DynamicRevoke,
    DynamicGrant,
}

impl Phase {
    pub const ALL: [Self; 9] = [
        Self::EnvironmentRemove,
        Self::EnvironmentAdd,
        Self::EnvironmentUpdate,
        Self::ApplicationRemove,
        Self::ApplicationAdd,
        Self::OverrideRevoke,
        Self::OverrideGrant,
        Self::DynamicRevoke,
        Self::DynamicGrant,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::EnvironmentRemove => "Remove repository settings",
            Self::EnvironmentAdd => "Add repository settings",
            Self::EnvironmentUpdate => "Update repository settings",
            Self::ApplicationRemove => "Uninstall applications",
            Self::ApplicationAdd => "Install applications",
            Self::OverrideRevoke => "Revoke overrides",
            Self::OverrideGrant => "Grant overrides",
            Self::DynamicRevoke => "Revoke permissions",
            Self::DynamicGrant => "Grant permissions",
        }
    }
}

/// One atomic corrective operation
///
/// Actions describe intent, not command text. Rendering them into host
/// invocations is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Add the delta core keys and remotes of one installation
    AddEnvironment { environment: Environment },
    /// Remove the delta core keys and remotes of one installation
    RemoveEnvironment { environment: Environment },
    /// Set changed values of one installation
    UpdateEnvironment { environment: Environment },
    /// Install an application, then apply its declared overrides and permissions
    InstallApplication { application: Application },
    UninstallApplication { application: Application },
    GrantOverrides {
        application: Application,
        scope: OverrideScope,
        flags: Vec<String>,
    },
    RevokeOverrides {
        application: Application,
        scope: OverrideScope,
        flags: Vec<String>,
    },
    GrantPermission {
        application: Application,
        permission: Permission,
    },
    RevokePermission {
        application: Application,
        permission: Permission,
    },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::AddEnvironment { .. } => ActionKind::EnvAdd,
            Self::RemoveEnvironment { .. } => ActionKind::EnvRemove,
            Self::UpdateEnvironment { .. } => ActionKind::EnvUpdate,
            Self::InstallApplication { .. } => ActionKind::AppInstall,
            Self::UninstallApplication { .. } => ActionKind::AppUninstall,
            Self::GrantOverrides { .. } => ActionKind::OverrideGrant,
            Self::RevokeOverrides { .. } => ActionKind::OverrideRevoke,
            Self::GrantPermission { .. } => ActionKind::DynamicGrant,
            Self::RevokePermission { .. } => ActionKind::DynamicRevoke,
        }
    }

    pub fn phase(&self) -> Phase {
        self.kind().phase()
    }

    /// Environment the action targets, if any
    pub fn environment(&self) -> Option<&Environment> {
        match self {
            Self::AddEnvironment { environment }
            | Self::RemoveEnvironment { environment }
            | Self::UpdateEnvironment { environment } => Some(environment),
            _ => None,
        }
    }

    /// Application the action targets, if any
    pub fn application(&self) -> Option<&Application> {
        match self {
            Self::InstallApplication { application }
            | Self::UninstallApplication { application }
            | Self::GrantOverrides { application, .. }
            | Self::RevokeOverrides { application, .. }
            | Self::GrantPermission { application, .. }
            | Self::RevokePermission { application, .. } => Some(application),
            _ => None,
        }
    }

    /// Identity of the target: the installation type or the application key
    pub fn target(&self) -> String {
        match (self.environment(), self.application()) {
            (Some(env), _) => env.installation_type.to_string(),
            (_, Some(app)) => app.key().to_string(),
            (None, None) => String::new(),
        }
    }

    /// Short human-readable description
    pub fn description(&self) -> String {
        match self {
            Self::AddEnvironment { environment }
            | Self::RemoveEnvironment { environment }
            | Self::UpdateEnvironment { environment } => {
                let mut parts: Vec<String> = environment
                    .core
                    .keys()
                    .map(|k| format!("core.{k}"))
                    .collect();
                parts.extend(environment.remotes.keys().map(|r| format!("remote {r}")));
                format!(
                    "{} installation: {}",
                    environment.installation_type,
                    parts.join(", ")
                )
            }
            Self::InstallApplication { application }
            | Self::UninstallApplication { application } => {
                format!("{}//{}", application.key(), application.branch)
            }
            Self::GrantOverrides {
                application,
                scope,
                flags,
            }
            | Self::RevokeOverrides {
                application,
                scope,
                flags,
            } => format!("{} [{scope}] {}", application.name, flags.join(" ")),
            Self::GrantPermission {
                application,
                permission,
            }
            | Self::RevokePermission {
                application,
                permission,
            } => format!("{} {permission}", application.name),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.description())
    }
}

/// Ordered action list, accumulated per phase
///
/// Actions can only be added through [`ActionPlan::push`], which files them
/// under their phase, so iteration order always follows [`Phase::ALL`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionPlan {
    phases: BTreeMap<Phase, Vec<Action>>,
}

impl ActionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the ordered action list for a reconciliation plan
    pub fn from_plan(plan: &ReconciliationPlan) -> Self {
        let mut actions = Self::new();

        for environment in &plan.environments_to_remove {
            actions.push(Action::RemoveEnvironment {
                environment: environment.clone(),
            });
        }
        for environment in &plan.environments_to_add {
            actions.push(Action::AddEnvironment {
                environment: environment.clone(),
            });
        }
        for environment in &plan.environments_to_update {
            actions.push(Action::UpdateEnvironment {
                environment: environment.clone(),
            });
        }

        for application in &plan.applications_to_remove {
            actions.push(Action::UninstallApplication {
                application: application.clone(),
            });
        }
        for application in &plan.applications_to_add {
            actions.push(Action::InstallApplication {
                application: application.clone(),
            });
        }

        let granted = granted_flags(&plan.static_permissions_to_grant);
        for record in &plan.static_permissions_to_revoke {
            for scope in OverrideScope::ALL {
                let flags = superseded_removed(record, scope, &granted);
                if !flags.is_empty() {
                    actions.push(Action::RevokeOverrides {
                        application: record.identity(),
                        scope,
                        flags,
                    });
                }
            }
        }
        for record in &plan.static_permissions_to_grant {
            for scope in OverrideScope::ALL {
                let flags = record.overrides_for(scope);
                if !flags.is_empty() {
                    actions.push(Action::GrantOverrides {
                        application: record.identity(),
                        scope,
                        flags: flags.to_vec(),
                    });
                }
            }
        }

        for record in &plan.dynamic_permissions_to_revoke {
            for permission in &record.permissions {
                actions.push(Action::RevokePermission {
                    application: record.identity(),
                    permission: permission.clone(),
                });
            }
        }
        for record in &plan.dynamic_permissions_to_grant {
            for permission in &record.permissions {
                actions.push(Action::GrantPermission {
                    application: record.identity(),
                    permission: permission.clone(),
                });
            }
        }

        actions
    }

    /// File an action under its phase
    pub fn push(&mut self, action: Action) {
        self.phases.entry(action.phase()).or_default().push(action);
    }

    /// Actions in execution order
    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.phases.values().flatten()
    }

    /// Actions of a single phase
    pub fn phase(&self, phase: Phase) -> &[Action] {
        self.phases
            .get(&phase)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Non-empty phases with their actions, in execution order
    pub fn phases(&self) -> impl Iterator<Item = (Phase, &[Action])> {
        self.phases
            .iter()
            .filter(|(_, actions)| !actions.is_empty())
            .map(|(phase, actions)| (*phase, actions.as_slice()))
    }

    pub fn into_actions(self) -> Vec<Action> {
        self.phases.into_values().flatten().collect()
    }

    pub fn len(&self) -> usize {
        self.phases.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep only actions matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&Action) -> bool,
    {
        let mut filtered = Self::new();
        for action in self.into_actions() {
            if predicate(&action) {
                filtered.push(action);
            }
        }
        filtered
    }

    /// Keep only actions matching a target pattern
    ///
    /// Target format: "kind" or "kind:name", e.g. `app`, `app:org.gnome.Maps`,
    /// `env:user`, `perm:org.mozilla.firefox`.
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (kind, name) = parse_target(t);
                self.filter(|a| matches_filter(a, kind.as_deref(), name.as_deref()))
            }
        }
    }
}

impl<'a> IntoIterator for &'a ActionPlan {
    type Item = &'a Action;
    type IntoIter = Box<dyn Iterator<Item = &'a Action> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Flags being granted, per application and scope
fn granted_flags(grants: &[Application]) -> HashMap<(AppKey, OverrideScope), HashSet<&str>> {
    let mut granted: HashMap<(AppKey, OverrideScope), HashSet<&str>> = HashMap::new();
    for record in grants {
        for scope in OverrideScope::ALL {
            granted
                .entry((record.key(), scope))
                .or_default()
                .extend(record.overrides_for(scope).iter().map(String::as_str));
        }
    }
    granted
}

/// Revoked flags of one scope, minus those whose negation is granted anyway
fn superseded_removed(
    record: &Application,
    scope: OverrideScope,
    granted: &HashMap<(AppKey, OverrideScope), HashSet<&str>>,
) -> Vec<String> {
    let grants = granted.get(&(record.key(), scope));
    record
        .overrides_for(scope)
        .iter()
        .filter(|flag| {
            let superseded = flags::negate(flag)
                .is_some_and(|neg| grants.is_some_and(|g| g.contains(neg.as_str())));
            if superseded {
                log::debug!("Revoke of {flag} for {} folded into grant", record.name);
            }
            !superseded
        })
        .cloned()
        .collect()
}

/// Parse a target string like "kind:name" into (kind, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once(':') {
        Some((kind, name)) if !kind.is_empty() => {
            (Some(kind.to_string()), Some(name.to_string()))
        }
        Some((_, name)) => (None, Some(name.to_string())),
        None => (Some(target.to_string()), None),
    }
}

/// Check if an action matches the filter criteria
fn matches_filter(action: &Action, kind: Option<&str>, name: Option<&str>) -> bool {
    if let Some(k) = kind {
        let tag = action.kind().as_str();
        // Allow common aliases
        let matches_kind = match k {
            "env" | "envs" | "environments" | "remotes" => tag.starts_with("env."),
            "app" | "apps" | "applications" => tag.starts_with("app."),
            "perm" | "perms" | "permissions" => tag.starts_with("perm."),
            "overrides" => tag.starts_with("perm.override."),
            _ => tag == k || tag.starts_with(k),
        };
        if !matches_kind {
            return false;
        }
    }

    if let Some(n) = name
        && !action.target().contains(n)
    {
        return false;
    }

    true
}
