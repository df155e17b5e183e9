//! Diff engine: compare a current snapshot against a desired one
//!
//! Desired state is authoritative. Anything only present on the current side
//! is removed, anything only present on the desired side is added, and values
//! present on both sides that differ are updated to the desired value.
//!
//! All comparators are pure. They never mutate their inputs and never fail:
//! divergence is the normal outcome, and anomalies are surfaced as
//! [`Diagnostic`]s.

use crate::types::{
    AppKey, Application, CoreSettings, Environment, InstallationType, OverrideScope, Permission,
    RemoteAttributes, Remotes, State, resolves_in,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// A non-fatal anomaly found while diffing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A declared application whose `(repo, installationType)` is not a declared remote
    UnresolvedRepository(AppKey),
    /// The desired side declares an installation the current side does not report
    MissingEnvironment(InstallationType),
    /// Same identity on both sides but a different branch
    BranchMismatch {
        app: AppKey,
        current: String,
        desired: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedRepository(key) => write!(
                f,
                "{} is not installable: remote '{}' is not declared for the {} installation",
                key.name, key.repo, key.installation_type
            ),
            Self::MissingEnvironment(t) => {
                write!(
                    f,
                    "the {t} installation is declared but was not found on the system"
                )
            }
            Self::BranchMismatch {
                app,
                current,
                desired,
            } => write!(
                f,
                "{app} is installed from branch '{current}' but '{desired}' is declared; branch changes are not reconciled"
            ),
        }
    }
}

/// Typed output of [`diff`]
///
/// Environments carry only delta keys. Permission buckets carry synthetic
/// application records with the identity fields plus the delta flags or grants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub environments_to_add: Vec<Environment>,
    pub environments_to_remove: Vec<Environment>,
    pub environments_to_update: Vec<Environment>,
    pub applications_to_add: Vec<Application>,
    pub applications_to_remove: Vec<Application>,
    pub static_permissions_to_grant: Vec<Application>,
    pub static_permissions_to_revoke: Vec<Application>,
    pub dynamic_permissions_to_grant: Vec<Application>,
    pub dynamic_permissions_to_revoke: Vec<Application>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ReconciliationPlan {
    /// True when no bucket holds a change (diagnostics are not changes)
    pub fn is_empty(&self) -> bool {
        self.change_count() == 0
    }

    /// Number of entries across all change buckets
    pub fn change_count(&self) -> usize {
        self.environments_to_add.len()
            + self.environments_to_remove.len()
            + self.environments_to_update.len()
            + self.applications_to_add.len()
            + self.applications_to_remove.len()
            + self.static_permissions_to_grant.len()
            + self.static_permissions_to_revoke.len()
            + self.dynamic_permissions_to_grant.len()
            + self.dynamic_permissions_to_revoke.len()
    }
}

/// Environment comparator output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentDelta {
    pub to_add: Vec<Environment>,
    pub to_remove: Vec<Environment>,
    pub to_update: Vec<Environment>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Application comparator output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationDelta {
    pub to_add: Vec<Application>,
    pub to_remove: Vec<Application>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Permission comparator output (static or dynamic)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionDelta {
    pub to_grant: Vec<Application>,
    pub to_revoke: Vec<Application>,
}

/// Compute the reconciliation plan converging `current` toward `desired`
pub fn diff(current: &State, desired: &State) -> ReconciliationPlan {
    let environments = compare_environments(&current.environments, &desired.environments);
    let applications = compare_applications(
        &desired.environments,
        &current.applications,
        &desired.applications,
    );
    let overrides = compare_static_permissions(&current.applications, &desired.applications);
    let dynamic = compare_dynamic_permissions(&current.applications, &desired.applications);

    let mut diagnostics = environments.diagnostics;
    diagnostics.extend(applications.diagnostics);

    let plan = ReconciliationPlan {
        environments_to_add: environments.to_add,
        environments_to_remove: environments.to_remove,
        environments_to_update: environments.to_update,
        applications_to_add: applications.to_add,
        applications_to_remove: applications.to_remove,
        static_permissions_to_grant: overrides.to_grant,
        static_permissions_to_revoke: overrides.to_revoke,
        dynamic_permissions_to_grant: dynamic.to_grant,
        dynamic_permissions_to_revoke: dynamic.to_revoke,
        diagnostics,
    };

    log::debug!(
        "Diff produced {} change(s) and {} diagnostic(s)",
        plan.change_count(),
        plan.diagnostics.len()
    );
    plan
}

/// Index environments by installation type; the first entry of a type wins
fn index_environments(environments: &[Environment]) -> BTreeMap<InstallationType, &Environment> {
    let mut index = BTreeMap::new();
    for env in environments {
        index.entry(env.installation_type).or_insert(env);
    }
    index
}

/// Compare environments per installation type
pub fn compare_environments(current: &[Environment], desired: &[Environment]) -> EnvironmentDelta {
    let current = index_environments(current);
    let desired = index_environments(desired);
    let mut delta = EnvironmentDelta::default();

    for installation_type in InstallationType::ALL {
        match (
            current.get(&installation_type),
            desired.get(&installation_type),
        ) {
            (Some(cur), None) => {
                if !cur.is_empty() {
                    delta.to_remove.push((*cur).clone());
                }
            }
            (None, Some(want)) => {
                delta
                    .diagnostics
                    .push(Diagnostic::MissingEnvironment(installation_type));
                if !want.is_empty() {
                    delta.to_add.push((*want).clone());
                }
            }
            (Some(cur), Some(want)) => {
                let added = Environment {
                    installation_type,
                    core: missing_keys(&want.core, &cur.core),
                    remotes: missing_remote_keys(&want.remotes, &cur.remotes),
                };
                let removed = Environment {
                    installation_type,
                    core: missing_keys(&cur.core, &want.core),
                    remotes: missing_remote_keys(&cur.remotes, &want.remotes),
                };
                let updated = Environment {
                    installation_type,
                    core: changed_values(&cur.core, &want.core),
                    remotes: changed_remote_values(&cur.remotes, &want.remotes),
                };

                if !added.is_empty() {
                    delta.to_add.push(added);
                }
                if !removed.is_empty() {
                    delta.to_remove.push(removed);
                }
                if !updated.is_empty() {
                    delta.to_update.push(updated);
                }
            }
            (None, None) => {}
        }
    }

    delta
}

/// Keys of `from` absent in `other`, with `from`'s values
fn missing_keys(from: &CoreSettings, other: &CoreSettings) -> CoreSettings {
    from.iter()
        .filter(|(k, _)| !other.contains_key(*k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Keys present on both sides whose values differ, with the desired value
fn changed_values(current: &CoreSettings, desired: &CoreSettings) -> CoreSettings {
    desired
        .iter()
        .filter(|(k, v)| current.get(*k).is_some_and(|cur| cur != *v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Whole remotes of `from` missing in `other`, plus missing attributes of shared remotes
fn missing_remote_keys(from: &Remotes, other: &Remotes) -> Remotes {
    let mut out = Remotes::new();
    for (name, attributes) in from {
        let delta: RemoteAttributes = match other.get(name) {
            None => attributes.clone(),
            Some(other_attributes) => missing_keys(attributes, other_attributes),
        };
        if !delta.is_empty() {
            out.insert(name.clone(), delta);
        }
    }
    out
}

fn changed_remote_values(current: &Remotes, desired: &Remotes) -> Remotes {
    let mut out = Remotes::new();
    for (name, want) in desired {
        if let Some(cur) = current.get(name) {
            let delta = changed_values(cur, want);
            if !delta.is_empty() {
                out.insert(name.clone(), delta);
            }
        }
    }
    out
}

/// Compare application sets by identity key
///
/// `environments` is the desired environment list; a desired-only application
/// is install-eligible only when its repository resolves against it.
pub fn compare_applications(
    environments: &[Environment],
    current: &[Application],
    desired: &[Application],
) -> ApplicationDelta {
    let current_keys: HashMap<AppKey, &Application> =
        current.iter().map(|a| (a.key(), a)).collect();
    let desired_keys: HashSet<AppKey> = desired.iter().map(Application::key).collect();
    let mut delta = ApplicationDelta::default();
    let mut seen = HashSet::new();

    for app in current {
        let key = app.key();
        if !desired_keys.contains(&key) && seen.insert(key) {
            delta.to_remove.push(app.clone());
        }
    }

    seen.clear();
    for app in desired {
        let key = app.key();
        if !seen.insert(key.clone()) {
            continue;
        }
        match current_keys.get(&key) {
            Some(installed) => {
                if installed.branch != app.branch {
                    delta.diagnostics.push(Diagnostic::BranchMismatch {
                        app: key,
                        current: installed.branch.clone(),
                        desired: app.branch.clone(),
                    });
                }
            }
            None if resolves_in(environments, app) => delta.to_add.push(app.clone()),
            None => delta.diagnostics.push(Diagnostic::UnresolvedRepository(key)),
        }
    }

    delta
}

/// Ordered set difference `from \ other`, duplicates collapsed
fn difference<T: Clone + Eq + std::hash::Hash>(from: &[T], other: &[T]) -> Vec<T> {
    let other: HashSet<&T> = other.iter().collect();
    let mut seen = HashSet::new();
    from.iter()
        .filter(|item| !other.contains(item) && seen.insert(*item))
        .cloned()
        .collect()
}

/// Pair up applications present on both sides, in desired order
fn matched<'a>(
    current: &'a [Application],
    desired: &'a [Application],
) -> Vec<(&'a Application, &'a Application)> {
    let current_keys: HashMap<AppKey, &Application> =
        current.iter().map(|a| (a.key(), a)).collect();
    let mut seen = HashSet::new();
    desired
        .iter()
        .filter_map(|want| {
            let key = want.key();
            let cur = current_keys.get(&key)?;
            seen.insert(key).then_some((*cur, want))
        })
        .collect()
}

/// Compare `overrides` and `overrides_user` of applications present on both sides
pub fn compare_static_permissions(
    current: &[Application],
    desired: &[Application],
) -> PermissionDelta {
    let mut delta = PermissionDelta::default();

    for (cur, want) in matched(current, desired) {
        let mut grant = want.identity();
        let mut revoke = cur.identity();
        for scope in OverrideScope::ALL {
            *grant.overrides_for_mut(scope) =
                difference(want.overrides_for(scope), cur.overrides_for(scope));
            *revoke.overrides_for_mut(scope) =
                difference(cur.overrides_for(scope), want.overrides_for(scope));
        }
        if grant.has_overrides() {
            delta.to_grant.push(grant);
        }
        if revoke.has_overrides() {
            delta.to_revoke.push(revoke);
        }
    }

    delta
}

/// Compare dynamic permission tuples of applications present on both sides
///
/// A tuple differing in any field is a revoke of the old plus a grant of the new.
pub fn compare_dynamic_permissions(
    current: &[Application],
    desired: &[Application],
) -> PermissionDelta {
    let mut delta = PermissionDelta::default();

    for (cur, want) in matched(current, desired) {
        let grants: Vec<Permission> = difference(&want.permissions, &cur.permissions);
        let revokes: Vec<Permission> = difference(&cur.permissions, &want.permissions);
        if !grants.is_empty() {
            let mut record = want.identity();
            record.permissions = grants;
            delta.to_grant.push(record);
        }
        if !revokes.is_empty() {
            let mut record = cur.identity();
            record.permissions = revokes;
            delta.to_revoke.push(record);
        }
    }

    delta
}
