//! Current-state shaping before the diff
//!
//! [`compose`] intersects a manifest with the live system so that only things
//! the manifest talks about can change. [`normalize_current`] removes live
//! artifacts that are the residue of earlier reconciliations rather than
//! real divergence.

use crate::flags;
use crate::types::{Application, Environment, OverrideScope, RemoteAttributes, Remotes, State};

/// Remote attributes the live probe reports but a manifest rarely declares
pub const PROBE_ONLY_ATTRIBUTES: &[&str] = &["GPGKey"];

/// Core keys in this namespace are flatpak settings; everything else is ostree's
pub const MANAGED_CORE_PREFIX: &str = "xa.";

/// Intersection of a manifest with the live system, carrying live values
///
/// - applications present on both sides, matched on name, repo, branch and
///   installation type, as the live record
/// - per installation type: remotes present on both sides with the attribute
///   keys the manifest declares, and the core keys the manifest declares
pub fn compose(manifest: &State, system: &State) -> State {
    let applications = manifest
        .applications
        .iter()
        .filter_map(|wanted| {
            system
                .applications
                .iter()
                .find(|live| same_install(wanted, live))
                .cloned()
        })
        .collect();

    let environments = manifest
        .environments
        .iter()
        .filter_map(|wanted| {
            let live = system.environment(wanted.installation_type)?;
            Some(Environment {
                installation_type: wanted.installation_type,
                core: live
                    .core
                    .iter()
                    .filter(|(k, _)| wanted.core.contains_key(*k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                remotes: common_remotes(&wanted.remotes, &live.remotes),
            })
        })
        .collect();

    State {
        environments,
        applications,
    }
}

fn same_install(a: &Application, b: &Application) -> bool {
    a.name == b.name
        && a.repo == b.repo
        && a.branch == b.branch
        && a.installation_type == b.installation_type
}

fn common_remotes(wanted: &Remotes, live: &Remotes) -> Remotes {
    wanted
        .iter()
        .filter_map(|(name, attributes)| {
            let live_attributes = live.get(name)?;
            let restricted: RemoteAttributes = live_attributes
                .iter()
                .filter(|(k, _)| attributes.contains_key(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            Some((name.clone(), restricted))
        })
        .collect()
}

/// Drop live residue that would otherwise show up as spurious revokes
///
/// - a negated override flag whose subject the desired application mentions in
///   neither polarity is how an earlier revoke looks on the host; it is dropped
/// - an undeclared override flag with no negation cannot be revoked one by one;
///   it is dropped with a warning
/// - probe-only remote attributes the desired remote does not declare are dropped
/// - core keys outside [`MANAGED_CORE_PREFIX`] the desired environment does not
///   declare are repository internals and are dropped
///
/// Applications and remotes not present in `desired` are left untouched.
pub fn normalize_current(current: &State, desired: &State) -> State {
    let mut normalized = current.clone();

    for app in &mut normalized.applications {
        let Some(wanted) = desired.application(&app.key()) else {
            continue;
        };
        for scope in OverrideScope::ALL {
            let wanted_flags = wanted.overrides_for(scope);
            let before = app.overrides_for(scope).len();
            app.overrides_for_mut(scope).retain(|flag| {
                !flags::is_negative(flag) || flags::mentions_subject(wanted_flags, flag)
            });
            let dropped = before - app.overrides_for(scope).len();
            if dropped > 0 {
                log::debug!(
                    "Ignoring {dropped} residual {scope} override(s) of {}",
                    app.name
                );
            }

            let name = app.name.clone();
            app.overrides_for_mut(scope).retain(|flag| {
                let revocable = flags::negate(flag).is_some() || wanted_flags.contains(flag);
                if !revocable {
                    log::warn!(
                        "{flag} of {name} ({scope}) cannot be revoked on its own; \
                         use `flatpak override --{scope} --reset {name}` and apply again"
                    );
                }
                revocable
            });
        }
    }

    for env in &mut normalized.environments {
        let wanted = desired.environment(env.installation_type);

        env.core.retain(|key, _| {
            key.starts_with(MANAGED_CORE_PREFIX)
                || wanted.is_some_and(|w| w.core.contains_key(key))
        });

        let Some(wanted) = wanted else {
            continue;
        };
        for (name, attributes) in &mut env.remotes {
            let Some(wanted_attributes) = wanted.remotes.get(name) else {
                continue;
            };
            attributes.retain(|key, _| {
                !PROBE_ONLY_ATTRIBUTES.contains(&key.as_str())
                    || wanted_attributes.contains_key(key)
            });
        }
    }

    normalized
}
