//! Load-time validation of state snapshots
//!
//! Duplicate environments used to be silently collapsed by map overwrite;
//! here they fail loudly instead.

use crate::error::{Result, ValidationError};
use crate::types::{Application, DEFAULT_BRANCH, InstallationType, State};
use std::collections::HashSet;

impl State {
    /// Fill in defaults the manifest may omit
    ///
    /// - empty `branch` becomes `stable`
    /// - empty `repo` becomes the only remote of the application's installation type
    pub fn apply_defaults(&mut self) -> Result<()> {
        let remotes_by_type: Vec<(InstallationType, Vec<String>)> = InstallationType::ALL
            .iter()
            .map(|t| {
                let names = self
                    .environments
                    .iter()
                    .filter(|e| e.installation_type == *t)
                    .flat_map(|e| e.remotes.keys().cloned())
                    .collect();
                (*t, names)
            })
            .collect();

        for app in &mut self.applications {
            if app.branch.trim().is_empty() {
                app.branch = DEFAULT_BRANCH.to_string();
            }

            if app.repo.trim().is_empty() {
                let candidates = remotes_by_type
                    .iter()
                    .find(|(t, _)| *t == app.installation_type)
                    .map(|(_, names)| names.as_slice())
                    .unwrap_or_default();

                match candidates {
                    [only] => app.repo = only.clone(),
                    _ => {
                        return Err(ValidationError::AmbiguousRepository {
                            name: app.name.clone(),
                            installation: app.installation_type,
                            candidates: candidates.len(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Check identity invariants
    ///
    /// Unresolved application repositories are not an error here; see
    /// [`State::unresolved_applications`].
    pub fn validate(&self) -> Result<()> {
        let mut seen_types = HashSet::new();
        for env in &self.environments {
            if !seen_types.insert(env.installation_type) {
                return Err(ValidationError::DuplicateEnvironment(env.installation_type));
            }
            for (name, attributes) in &env.remotes {
                if !attributes.contains_key("url") {
                    return Err(ValidationError::MissingRemoteUrl {
                        remote: name.clone(),
                        installation: env.installation_type,
                    });
                }
            }
        }

        let mut seen_apps = HashSet::new();
        for app in &self.applications {
            if app.name.trim().is_empty() {
                return Err(ValidationError::EmptyApplicationName);
            }
            let key = app.key();
            if !seen_apps.insert(key.clone()) {
                return Err(ValidationError::DuplicateApplication(key));
            }
        }

        Ok(())
    }

    /// Applications whose `(repo, installationType)` does not resolve to a declared remote
    pub fn unresolved_applications(&self) -> Vec<&Application> {
        self.applications
            .iter()
            .filter(|app| !self.resolves(app))
            .collect()
    }
}
