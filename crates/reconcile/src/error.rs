//! Validation errors for state snapshots
//!
//! The diff engine itself never fails: every divergence is a normal
//! add/remove/update outcome. These errors are raised by [`State::validate`]
//! and [`State::apply_defaults`] before a snapshot reaches the engine.
//!
//! [`State::validate`]: crate::types::State::validate
//! [`State::apply_defaults`]: crate::types::State::apply_defaults

use crate::types::{AppKey, InstallationType};
use thiserror::Error;

/// Input-contract violations detected at load time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// More than one environment declared for the same installation type
    #[error("duplicate environment for installation type '{0}'")]
    DuplicateEnvironment(InstallationType),

    /// A remote has no url attribute
    #[error("remote '{remote}' in the {installation} installation has no url")]
    MissingRemoteUrl {
        /// Name of the remote
        remote: String,
        /// Installation the remote was declared in
        installation: InstallationType,
    },

    /// An application without a name
    #[error("application name is required")]
    EmptyApplicationName,

    /// Two applications share the same `(repo, installationType, name)` identity
    #[error("duplicate application {0}")]
    DuplicateApplication(AppKey),

    /// An application omits `repo` and no single remote can be inferred
    #[error(
        "application '{name}' does not name a repository and the {installation} installation declares {candidates} remotes"
    )]
    AmbiguousRepository {
        /// Application name
        name: String,
        /// Installation the application targets
        installation: InstallationType,
        /// Number of remotes that could have been picked
        candidates: usize,
    },
}

/// Result type for validation
pub type Result<T> = std::result::Result<T, ValidationError>;
