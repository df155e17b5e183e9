//! # Reconcile
//!
//! State reconciliation for Flatpak-style package managers.
//!
//! Given a desired [`State`] (usually a manifest) and a current one (usually a
//! live snapshot), this crate computes what differs and turns the difference
//! into an ordered list of corrective actions.
//!
//! ## Core Concepts
//!
//! - **State**: environments (repository settings per installation type) and
//!   applications identified by `(repo, installationType, name)`
//! - **ReconciliationPlan**: the typed diff, one bucket per kind of change
//! - **ActionPlan**: ordered actions, filed into phases so destructive steps
//!   always precede constructive ones
//! - **Executor**: runs actions one at a time through an [`ActionRunner`]
//!
//! ## Example
//!
//! ```ignore
//! use reconcile::{ActionPlan, AutoConfirm, ExecuteOptions, NoProgress, diff, execute};
//!
//! let plan = diff(&current, &desired);
//! for diagnostic in &plan.diagnostics {
//!     log::warn!("{diagnostic}");
//! }
//!
//! let actions = ActionPlan::from_plan(&plan);
//! let summary = execute(
//!     &actions,
//!     &ExecuteOptions::default(),
//!     &mut |action: &reconcile::Action| {
//!         println!("would run {action}");
//!         Ok(reconcile::ApplyResult::NoChange)
//!     },
//!     &mut NoProgress,
//!     &mut AutoConfirm,
//! )?;
//! ```
//!
//! ## Provider Traits
//!
//! - [`SnapshotProvider`]: one method per live-system probe
//! - [`ActionRunner`]: performs one action
//! - [`ProgressCallback`]: receives progress updates
//! - [`ConfirmCallback`]: handles the confirmation gate
//!
//! The diff engine and the synthesizer are pure and never touch the host.

pub mod compose;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod flags;
pub mod planner;
pub mod provider;
pub mod types;
mod validate;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use compose::{compose, normalize_current};
pub use context::{
    ActionRunner, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback,
};
pub use diff::{
    ApplicationDelta, Diagnostic, EnvironmentDelta, PermissionDelta, ReconciliationPlan,
    compare_applications, compare_dynamic_permissions, compare_environments,
    compare_static_permissions, diff,
};
pub use error::{Result, ValidationError};
pub use executor::{ActionFailure, ApplyResult, ExecuteOptions, ExecuteSummary, execute};
pub use planner::{Action, ActionKind, ActionPlan, Phase};
pub use provider::{SnapshotProvider, probe_state};
pub use types::{
    AppKey, Application, CoreSettings, DEFAULT_BRANCH, Environment, InstallationType,
    OverrideScope, Permission, RemoteAttributes, Remotes, State,
};
