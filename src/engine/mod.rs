//! Execution engine for flatpak-compose
//!
//! The engine orchestrates:
//! 1. Diffing - display the action plan computed by `reconcile`
//! 2. Rendering - show the host commands each action turns into
//! 3. Executing - run them one at a time behind a confirmation gate

pub mod differ;
pub mod executor;

pub use executor::execute;
