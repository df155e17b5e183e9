//! Execution provider traits
//!
//! These traits keep the executor free of any particular process runner,
//! terminal or prompt implementation.

use crate::executor::ApplyResult;
use crate::planner::{Action, Phase};
use anyhow::Result;

/// Performs a single action against the host
///
/// Implement this trait to turn actions into side effects. Returning an error
/// marks the action failed; the executor records it and moves on.
pub trait ActionRunner {
    fn run(&mut self, action: &Action) -> Result<ApplyResult>;
}

impl<F> ActionRunner for F
where
    F: FnMut(&Action) -> Result<ApplyResult>,
{
    fn run(&mut self, action: &Action) -> Result<ApplyResult> {
        self(action)
    }
}

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback: Send {
    /// Called when a phase with at least one action starts
    fn on_phase_start(&mut self, phase: Phase, count: usize);

    /// Called before an action runs; `index` is 1-based across the whole plan
    fn on_action_start(&mut self, index: usize, total: usize, action: &Action);

    /// Called when an action completes
    fn on_action_complete(&mut self, action: &Action, result: &ApplyResult);

    /// Called when a phase completes
    fn on_phase_complete(&mut self, phase: Phase);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm; `true` means proceed
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_phase_start(&mut self, _phase: Phase, _count: usize) {}
    fn on_action_start(&mut self, _index: usize, _total: usize, _action: &Action) {}
    fn on_action_complete(&mut self, _action: &Action, _result: &ApplyResult) {}
    fn on_phase_complete(&mut self, _phase: Phase) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}
