//! Execution engine - runs an action plan sequentially
//!
//! Later actions may depend on earlier ones (a remote must exist before an
//! install from it), so actions never run concurrently.

use crate::context::{ActionRunner, ConfirmCallback, ProgressCallback};
use crate::planner::{Action, ActionPlan};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Result of running one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// Nothing needed to be done
    NoChange,
    /// Something was added or granted
    Created,
    /// Something was changed in place
    Modified,
    /// Something was removed or revoked
    Removed,
    /// The action failed
    Failed { error: String },
    /// The action was not run
    Skipped { reason: String },
}

/// A failed action, kept for the final report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFailure {
    pub action: String,
    pub error: String,
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
    pub failures: Vec<ActionFailure>,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of actions accounted for
    pub fn total(&self) -> usize {
        self.created + self.modified + self.removed + self.skipped + self.failed + self.no_change
    }

    /// Record the result of one action
    pub fn add_result(&mut self, action: &Action, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { error } => {
                self.failed += 1;
                self.failures.push(ActionFailure {
                    action: action.to_string(),
                    error: error.clone(),
                });
            }
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't run anything, count every action as skipped
    pub dry_run: bool,
    /// Don't ask for confirmation
    pub assume_yes: bool,
    /// Stop at the first failure instead of continuing
    pub fail_fast: bool,
}

/// Execute a plan with the given options and callbacks
///
/// An empty plan returns an empty summary without prompting. A declined
/// confirmation runs nothing. A failed action is recorded and, unless
/// `fail_fast` is set, the remaining actions still run.
pub fn execute<R, P, C>(
    plan: &ActionPlan,
    opts: &ExecuteOptions,
    runner: &mut R,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    R: ActionRunner + ?Sized,
    P: ProgressCallback + ?Sized,
    C: ConfirmCallback + ?Sized,
{
    let total = plan.len();
    if total == 0 {
        return Ok(ExecuteSummary::default());
    }

    if opts.dry_run {
        log::info!("Dry run: {total} action(s) not executed");
        return Ok(ExecuteSummary {
            skipped: total,
            ..Default::default()
        });
    }

    if !opts.assume_yes && !confirm.confirm(&format!("Apply {total} action(s)?"))? {
        log::info!("Declined; {total} action(s) not executed");
        return Ok(ExecuteSummary {
            skipped: total,
            ..Default::default()
        });
    }

    let mut summary = ExecuteSummary::default();
    let mut index = 0;
    let mut aborted = false;

    for (phase, actions) in plan.phases() {
        if aborted {
            summary.skipped += actions.len();
            continue;
        }

        progress.on_phase_start(phase, actions.len());
        for action in actions {
            index += 1;
            if aborted {
                summary.skipped += 1;
                continue;
            }

            progress.on_action_start(index, total, action);
            let result = run_action(runner, action);
            progress.on_action_complete(action, &result);

            if let ApplyResult::Failed { error } = &result {
                log::warn!("{action} failed: {error}");
                aborted = opts.fail_fast;
            }
            summary.add_result(action, &result);
        }
        progress.on_phase_complete(phase);
    }

    Ok(summary)
}

fn run_action<R: ActionRunner + ?Sized>(runner: &mut R, action: &Action) -> ApplyResult {
    match runner.run(action) {
        Ok(result) => result,
        Err(e) => ApplyResult::Failed {
            error: format!("{e:#}"),
        },
    }
}
