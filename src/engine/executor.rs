//! Execution engine - flatpak-compose executor with UI integration

use anyhow::Result;
use colored::Colorize;
use flatpakkit::{ErrorCategory, Invocation};
use reconcile::{
    Action, ActionKind, ActionPlan, ActionRunner, ApplyResult, ConfirmCallback, ExecuteOptions,
    ExecuteSummary, Phase, ProgressCallback,
};
use std::process::ExitStatus;

use crate::render::{Rendered, Renderer};
use crate::runner;
use crate::ui;

/// Runs actions by rendering them and spawning each command in turn
pub struct CommandRunner {
    renderer: Renderer,
}

impl CommandRunner {
    pub fn new(renderer: Renderer) -> Self {
        Self { renderer }
    }
}

/// What a fully successful action did
fn outcome(kind: ActionKind) -> ApplyResult {
    match kind {
        ActionKind::EnvAdd
        | ActionKind::AppInstall
        | ActionKind::OverrideGrant
        | ActionKind::DynamicGrant => ApplyResult::Created,
        ActionKind::EnvUpdate => ApplyResult::Modified,
        ActionKind::EnvRemove
        | ActionKind::AppUninstall
        | ActionKind::OverrideRevoke
        | ActionKind::DynamicRevoke => ApplyResult::Removed,
    }
}

impl ActionRunner for CommandRunner {
    fn run(&mut self, action: &Action) -> Result<ApplyResult> {
        run_rendered(action, self.renderer.render(action))
    }
}

/// Run the commands of one rendered action, stopping at the first real failure
fn run_rendered(action: &Action, rendered: Rendered) -> Result<ApplyResult> {
    if rendered.commands.is_empty() {
        return Ok(ApplyResult::Skipped {
            reason: rendered.warnings.join("; "),
        });
    }
    for warning in &rendered.warnings {
        log::warn!("{warning}");
    }

    let subject = action.application().map(|app| app.name.as_str());
    let mut changed = false;
    for command in &rendered.commands {
        println!("{} {}", "+".dimmed(), command.to_string().dimmed());
        let done = runner::run_streaming(command)?;
        if done.status.success() {
            changed = true;
            continue;
        }

        let category = flatpakkit::Error::from_flatpak_output(&done.stderr, subject).category();
        if category.is_ignorable() {
            log::info!("{command}: {}", category.description());
            continue;
        }
        return Ok(ApplyResult::Failed {
            error: failure_message(command, done.status, category),
        });
    }

    Ok(if changed {
        outcome(action.kind())
    } else {
        ApplyResult::NoChange
    })
}

fn failure_message(command: &Invocation, status: ExitStatus, category: ErrorCategory) -> String {
    match category {
        ErrorCategory::Other => format!("`{command}` exited with {status}"),
        _ => format!(
            "`{command}` exited with {status} ({}). {}",
            category.description(),
            category.advice()
        ),
    }
}

/// Phase headers and per-action status lines
pub struct TerminalProgress;

impl ProgressCallback for TerminalProgress {
    fn on_phase_start(&mut self, phase: Phase, count: usize) {
        ui::section(&format!("{} ({count})", phase.label()));
    }

    fn on_action_start(&mut self, index: usize, total: usize, action: &Action) {
        ui::step(index, total, &action.to_string());
    }

    fn on_action_complete(&mut self, _action: &Action, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => println!("  {} unchanged", "○".dimmed()),
            ApplyResult::Created | ApplyResult::Modified | ApplyResult::Removed => {
                println!("  {} done", "✓".green());
            }
            ApplyResult::Failed { error } => println!("  {} {}", "✗".red(), error),
            ApplyResult::Skipped { reason } => println!("  {} skipped: {}", "⊘".yellow(), reason),
        }
    }

    fn on_phase_complete(&mut self, _phase: Phase) {}
}

/// Confirm with user
#[derive(Default)]
pub struct PromptConfirm {
    declined: bool,
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;

        self.declined = !confirmed;
        Ok(confirmed)
    }
}

/// Execute the plan with flatpak-compose's UI integration
pub fn execute(
    plan: &ActionPlan,
    opts: &ExecuteOptions,
    renderer: Renderer,
) -> Result<ExecuteSummary> {
    let mut runner = CommandRunner::new(renderer);
    let mut confirm = PromptConfirm::default();
    let summary = reconcile::execute(plan, opts, &mut runner, &mut TerminalProgress, &mut confirm)?;

    if plan.is_empty() {
        return Ok(summary);
    }

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
    } else if confirm.declined {
        println!();
        println!("  {} Aborted", "✗".red());
    } else {
        print_summary(&summary);
    }

    Ok(summary)
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!(
            "  {} Compose state applied successfully!",
            "✓".green().bold()
        );
    } else {
        println!(
            "  {} Compose state applied with errors",
            "⚠".yellow().bold()
        );
    }
    ui::dim(&format!(
        "{} run, {} changed",
        ui::plural(summary.total(), "action"),
        summary.total_changes()
    ));

    if summary.created > 0 {
        println!("    • {} added", ui::plural(summary.created, "item"));
    }
    if summary.modified > 0 {
        println!("    • {} modified", ui::plural(summary.modified, "item"));
    }
    if summary.removed > 0 {
        println!("    • {} removed", ui::plural(summary.removed, "item"));
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", ui::plural(summary.skipped, "action"));
    }
    if summary.failed > 0 {
        println!("    • {} {}", summary.failed, "failed".red());
        for failure in &summary.failures {
            println!("      {} {}: {}", "✗".red(), failure.action, failure.error);
        }
    }
}
