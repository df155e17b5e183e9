//! Plan display - flatpak-compose specific UI

use colored::{ColoredString, Colorize};
use reconcile::{Action, ActionKind, ActionPlan, Diagnostic, Phase};

use crate::render::Renderer;
use crate::ui;

fn symbol(kind: ActionKind) -> ColoredString {
    match kind {
        ActionKind::EnvAdd
        | ActionKind::AppInstall
        | ActionKind::OverrideGrant
        | ActionKind::DynamicGrant => "+".green(),
        ActionKind::EnvRemove
        | ActionKind::AppUninstall
        | ActionKind::OverrideRevoke
        | ActionKind::DynamicRevoke => "-".red(),
        ActionKind::EnvUpdate => "~".yellow(),
    }
}

/// Print engine diagnostics as warnings
pub fn display_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        ui::warn(&diagnostic.to_string());
    }
}

/// Display an action plan grouped by phase
pub fn display_plan(plan: &ActionPlan) {
    if plan.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Reconciliation Plan".bold()
    );
    println!("│");

    for (phase, actions) in plan.phases() {
        println!("│ {}", phase.label().bold());
        for action in actions {
            println!(
                "│   {} {:<40} {}",
                symbol(action.kind()),
                action.target(),
                detail(action).dimmed()
            );
        }
        println!("│");
    }

    let destructive = count_phases(
        plan,
        &[
            Phase::EnvironmentRemove,
            Phase::ApplicationRemove,
            Phase::OverrideRevoke,
            Phase::DynamicRevoke,
        ],
    );

    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} ({} constructive, {} destructive)",
        ui::plural(plan.len(), "action").bold(),
        (plan.len() - destructive).to_string().green(),
        destructive.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

fn count_phases(plan: &ActionPlan, phases: &[Phase]) -> usize {
    phases.iter().map(|p| plan.phase(*p).len()).sum()
}

/// Everything in the description after the target
fn detail(action: &Action) -> String {
    match action {
        Action::InstallApplication { application }
        | Action::UninstallApplication { application } => {
            format!("branch {}", application.branch)
        }
        Action::GrantOverrides { scope, flags, .. }
        | Action::RevokeOverrides { scope, flags, .. } => {
            format!("[{scope}] {}", flags.join(" "))
        }
        Action::GrantPermission { permission, .. }
        | Action::RevokePermission { permission, .. } => {
            permission.to_string()
        }
        Action::AddEnvironment { environment }
        | Action::RemoveEnvironment { environment }
        | Action::UpdateEnvironment { environment } => {
            let mut parts: Vec<String> = environment
                .core
                .keys()
                .map(|k| format!("core.{k}"))
                .collect();
            parts.extend(environment.remotes.keys().map(|r| format!("remote {r}")));
            parts.join(", ")
        }
    }
}

/// Print the host commands the plan renders to, with what cannot be rendered
pub fn display_commands(plan: &ActionPlan, renderer: &Renderer) {
    if plan.is_empty() {
        return;
    }

    ui::section("Commands");
    for action in plan {
        let rendered = renderer.render(action);
        for warning in &rendered.warnings {
            ui::warn(warning);
        }
        if rendered.commands.is_empty() {
            ui::dim(&format!("# {action}: nothing to run"));
        }
        for command in &rendered.commands {
            println!("  {command}");
        }
    }
}
