//! `plan` and `apply`

use anyhow::{Result, bail};
use reconcile::ExecuteOptions;

use crate::Context;
use crate::cli::{ApplyArgs, PlanArgs};
use crate::commands::Reconciliation;
use crate::engine::{self, differ};
use crate::render::Renderer;
use crate::ui;

fn prepare(ctx: &Context, args: &PlanArgs) -> Result<Reconciliation> {
    let reconciliation =
        Reconciliation::from_host(&args.manifest, args.current_state, args.target.as_deref())?;

    differ::display_diagnostics(&reconciliation.plan.diagnostics);
    if !ctx.quiet {
        differ::display_plan(&reconciliation.actions);
    }
    Ok(reconciliation)
}

/// Show what apply would do, including the exact commands
pub fn plan(ctx: &Context, args: &PlanArgs) -> Result<()> {
    let reconciliation = prepare(ctx, args)?;
    differ::display_commands(&reconciliation.actions, &Renderer::for_host()?);
    Ok(())
}

/// Reconcile the system with the compose file
pub fn apply(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let reconciliation = prepare(ctx, &args.plan)?;
    let renderer = Renderer::for_host()?;

    if args.dry_run || ctx.verbose > 0 {
        differ::display_commands(&reconciliation.actions, &renderer);
    }

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        assume_yes: args.assume_yes,
        fail_fast: args.fail_fast,
    };
    let summary = engine::execute(&reconciliation.actions, &opts, renderer)?;

    if !summary.is_success() {
        bail!("{} failed", ui::plural(summary.failed, "action"));
    }
    Ok(())
}
