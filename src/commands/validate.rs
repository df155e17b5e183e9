//! `validate`

use anyhow::Result;

use crate::Context;
use crate::cli::ManifestArgs;
use crate::commands::load_manifest;
use crate::ui;

/// Load the compose file and report what it declares
pub fn run(ctx: &Context, args: &ManifestArgs) -> Result<()> {
    let state = load_manifest(args)?;

    if ctx.quiet {
        return Ok(());
    }

    ui::header("Compose file");
    for env in &state.environments {
        ui::kv(
            env.installation_type.as_str(),
            &format!(
                "{}, {}",
                ui::plural(env.remotes.len(), "remote"),
                ui::plural(env.core.len(), "core setting")
            ),
        );
    }
    ui::kv("applications", &state.applications.len().to_string());

    let unresolved = state.unresolved_applications();
    if unresolved.is_empty() {
        ui::success("Compose file is valid");
    } else {
        ui::warn(&format!(
            "Compose file is valid, but {} will not be installed",
            ui::plural(unresolved.len(), "application")
        ));
    }
    Ok(())
}
