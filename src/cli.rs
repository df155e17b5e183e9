use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::paths::ENV_MANIFEST;

#[derive(Parser)]
#[command(name = "flatpak-compose")]
#[command(version)]
#[command(
    about = "Declarative Flatpak: reconcile a compose file with the installed system",
    long_about = None
)]
#[command(
    after_help = "The current state is either the system state or its intersection with the compose file \
(system-compose, the default, which never touches anything the compose file does not mention)."
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the changes and commands that apply would run
    Plan(PlanArgs),

    /// Make the system match the compose file
    Apply(ApplyArgs),

    /// Print the system or system-compose state
    ExportState(ExportArgs),

    /// Load and validate the compose file without touching the system
    Validate(ManifestArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ManifestArgs {
    /// Compose file (default: flatpak-compose.yaml, then flatpak-compose.yml)
    #[arg(short = 'f', long = "file", env = ENV_MANIFEST)]
    pub file: Option<String>,
}

/// Which state counts as current
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StateMode {
    /// Everything installed on the system
    System,
    /// Only what both the system and the compose file mention
    SystemCompose,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Current state to compare the compose file against
    #[arg(long, value_enum, default_value_t = StateMode::SystemCompose)]
    pub current_state: StateMode,

    /// Only consider matching actions (e.g., app, app:org.gnome.Maps, env:user, perm)
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Automatically answer yes for all questions
    #[arg(short = 'y', long = "assumeyes")]
    pub assume_yes: bool,

    /// Show what would happen without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Stop at the first failed action
    #[arg(long)]
    pub fail_fast: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Yaml,
    Json,
}

#[derive(Args)]
pub struct ExportArgs {
    /// State to export
    #[arg(value_enum)]
    pub state: StateMode,

    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = ExportFormat::Yaml)]
    pub format: ExportFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_plan_defaults_to_system_compose() {
        let cli = Cli::parse_from(["flatpak-compose", "plan"]);
        let Command::Plan(args) = cli.command else {
            panic!("expected plan");
        };
        assert_eq!(args.current_state, StateMode::SystemCompose);
        assert!(args.target.is_none());
    }

    #[test]
    fn test_apply_flags() {
        let cli = Cli::parse_from([
            "flatpak-compose",
            "-vv",
            "apply",
            "-f",
            "~/compose.yaml",
            "--current-state",
            "system",
            "--assumeyes",
        ]);
        assert_eq!(cli.verbose, 2);
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert!(args.assume_yes);
        assert!(!args.dry_run);
        assert_eq!(args.plan.current_state, StateMode::System);
        assert_eq!(args.plan.manifest.file.as_deref(), Some("~/compose.yaml"));
    }

    #[test]
    fn test_export_state() {
        let cli = Cli::parse_from([
            "flatpak-compose",
            "export-state",
            "system-compose",
            "--format",
            "json",
        ]);
        let Command::ExportState(args) = cli.command else {
            panic!("expected export-state");
        };
        assert_eq!(args.state, StateMode::SystemCompose);
        assert_eq!(args.format, ExportFormat::Json);
    }

    #[test]
    fn test_invalid_state_mode_rejected() {
        let args = ["flatpak-compose", "plan", "--current-state", "compose"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}
