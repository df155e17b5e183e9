//! `export-state`

use anyhow::{Context as _, Result};
use reconcile::State;

use crate::cli::{ExportArgs, ExportFormat, StateMode};
use crate::commands::{current_state, load_manifest};
use crate::probe::FlatpakProbe;

/// Serialize a state in the requested format
pub fn to_string(state: &State, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Yaml => {
            serde_yaml::to_string(state).context("Failed to serialize state as YAML")
        }
        ExportFormat::Json => {
            serde_json::to_string_pretty(state).context("Failed to serialize state as JSON")
        }
    }
}

/// Print the system or system-compose state
pub fn run(args: &ExportArgs) -> Result<()> {
    let desired = match args.state {
        StateMode::System => State::default(),
        StateMode::SystemCompose => load_manifest(&args.manifest)?,
    };
    let system = FlatpakProbe::new()?.snapshot()?;
    let state = current_state(args.state, &desired, system);

    let output = to_string(&state, args.format)?;
    println!("{}", output.trim_end());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{Application, Environment, InstallationType};

    fn sample() -> State {
        State {
            environments: vec![
                Environment::new(InstallationType::User)
                    .with_remote("flathub", [("url", "https://dl.flathub.org/repo/")]),
            ],
            applications: vec![
                Application::new("org.gnome.Maps", "flathub", InstallationType::User)
                    .with_overrides(["--share=network"]),
            ],
        }
    }

    #[test]
    fn test_yaml_export_reads_back_as_a_manifest() {
        let yaml = to_string(&sample(), ExportFormat::Yaml).unwrap();
        assert!(yaml.contains("envs:"));
        assert!(yaml.contains("type: user"));
        let parsed = crate::manifest::parse(&yaml, crate::manifest::Format::Yaml).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_json_export() {
        let json = to_string(&sample(), ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["applications"][0]["name"], "org.gnome.Maps");
        assert_eq!(
            value["envs"][0]["remotes"]["flathub"]["url"],
            "https://dl.flathub.org/repo/"
        );
    }
}
