//! Compose manifest loading
//!
//! The manifest is the desired [`State`]. YAML is the native format; TOML and
//! JSON are accepted by extension. Defaults are filled in and identity
//! invariants checked before anything is compared.

use anyhow::{Context, Result, bail};
use reconcile::State;
use std::fmt;
use std::path::Path;

/// Serialization format of a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Toml,
    Json,
}

impl Format {
    /// Detect the format from the file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yaml => "YAML",
            Self::Toml => "TOML",
            Self::Json => "JSON",
        })
    }
}

/// Deserialize a manifest without validating it
pub fn parse(content: &str, format: Format) -> Result<State> {
    let state = match format {
        Format::Yaml => {
            if content.trim().is_empty() {
                State::default()
            } else {
                serde_yaml::from_str(content)?
            }
        }
        Format::Toml => toml::from_str(content)?,
        Format::Json => serde_json::from_str(content)?,
    };
    Ok(state)
}

/// Load, default and validate a manifest
///
/// Applications whose repository does not resolve are kept; they are
/// reported here and skipped by the engine.
pub fn load(path: &Path) -> Result<State> {
    let Some(format) = Format::from_path(path) else {
        bail!(
            "Unsupported compose file extension: {} (expected .yaml, .yml, .toml or .json)",
            path.display()
        );
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| {
            format!("Could not read compose file: {}", path.display())
        })?;
    let mut state = parse(&content, format)
        .with_context(|| format!("Invalid {format} in {}", path.display()))?;

    state
        .apply_defaults()
        .with_context(|| format!("Invalid compose file {}", path.display()))?;
    state
        .validate()
        .with_context(|| format!("Invalid compose file {}", path.display()))?;

    for app in state.unresolved_applications() {
        log::warn!(
            "{} names remote '{}' which is not declared for the {} installation",
            app.name,
            app.repo,
            app.installation_type
        );
    }

    log::debug!(
        "Loaded {} environment(s) and {} application(s) from {}",
        state.environments.len(),
        state.applications.len(),
        path.display()
    );
    Ok(state)
}
