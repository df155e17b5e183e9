//! Read ostree repo `config` files.
//!
//! Every Flatpak installation keeps its remotes in `<dir>/repo/config`:
//!
//! ```text
//! [core]
//! repo_version=1
//! mode=bare-user-only
//!
//! [remote "flathub"]
//! url=https://dl.flathub.org/repo/
//! xa.title=Flathub
//! gpg-verify=true
//! ```
//!
//! The imported GPG keyring of a remote lives next to it as
//! `<remote>.trustedkeys.gpg` and is reported base64-encoded under the
//! [`GPG_KEY_ATTRIBUTE`] attribute.

use crate::error::{Error, Result};
use crate::types::{RemoteConfig, RepoConfig};
use base64::Engine as _;
use std::fs;
use std::path::Path;

/// Attribute carrying a remote's base64-encoded trusted keyring
pub const GPG_KEY_ATTRIBUTE: &str = "GPGKey";

enum Section {
    None,
    Core,
    Remote(String),
    Other,
}

/// Parse config text. `path` is only used for error messages.
pub fn parse(content: &str, path: &Path) -> Result<RepoConfig> {
    let mut config = RepoConfig::default();
    let mut section = Section::None;

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            section = parse_header(header.trim());
            if let Section::Remote(name) = &section {
                config.remotes.entry(name.clone()).or_default();
            }
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(Error::RepoConfigParse {
                path: path.to_path_buf(),
                line: index + 1,
                message: format!("expected key=value, found '{line}'"),
            });
        };
        let (key, value) = (key.trim().to_string(), value.trim().to_string());

        match &section {
            Section::Core => {
                config.core.insert(key, value);
            }
            Section::Remote(name) => {
                config
                    .remotes
                    .entry(name.clone())
                    .or_default()
                    .insert(key, value);
            }
            Section::None => {
                return Err(Error::RepoConfigParse {
                    path: path.to_path_buf(),
                    line: index + 1,
                    message: "key outside of any section".to_string(),
                });
            }
            Section::Other => {}
        }
    }

    Ok(config)
}

fn parse_header(header: &str) -> Section {
    if header == "core" {
        return Section::Core;
    }
    match header.split_once(' ') {
        Some(("remote", name)) => Section::Remote(name.trim().trim_matches('"').to_string()),
        _ => Section::Other,
    }
}

/// Read `<repo_dir>/config` and attach each remote's GPG keyring.
///
/// A missing repo directory (installation never used) yields an empty config.
/// A remote without a keyring file gets an empty [`GPG_KEY_ATTRIBUTE`].
pub fn read(repo_dir: &Path) -> Result<RepoConfig> {
    let path = repo_dir.join("config");
    if !path.exists() {
        log::debug!("No repo config at {}", path.display());
        return Ok(RepoConfig::default());
    }

    let content = fs::read_to_string(&path)?;
    let mut config = parse(&content, &path)?;
    for (name, remote) in &mut config.remotes {
        attach_gpg_key(repo_dir, name, remote)?;
    }
    Ok(config)
}

fn attach_gpg_key(repo_dir: &Path, name: &str, remote: &mut RemoteConfig) -> Result<()> {
    let keyring = repo_dir.join(format!("{name}.trustedkeys.gpg"));
    let encoded = if keyring.exists() {
        base64::engine::general_purpose::STANDARD.encode(fs::read(&keyring)?)
    } else {
        String::new()
    };
    remote.insert(GPG_KEY_ATTRIBUTE.to_string(), encoded);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[core]
repo_version=1
mode=bare-user-only
min-free-space-size=500MB
xa.languages=en;de

[remote "flathub"]
url=https://dl.flathub.org/repo/
xa.title=Flathub
gpg-verify=true
gpg-verify-summary=true

[remote "gnome-nightly"]
url = https://nightly.gnome.org/repo/
xa.title=GNOME Nightly
"#;

    #[test]
    fn test_parse_sections() {
        let config = parse(SAMPLE, Path::new("config")).unwrap();
        assert_eq!(config.core["mode"], "bare-user-only");
        assert_eq!(config.core["xa.languages"], "en;de");
        assert_eq!(config.remotes.len(), 2);
        assert_eq!(config.remotes["flathub"]["gpg-verify"], "true");
        assert_eq!(
            config.remotes["gnome-nightly"]["url"],
            "https://nightly.gnome.org/repo/"
        );
    }

    #[test]
    fn test_parse_malformed_line() {
        let content = "[core]\nrepo_version=1\nthis is broken\n";
        let err = parse(content, Path::new("/x/config")).unwrap_err();
        match err {
            Error::RepoConfigParse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_ignores_unknown_sections() {
        let content = "[remote-collection x]\nfoo=bar\n[core]\nmode=bare\n";
        let config = parse(content, Path::new("c")).unwrap();
        assert_eq!(config.core.len(), 1);
        assert!(config.remotes.is_empty());
    }

    #[test]
    fn test_read_missing_repo_is_empty() {
        let dir = TempDir::new().unwrap();
        let config = read(&dir.path().join("repo")).unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_read_attaches_gpg_keys() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config"), SAMPLE).unwrap();
        fs::write(dir.path().join("flathub.trustedkeys.gpg"), b"key").unwrap();

        let config = read(dir.path()).unwrap();
        assert_eq!(config.remotes["flathub"][GPG_KEY_ATTRIBUTE], "a2V5");
        assert_eq!(config.remotes["gnome-nightly"][GPG_KEY_ATTRIBUTE], "");
    }
}
