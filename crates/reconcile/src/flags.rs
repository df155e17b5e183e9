//! Static override flag vocabulary
//!
//! Flags use the command-line form accepted by `flatpak override`
//! (`--share=network`, `--nosocket=x11`, `--env=FOO=bar`, ...).
//! Every flag has a *subject* (what it controls) and a polarity.

/// Positive/negative spellings of the context flags that take a value
const CONTEXT_PAIRS: &[(&str, &str)] = &[
    ("share", "unshare"),
    ("socket", "nosocket"),
    ("device", "nodevice"),
    ("allow", "disallow"),
    ("filesystem", "nofilesystem"),
];

/// Bus policy flags, grouped by bus
const SESSION_BUS: &[&str] = &["own-name", "talk-name", "no-talk-name"];
const SYSTEM_BUS: &[&str] = &["system-own-name", "system-talk-name", "system-no-talk-name"];

/// Access modes a `--filesystem` value may end with
const FILESYSTEM_MODES: &[&str] = &["ro", "rw", "create"];

/// A filesystem value without its access mode: `home:ro` is `home`
fn filesystem_path(value: &str) -> &str {
    match value.rsplit_once(':') {
        Some((path, mode)) if FILESYSTEM_MODES.contains(&mode) => path,
        _ => value,
    }
}

/// Split `--name=value` into `(name, value)`
fn split(flag: &str) -> Option<(&str, &str)> {
    flag.strip_prefix("--")?.split_once('=')
}

/// The subject a flag controls: a stable `(kind, value)` pair shared by both polarities
///
/// `--share=network` and `--unshare=network` have the same subject, as do
/// `--env=FOO=1` and `--unset-env=FOO`.
pub fn subject(flag: &str) -> Option<(&'static str, String)> {
    if let Some(var) = flag.strip_prefix("--unset-env=") {
        return Some(("env", var.to_string()));
    }

    let (name, value) = split(flag)?;

    for (positive, negative) in CONTEXT_PAIRS {
        if name == *positive || name == *negative {
            let value = if *positive == "filesystem" {
                filesystem_path(value)
            } else {
                value
            };
            return Some((positive, value.to_string()));
        }
    }
    if SESSION_BUS.contains(&name) {
        return Some(("session-bus", value.to_string()));
    }
    if SYSTEM_BUS.contains(&name) {
        return Some(("system-bus", value.to_string()));
    }
    match name {
        "env" => {
            let var = value.split_once('=').map_or(value, |(k, _)| k);
            Some(("env", var.to_string()))
        }
        "persist" => Some(("persist", value.to_string())),
        _ => None,
    }
}

/// Whether the flag denies or removes what its subject controls
pub fn is_negative(flag: &str) -> bool {
    if flag.starts_with("--unset-env=") {
        return true;
    }
    match split(flag) {
        Some((name, _)) => {
            CONTEXT_PAIRS.iter().any(|(_, negative)| *negative == name)
                || name == "no-talk-name"
                || name == "system-no-talk-name"
        }
        None => false,
    }
}

/// The flag that undoes `flag`, if the override store can express one
///
/// `--persist` has no opposite; neither do unknown flags.
pub fn negate(flag: &str) -> Option<String> {
    if let Some(var) = flag.strip_prefix("--unset-env=") {
        // The previous value is gone; an empty assignment is the closest inverse
        return Some(format!("--env={var}="));
    }

    let (name, value) = split(flag)?;

    if name == "filesystem" {
        return Some(format!("--nofilesystem={}", filesystem_path(value)));
    }
    for (positive, negative) in CONTEXT_PAIRS {
        if name == *positive {
            return Some(format!("--{negative}={value}"));
        }
        if name == *negative {
            return Some(format!("--{positive}={value}"));
        }
    }

    let negated = match name {
        "own-name" | "talk-name" => "no-talk-name",
        "no-talk-name" => "talk-name",
        "system-own-name" | "system-talk-name" => "system-no-talk-name",
        "system-no-talk-name" => "system-talk-name",
        "env" => {
            let var = value.split_once('=').map_or(value, |(k, _)| k);
            return Some(format!("--unset-env={var}"));
        }
        _ => return None,
    };
    Some(format!("--{negated}={value}"))
}

/// Whether `flags` contains any flag controlling the same subject as `flag`
pub fn mentions_subject(flags: &[String], flag: &str) -> bool {
    match subject(flag) {
        Some(s) => flags.iter().any(|f| subject(f).as_ref() == Some(&s)),
        None => flags.iter().any(|f| f == flag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negate_context_flags() {
        assert_eq!(
            negate("--share=network").as_deref(),
            Some("--unshare=network")
        );
        assert_eq!(negate("--unshare=ipc").as_deref(), Some("--share=ipc"));
        assert_eq!(
            negate("--socket=wayland").as_deref(),
            Some("--nosocket=wayland")
        );
        assert_eq!(negate("--nodevice=dri").as_deref(), Some("--device=dri"));
        assert_eq!(
            negate("--allow=bluetooth").as_deref(),
            Some("--disallow=bluetooth")
        );
        assert_eq!(
            negate("--filesystem=~/Games").as_deref(),
            Some("--nofilesystem=~/Games")
        );
    }

    #[test]
    fn test_negate_filesystem_drops_access_mode() {
        assert_eq!(
            negate("--filesystem=xdg-download:ro").as_deref(),
            Some("--nofilesystem=xdg-download")
        );
        assert_eq!(
            negate("--filesystem=home:rw").as_deref(),
            Some("--nofilesystem=home")
        );
        assert_eq!(
            negate("--filesystem=/srv/data:create").as_deref(),
            Some("--nofilesystem=/srv/data")
        );
        // Only a known mode is stripped
        assert_eq!(
            negate("--filesystem=/mnt/a:b").as_deref(),
            Some("--nofilesystem=/mnt/a:b")
        );
        assert_eq!(
            subject("--filesystem=home:ro"),
            subject("--nofilesystem=home")
        );
    }

    #[test]
    fn test_negate_bus_and_env() {
        assert_eq!(
            negate("--talk-name=org.freedesktop.Notifications").as_deref(),
            Some("--no-talk-name=org.freedesktop.Notifications")
        );
        assert_eq!(
            negate("--own-name=org.app.Foo").as_deref(),
            Some("--no-talk-name=org.app.Foo")
        );
        assert_eq!(
            negate("--system-no-talk-name=org.freedesktop.login1").as_deref(),
            Some("--system-talk-name=org.freedesktop.login1")
        );
        assert_eq!(
            negate("--env=GTK_THEME=Adwaita").as_deref(),
            Some("--unset-env=GTK_THEME")
        );
    }

    #[test]
    fn test_negate_unsupported() {
        assert_eq!(negate("--persist=.mozilla"), None);
        assert_eq!(negate("--devel"), None);
        assert_eq!(negate("garbage"), None);
    }

    #[test]
    fn test_negation_is_involutive_for_context_flags() {
        for flag in ["--share=network", "--nosocket=x11", "--filesystem=home"] {
            let twice = negate(&negate(flag).unwrap()).unwrap();
            assert_eq!(twice, flag);
        }
    }

    #[test]
    fn test_subject_shared_by_both_polarities() {
        assert_eq!(subject("--share=network"), subject("--unshare=network"));
        assert_eq!(subject("--env=A=1"), subject("--unset-env=A"));
        assert_eq!(subject("--own-name=x"), subject("--no-talk-name=x"));
        assert_ne!(subject("--talk-name=x"), subject("--system-talk-name=x"));
        assert_eq!(subject("--devel"), None);
    }

    #[test]
    fn test_is_negative() {
        assert!(is_negative("--unshare=network"));
        assert!(is_negative("--nofilesystem=home"));
        assert!(is_negative("--no-talk-name=x"));
        assert!(is_negative("--unset-env=A"));
        assert!(!is_negative("--share=network"));
        assert!(!is_negative("--persist=.cache"));
    }

    #[test]
    fn test_mentions_subject() {
        let flags = vec!["--socket=x11".to_string(), "--env=A=1".to_string()];
        assert!(mentions_subject(&flags, "--nosocket=x11"));
        assert!(mentions_subject(&flags, "--unset-env=A"));
        assert!(!mentions_subject(&flags, "--unshare=network"));
    }
}
