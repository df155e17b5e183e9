//! Parse override and metadata keyfiles into `flatpak override` flags.
//!
//! Both `flatpak override --show` and `flatpak info -M` print GLib keyfiles
//! sharing the `[Context]`, bus policy and `[Environment]` groups. The flags
//! produced here use the same spelling a user would pass on the command line,
//! so a manifest and a live snapshot can be compared directly.

/// Map a `[Context]` key and value to its flag.
fn context_flag(key: &str, value: &str) -> Option<String> {
    let (negative, value) = match value.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, value),
    };

    let name = match (key, negative) {
        ("shared", false) => "share",
        ("shared", true) => "unshare",
        ("sockets", false) => "socket",
        ("sockets", true) => "nosocket",
        ("devices", false) => "device",
        ("devices", true) => "nodevice",
        ("features", false) => "allow",
        ("features", true) => "disallow",
        ("filesystems", false) => "filesystem",
        ("filesystems", true) => "nofilesystem",
        ("persistent", false) => "persist",
        ("unset-environment", false) => "unset-env",
        _ => {
            log::trace!("Ignoring context entry {key}={value}");
            return None;
        }
    };
    Some(format!("--{name}={value}"))
}

/// Map a bus policy value to the flag prefix used on the command line.
fn policy_flag(policy: &str) -> &'static str {
    match policy {
        "own" => "own-name",
        "talk" => "talk-name",
        _ => "no-talk-name",
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Group {
    Context,
    SessionBus,
    SystemBus,
    Environment,
    Other,
}

impl Group {
    fn from_header(header: &str) -> Self {
        match header {
            "Context" => Self::Context,
            "Session Bus Policy" => Self::SessionBus,
            "System Bus Policy" => Self::SystemBus,
            "Environment" => Self::Environment,
            _ => Self::Other,
        }
    }
}

/// Convert keyfile text into override flags, in file order.
///
/// Unknown groups and keys are skipped; the parser never fails because
/// flatpak is the author of the text.
pub fn parse_override_flags(content: &str) -> Vec<String> {
    let mut flags = Vec::new();
    let mut group = Group::Other;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            group = Group::from_header(header.trim());
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());

        match group {
            Group::Context => {
                flags.extend(
                    value
                        .split(';')
                        .filter(|v| !v.is_empty())
                        .filter_map(|v| context_flag(key, v)),
                );
            }
            Group::SessionBus => flags.push(format!("--{}={key}", policy_flag(value))),
            Group::SystemBus => flags.push(format!("--system-{}={key}", policy_flag(value))),
            Group::Environment => flags.push(format!("--env={key}={value}")),
            Group::Other => {}
        }
    }

    flags
}
