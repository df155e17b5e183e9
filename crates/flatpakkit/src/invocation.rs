//! A single external command, described but not run.

use serde::Serialize;
use std::fmt;
use std::process::Command;

/// Program plus arguments.
///
/// Displays as a shell-quoted command line, suitable for printing in a plan
/// or pasting into a terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    /// Executable name or path
    pub program: String,
    /// Arguments, unquoted
    pub args: Vec<String>,
}

impl Invocation {
    /// Create an invocation with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Start a `flatpak` invocation.
    pub fn flatpak() -> Self {
        Self::new("flatpak")
    }

    /// Start an `ostree` invocation.
    pub fn ostree() -> Self {
        Self::new("ostree")
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build a [`Command`] ready to spawn.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-_./:=,+@%".contains(c)
}

/// Quote a word for POSIX sh when it contains anything but safe characters.
fn quote(word: &str) -> String {
    let safe = !word.is_empty() && word.chars().all(is_safe);
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_plain() {
        let inv = Invocation::flatpak()
            .arg("install")
            .arg("--system")
            .args(["flathub", "org.gnome.Maps//stable"]);
        assert_eq!(
            inv.to_string(),
            "flatpak install --system flathub org.gnome.Maps//stable"
        );
    }

    #[test]
    fn test_display_quotes_special_words() {
        let inv = Invocation::ostree()
            .arg("config")
            .arg("set")
            .arg(r#"remote "flathub".xa.title"#)
            .arg("Flathub Apps")
            .arg("it's");
        assert_eq!(
            inv.to_string(),
            r#"ostree config set 'remote "flathub".xa.title' 'Flathub Apps' 'it'\''s'"#
        );
    }

    #[test]
    fn test_empty_argument_is_quoted() {
        assert_eq!(Invocation::new("echo").arg("").to_string(), "echo ''");
    }
}
