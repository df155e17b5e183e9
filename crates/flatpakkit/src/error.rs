//! Error types for Flatpak operations.
//!
//! Errors are categorized from the command's stderr so callers can tell a
//! missing application from a network problem or a permission issue.

use std::path::PathBuf;
use thiserror::Error;

/// Categories of Flatpak errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network-related errors (connection, DNS, TLS)
    Network,
    /// Application, runtime or remote not found
    NotFound,
    /// Already installed
    AlreadyInstalled,
    /// Not installed (uninstall or inspect of something absent)
    NotInstalled,
    /// Permission denied (system installation without polkit/root)
    Permission,
    /// The `flatpak` executable is missing
    FlatpakNotFound,
    /// Malformed local data (repo config, command output)
    Parse,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error can be safely ignored (operation already done).
    pub fn is_ignorable(&self) -> bool {
        matches!(self, Self::AlreadyInstalled | Self::NotInstalled)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::NotFound => "Not found",
            Self::AlreadyInstalled => "Already installed",
            Self::NotInstalled => "Not installed",
            Self::Permission => "Permission denied",
            Self::FlatpakNotFound => "Flatpak not installed",
            Self::Parse => "Malformed data",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your internet connection and try again",
            Self::NotFound => "Verify the application id and that its remote is configured",
            Self::AlreadyInstalled => "No action needed - already installed",
            Self::NotInstalled => "No action needed - not installed",
            Self::Permission => "System installations need root or a polkit agent",
            Self::FlatpakNotFound => "Install flatpak from your distribution's packages",
            Self::Parse => "Inspect the reported file or output for syntax errors",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur during Flatpak operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network-related error (connection, timeout, DNS, etc.)
    #[error("network error: {message}")]
    Network {
        /// Detailed error message
        message: String,
    },

    /// Application, runtime or remote not found
    #[error("not found: {name}")]
    NotFound {
        /// What could not be found
        name: String,
    },

    /// Already installed
    #[error("already installed: {name}")]
    AlreadyInstalled {
        /// Name of the already-installed ref
        name: String,
    },

    /// Not installed
    #[error("not installed: {name}")]
    NotInstalled {
        /// Name of the missing ref
        name: String,
    },

    /// Permission denied
    #[error("permission denied: {message}")]
    Permission {
        /// Details about what permission was denied
        message: String,
    },

    /// `flatpak` is not installed or not found in PATH
    #[error("flatpak not found in PATH")]
    FlatpakNotFound,

    /// Invalid line in an ostree repo config
    #[error("malformed line {line} in {}: {message}", path.display())]
    RepoConfigParse {
        /// Config file
        path: PathBuf,
        /// Line number (1-indexed)
        line: usize,
        /// Description of the syntax error
        message: String,
    },

    /// Unexpected command output
    #[error("unexpected output from {command}: {message}")]
    Output {
        /// Command that produced the output
        command: String,
        /// What was wrong with it
        message: String,
    },

    /// Command execution failed
    #[error("command failed: {message}")]
    CommandFailed {
        /// Description of what command failed
        message: String,
        /// Standard error output from the failed command
        stderr: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Network { .. } => ErrorCategory::Network,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::AlreadyInstalled { .. } => ErrorCategory::AlreadyInstalled,
            Error::NotInstalled { .. } => ErrorCategory::NotInstalled,
            Error::Permission { .. } => ErrorCategory::Permission,
            Error::FlatpakNotFound => ErrorCategory::FlatpakNotFound,
            Error::RepoConfigParse { .. } | Error::Output { .. } => ErrorCategory::Parse,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether this error can be safely ignored.
    pub fn is_ignorable(&self) -> bool {
        self.category().is_ignorable()
    }

    /// Create an error from flatpak command output.
    ///
    /// Analyzes stderr to categorize the error appropriately.
    pub fn from_flatpak_output(stderr: &str, subject: Option<&str>) -> Self {
        let stderr_lower = stderr.to_lowercase();
        let name = || subject.unwrap_or("unknown").to_string();

        // Network errors
        if stderr_lower.contains("could not resolve")
            || stderr_lower.contains("couldn't resolve")
            || stderr_lower.contains("connection refused")
            || stderr_lower.contains("timed out")
            || stderr_lower.contains("while fetching")
            || stderr_lower.contains("unable to connect")
            || stderr_lower.contains("ssl")
            || stderr_lower.contains("certificate")
        {
            return Error::Network {
                message: stderr.trim().to_string(),
            };
        }

        if stderr_lower.contains("already installed") {
            return Error::AlreadyInstalled { name: name() };
        }

        if stderr_lower.contains("not installed") {
            return Error::NotInstalled { name: name() };
        }

        if stderr_lower.contains("nothing matches")
            || stderr_lower.contains("no remote refs found")
            || stderr_lower.contains("not found")
            || stderr_lower.contains("no such remote")
            || stderr_lower.contains("can't find ref")
        {
            return Error::NotFound { name: name() };
        }

        if stderr_lower.contains("permission denied")
            || stderr_lower.contains("not allowed")
            || stderr_lower.contains("operation not permitted")
            || stderr_lower.contains("authentication")
        {
            return Error::Permission {
                message: stderr.trim().to_string(),
            };
        }

        Error::CommandFailed {
            message: format!(
                "flatpak command failed{}",
                subject.map(|n| format!(" for {n}")).unwrap_or_default()
            ),
            stderr: stderr.trim().to_string(),
        }
    }
}

/// Result type for Flatpak operations.
pub type Result<T> = std::result::Result<T, Error>;
