//! Custom error types for the welcome center

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors raised by background operations
#[derive(Debug)]
pub enum WelcomeError {
    /// IO-related errors with context
    Io(io::Error, String),

    /// Command ran but exited unsuccessfully (command, output or exit status)
    CommandFailed(String, String),

    /// Command could not be started at all
    SpawnFailed(String, io::Error),

    /// The package manager lock file is present
    PackageLocked(PathBuf),

    /// The same operation is already in flight
    AlreadyRunning(String),

    /// Invalid argument (helper CLI, mode names)
    InvalidArgument(String),

    /// Generic errors with context
    Generic(String),
}

impl fmt::Display for WelcomeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WelcomeError::Io(err, context) => write!(f, "IO Error: {} - {}", context, err),
            WelcomeError::CommandFailed(cmd, output) => {
                write!(f, "Command failed: {} - {}", cmd, output)
            }
            WelcomeError::SpawnFailed(cmd, err) => write!(f, "Failed to start {}: {}", cmd, err),
            WelcomeError::PackageLocked(path) => write!(
                f,
                "Pacman lockfile found {}, is another pacman process running?",
                path.display()
            ),
            WelcomeError::AlreadyRunning(what) => write!(f, "{} is already running", what),
            WelcomeError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            WelcomeError::Generic(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for WelcomeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WelcomeError::Io(err, _) => Some(err),
            WelcomeError::SpawnFailed(_, err) => Some(err),
            _ => None,
        }
    }
}

/// Result type alias for convenience
pub type WelcomeResult<T> = Result<T, WelcomeError>;

/// Helper trait for converting IO errors with context
pub trait IoResultExt<T> {
    fn with_context(self, context: impl Into<String>) -> WelcomeResult<T>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn with_context(self, context: impl Into<String>) -> WelcomeResult<T> {
        self.map_err(|e| WelcomeError::Io(e, context.into()))
    }
}

impl From<io::Error> for WelcomeError {
    fn from(err: io::Error) -> Self {
        WelcomeError::Io(err, "IO operation failed".to_string())
    }
}

impl From<anyhow::Error> for WelcomeError {
    fn from(err: anyhow::Error) -> Self {
        WelcomeError::Generic(err.to_string())
    }
}

impl WelcomeError {
    pub fn command_failed(command: &str, output: &str) -> Self {
        WelcomeError::CommandFailed(command.to_string(), output.to_string())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        WelcomeError::InvalidArgument(msg.into())
    }

    pub fn generic(msg: impl Into<String>) -> Self {
        WelcomeError::Generic(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_message_names_the_path() {
        let err = WelcomeError::PackageLocked(PathBuf::from("/var/lib/pacman/db.lck"));
        assert_eq!(
            err.to_string(),
            "Pacman lockfile found /var/lib/pacman/db.lck, is another pacman process running?"
        );
    }

    #[test]
    fn io_context_is_kept_as_source() {
        let res: Result<(), io::Error> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = res.with_context("reading settings").unwrap_err();
        assert!(err.to_string().contains("reading settings"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
