//! Error types for external command execution

use std::fmt;
use std::io;
use std::process::ExitStatus;

use thiserror::Error;

use crate::signals::ShutdownSignal;

/// Why an external command failed
#[derive(Debug, Error)]
pub enum RunFailure {
    /// The program could not be spawned (missing binary, permission denied)
    #[error("{0}")]
    Start(#[source] io::Error),

    /// Waiting on the running program failed at the OS level
    #[error("{0}")]
    Wait(#[source] io::Error),

    /// The program ran and exited unsuccessfully
    #[error("{}", DisplayStatus(.0))]
    Exit(ExitStatus),

    /// Copying the program's standard streams failed
    #[error("{0}")]
    Io(#[source] io::Error),
}

/// An external command could not be started or did not succeed
#[derive(Debug, Error)]
#[error("failed to execute an external command \"{command}\": {cause}")]
pub struct RunError {
    command: String,
    #[source]
    cause: RunFailure,
}

impl RunError {
    pub fn new(command: impl Into<String>, cause: RunFailure) -> Self {
        Self {
            command: command.into(),
            cause,
        }
    }

    /// The command line as it was executed
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn cause(&self) -> &RunFailure {
        &self.cause
    }

    /// Exit code of the program, when it exited on its own with one
    pub fn exit_code(&self) -> Option<i32> {
        match &self.cause {
            RunFailure::Exit(status) => status.code(),
            _ => None,
        }
    }
}

/// The operation was aborted because the host process is shutting down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("shutdown due to {signal}")]
pub struct ShutdownError {
    signal: ShutdownSignal,
}

impl ShutdownError {
    pub fn new(signal: ShutdownSignal) -> Self {
        Self { signal }
    }

    /// The signal that triggered the shutdown
    pub fn signal(&self) -> ShutdownSignal {
        self.signal
    }
}

/// Errors returned by [`ProcessRunner::run`](crate::ProcessRunner::run)
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

impl ProcessError {
    /// Whether the command was aborted by a shutdown signal rather than failing
    pub fn is_shutdown(&self) -> bool {
        matches!(self, ProcessError::Shutdown(_))
    }

    pub fn as_shutdown(&self) -> Option<&ShutdownError> {
        match self {
            ProcessError::Shutdown(e) => Some(e),
            ProcessError::Run(_) => None,
        }
    }

    pub fn as_run(&self) -> Option<&RunError> {
        match self {
            ProcessError::Run(e) => Some(e),
            ProcessError::Shutdown(_) => None,
        }
    }
}

/// Result type for process operations
pub type Result<T> = std::result::Result<T, ProcessError>;

/// Renders an exit status as `exit status N` or `signal: NAME`.
struct DisplayStatus<'a>(&'a ExitStatus);

impl fmt::Display for DisplayStatus<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.0.code() {
            return write!(f, "exit status {}", code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;

            if let Some(raw) = self.0.signal() {
                return match nix::sys::signal::Signal::try_from(raw) {
                    Ok(signal) => write!(f, "signal: {}", signal.as_str()),
                    Err(_) => write!(f, "signal: {}", raw),
                };
            }
        }

        write!(f, "{}", self.0)
    }
}
