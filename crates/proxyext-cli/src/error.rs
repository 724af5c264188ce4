// CLI errors and the top-level error renderer

use proxyext_config::ConfigError;
use proxyext_process::{ProcessError, ShutdownError, ShutdownSignal};
use thiserror::Error;

use crate::output::OutputStyle;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl CliError {
    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            CliError::InvalidArgument { message } => {
                format!("Invalid argument: {}", message)
            }
            CliError::Io(e) => {
                format!("File operation failed: {}", e)
            }
            CliError::Config(e) => {
                format!("{}\n\nCheck .proxyext/config.toml and PROXYEXT_* environment variables.", e)
            }
            CliError::Workspace(msg) => {
                format!("{}\n\nRun proxyext from inside an extension workspace or pass --workspace-dir.", msg)
            }
            CliError::Process(e) => e.to_string(),
        }
    }

    /// The shutdown that aborted the command, if that is what happened
    pub fn shutdown(&self) -> Option<&ShutdownError> {
        match self {
            CliError::Process(e) => e.as_shutdown(),
            _ => None,
        }
    }

    /// Get technical details for verbose mode
    pub fn technical_details(&self) -> String {
        format!("{:?}", self)
    }
}

pub type CliResult<T> = Result<T, CliError>;

/// How a shutdown signal is described to the user
fn describe_signal(signal: ShutdownSignal) -> String {
    match signal {
        ShutdownSignal::Interrupt => format!("a Ctrl-C (\"{}\")", signal),
        ShutdownSignal::Terminate => format!("a termination signal (\"{}\")", signal),
    }
}

/// Render an error for the terminal.
///
/// A shutdown is an expected, user-initiated outcome and gets a `NOTE:` line;
/// everything else is an `Error:` followed by a usage hint.
pub fn render_error(error: &CliError, style: &OutputStyle) -> String {
    if let Some(shutdown) = error.shutdown() {
        return style.note(&format!(
            "Shutting down early because {} was received.",
            describe_signal(shutdown.signal())
        ));
    }

    format!(
        "{}\n\n{}",
        style.error(&error.user_message()),
        "Run 'proxyext --help' for usage."
    )
}
