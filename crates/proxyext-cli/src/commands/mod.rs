// Command handlers for proxyext CLI

pub mod build;
pub mod clean;
pub mod run;

pub use build::BuildCommand;
pub use clean::CleanCommand;
pub use run::{RunCommand, RunOptions};
pub use test::TestCommand;

use std::path::Path;
use std::sync::Mutex;

use proxyext_config::{AppConfig, ConfigManager};
use proxyext_process::{
    ExternalCommand, ProcessError, ProcessRunner, ShutdownError, ShutdownNotification,
    ShutdownSignal, StdStreams,
};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use crate::error::CliResult;
use crate::logging::VerbosityLevel;
use crate::output;
use crate::workspace::Workspace;

/// Trait for command handlers
#[async_trait::async_trait]
pub trait Command: Send + Sync {
    /// Execute the command
    async fn execute(&self) -> CliResult<()>;
}

/// Subscription that outlives single runs and catches signals arriving between them
#[derive(Debug)]
struct InvocationShutdown {
    notification: ShutdownNotification,
    _unsubscribe: DropGuard,
}

/// Everything a command needs: the workspace, its configuration and the runner
/// every external tool is executed through.
///
/// Once the first command has run, a shutdown signal received between two
/// runs makes the next [`CommandContext::run`] fail without starting anything.
#[derive(Debug)]
pub struct CommandContext {
    workspace: Workspace,
    config: AppConfig,
    runner: ProcessRunner,
    shutdown: Mutex<Option<InvocationShutdown>>,
}

impl CommandContext {
    pub fn new(workspace: Workspace, config: AppConfig) -> Self {
        let runner = ProcessRunner::new().with_grace_period(config.runner.grace_period());
        Self {
            workspace,
            config,
            runner,
            shutdown: Mutex::new(None),
        }
    }

    /// Locate the workspace around `dir` (the current directory when `None`)
    /// and load its configuration
    pub fn load(dir: Option<&Path>) -> CliResult<Self> {
        let start = match dir {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir()?,
        };
        let workspace = Workspace::locate(start)?;
        let config = ConfigManager::for_workspace(workspace.root()).load()?;
        Ok(Self::new(workspace, config))
    }

    /// Replace the runner, keeping its own grace period and signal source
    pub fn with_runner(mut self, runner: ProcessRunner) -> Self {
        self.runner = runner;
        self.shutdown = Mutex::new(None);
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    /// Run `command` attached to the terminal
    pub async fn run(&self, command: ExternalCommand) -> CliResult<()> {
        if let Some(signal) = self.pending_shutdown() {
            debug!(command = %command, signal = %signal, "Not starting external command");
            return Err(ProcessError::from(ShutdownError::new(signal)).into());
        }

        info!(command = %command, "Running");
        if VerbosityLevel::Verbose.should_output() {
            output::print_command(&command.to_string());
        }
        let mut streams = StdStreams::inherit();
        self.runner.run(command, &mut streams).await?;
        Ok(())
    }

    /// Subscribe for the rest of the invocation on first use, then report a
    /// signal that arrived since
    fn pending_shutdown(&self) -> Option<ShutdownSignal> {
        let mut shutdown = self.shutdown.lock().unwrap_or_else(|e| e.into_inner());
        let watch = shutdown.get_or_insert_with(|| {
            let token = CancellationToken::new();
            InvocationShutdown {
                notification: self.runner.signals().setup_signal_handler(token.clone()),
                _unsubscribe: token.drop_guard(),
            }
        });
        watch.notification.try_recv()
    }
}
