// Build the extension and start the proxy with one of the workspace examples

use async_trait::async_trait;
use proxyext_process::ExternalCommand;
use tracing::debug;

use crate::commands::{BuildCommand, Command, CommandContext};
use crate::error::CliResult;
use crate::toolchain::ToolchainOverrides;
use crate::workspace::DEFAULT_EXAMPLE;

/// Options of `proxyext run`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Example whose `envoy.yaml` the proxy is started with
    pub example: String,
    /// Proxy binary; falls back to `proxy.binary` from configuration
    pub envoy_path: Option<String>,
    pub skip_build: bool,
    /// Extra arguments passed through to the proxy
    pub extra_args: Vec<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            example: DEFAULT_EXAMPLE.to_string(),
            envoy_path: None,
            skip_build: false,
            extra_args: vec![],
        }
    }
}

pub struct RunCommand {
    context: CommandContext,
    options: RunOptions,
}

impl RunCommand {
    pub fn new(context: CommandContext, options: RunOptions) -> Self {
        Self { context, options }
    }

    /// The proxy invocation for these options
    pub fn proxy_command(&self) -> CliResult<ExternalCommand> {
        let workspace = self.context.workspace();
        let config_path = workspace.existing_example_config(&self.options.example)?;
        let proxy = &self.context.config().proxy;
        let binary = self
            .options
            .envoy_path
            .clone()
            .unwrap_or_else(|| proxy.binary.clone());

        Ok(ExternalCommand::new(binary)
            .current_dir(workspace.root())
            .arg("-c")
            .arg(config_path.to_string_lossy())
            .args(&proxy.args)
            .args(&self.options.extra_args))
    }
}

#[async_trait]
impl Command for RunCommand {
    async fn execute(&self) -> CliResult<()> {
        // Fail on a missing example before spending time on a build
        let command = self.proxy_command()?;

        if self.options.skip_build {
            debug!("Skipping build");
        } else {
            BuildCommand::build(&self.context, ToolchainOverrides::default()).await?;
        }

        self.context.run(command).await
    }
}
