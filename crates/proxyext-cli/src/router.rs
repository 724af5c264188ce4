// Command routing and dispatch

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::commands::*;
use crate::error::CliResult;
use crate::toolchain::ToolchainOverrides;
use crate::workspace::DEFAULT_EXAMPLE;

/// proxyext - build, test and run proxy WebAssembly extensions
#[derive(Parser, Debug)]
#[command(name = "proxyext")]
#[command(bin_name = "proxyext")]
#[command(about = "Build, test and run proxy WebAssembly extensions")]
#[command(
    long_about = "proxyext: build, test and run proxy WebAssembly extensions.\n\nBuilds happen inside a toolchain container; `proxyext run` starts the proxy with one of the workspace examples.\nCtrl-C stops the running tool gracefully, a second Ctrl-C exits immediately."
)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace directory (default: search upwards from the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub workspace_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimize output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Overrides of the toolchain container shared by the toolchain commands
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainArgs {
    /// Builder image to use instead of the configured one
    #[arg(long, value_name = "IMAGE")]
    pub toolchain_container_image: Option<String>,

    /// Extra `docker run` options, space-separated
    #[arg(long, value_name = "OPTIONS", allow_hyphen_values = true)]
    pub toolchain_container_options: Option<String>,
}

impl ToolchainArgs {
    pub fn overrides(&self) -> ToolchainOverrides {
        ToolchainOverrides {
            image: self.toolchain_container_image.clone(),
            options: self
                .toolchain_container_options
                .as_deref()
                .map(|opts| opts.split_whitespace().map(String::from).collect()),
            output_file: None,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build the extension
    #[command(about = "Build the extension into a WebAssembly module")]
    Build {
        /// Output file, relative to the workspace root
        #[arg(long, value_name = "PATH")]
        output_file: Option<String>,

        #[command(flatten)]
        toolchain: ToolchainArgs,
    },

    /// Run unit tests
    #[command(about = "Run the extension's unit tests")]
    Test {
        #[command(flatten)]
        toolchain: ToolchainArgs,
    },

    /// Clean build artifacts
    #[command(about = "Remove build artifacts")]
    Clean {
        #[command(flatten)]
        toolchain: ToolchainArgs,
    },

    /// Run the proxy with the extension
    #[command(about = "Build the extension and run the proxy with an example configuration")]
    Run {
        /// Example under .proxyext/examples/
        #[arg(long, default_value = DEFAULT_EXAMPLE, value_name = "NAME")]
        example: String,

        /// Proxy binary to run
        #[arg(long, value_name = "PATH")]
        envoy_path: Option<String>,

        /// Do not build before running
        #[arg(long)]
        skip_build: bool,

        /// Extra arguments for the proxy
        #[arg(last = true, value_name = "ARGS")]
        extra: Vec<String>,
    },
}

/// Command router
pub struct CommandRouter;

impl CommandRouter {
    /// Parse CLI arguments and route to appropriate handler
    pub async fn route() -> CliResult<()> {
        let cli = Cli::parse();

        // Initialize logging based on CLI flags
        crate::logging::init_logging(cli.verbose, cli.quiet);

        Self::execute(&cli).await
    }

    /// Execute a command
    pub async fn execute(cli: &Cli) -> CliResult<()> {
        let context = CommandContext::load(cli.workspace_dir.as_deref())?;
        Self::dispatch(&cli.command, context).await
    }

    /// Execute `command` within an already loaded `context`
    pub async fn dispatch(command: &Commands, context: CommandContext) -> CliResult<()> {
        match command {
            Commands::Build {
                output_file,
                toolchain,
            } => {
                let overrides = ToolchainOverrides {
                    output_file: output_file.clone(),
                    ..toolchain.overrides()
                };
                BuildCommand::new(context, overrides).execute().await
            }
            Commands::Test { toolchain } => {
                TestCommand::new(context, toolchain.overrides()).execute().await
            }
            Commands::Clean { toolchain } => {
                CleanCommand::new(context, toolchain.overrides()).execute().await
            }
            Commands::Run {
                example,
                envoy_path,
                skip_build,
                extra,
            } => {
                let options = RunOptions {
                    example: example.clone(),
                    envoy_path: envoy_path.clone(),
                    skip_build: *skip_build,
                    extra_args: extra.clone(),
                };
                RunCommand::new(context, options).execute().await
            }
        }
    }
}
