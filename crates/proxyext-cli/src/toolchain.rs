//! Containerized build toolchain
//!
//! Extensions are built, tested and cleaned inside a builder image so the host
//! needs nothing but a container runtime. The workspace is bind-mounted at
//! `/source` and the container runs as the invoking user so files it writes
//! stay owned by them.

use std::path::Path;

use proxyext_config::ToolchainConfig;
use proxyext_process::ExternalCommand;

/// Mount point of the workspace inside the builder container
pub const CONTAINER_SOURCE_DIR: &str = "/source";

/// Overrides of the configured toolchain, usually taken from command-line flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainOverrides {
    pub image: Option<String>,
    pub options: Option<Vec<String>>,
    pub output_file: Option<String>,
}

/// Which toolchain operation to run inside the container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainAction {
    Build,
    Test,
    Clean,
}

/// The built-in, container-based toolchain
#[derive(Debug, Clone)]
pub struct BuiltinToolchain {
    docker_path: String,
    image: String,
    options: Vec<String>,
    output_file: String,
    user: String,
}

impl BuiltinToolchain {
    /// Toolchain from configuration with `overrides` applied on top
    pub fn new(config: &ToolchainConfig, overrides: ToolchainOverrides) -> Self {
        Self {
            docker_path: config.container.docker_path.clone(),
            image: overrides
                .image
                .unwrap_or_else(|| config.container.image.clone()),
            options: overrides
                .options
                .unwrap_or_else(|| config.container.options.clone()),
            output_file: overrides
                .output_file
                .unwrap_or_else(|| config.build.output_file.clone()),
            user: current_user(),
        }
    }

    /// Run the container as `user` (`uid:gid`) instead of the invoking user
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn output_file(&self) -> &str {
        &self.output_file
    }

    /// Command that performs `action` against the workspace rooted at `workspace`
    pub fn command(&self, action: ToolchainAction, workspace: &Path) -> ExternalCommand {
        let mount = format!("{}:{}", workspace.display(), CONTAINER_SOURCE_DIR);

        let mut cmd = ExternalCommand::new(&self.docker_path)
            .current_dir(workspace)
            .args(["run", "-u", self.user.as_str(), "--rm", "-t"])
            .args(["-v", mount.as_str(), "-w", CONTAINER_SOURCE_DIR, "--init"])
            .args(&self.options)
            .arg(&self.image);

        cmd = match action {
            ToolchainAction::Build => cmd.args(["build", "--output-file", self.output_file.as_str()]),
            ToolchainAction::Test => cmd.arg("test"),
            ToolchainAction::Clean => cmd.arg("clean"),
        };
        cmd
    }

    pub fn build_command(&self, workspace: &Path) -> ExternalCommand {
        self.command(ToolchainAction::Build, workspace)
    }

    pub fn test_command(&self, workspace: &Path) -> ExternalCommand {
        self.command(ToolchainAction::Test, workspace)
    }

    pub fn clean_command(&self, workspace: &Path) -> ExternalCommand {
        self.command(ToolchainAction::Clean, workspace)
    }
}

#[cfg(unix)]
fn current_user() -> String {
    format!("{}:{}", nix::unistd::getuid(), nix::unistd::getgid())
}

#[cfg(not(unix))]
fn current_user() -> String {
    "0:0".to_string()
}
