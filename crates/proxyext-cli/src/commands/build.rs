// Build the extension with the containerized toolchain

use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::error::CliResult;
use crate::logging::VerbosityLevel;
use crate::output;
use crate::toolchain::{BuiltinToolchain, ToolchainOverrides};

/// Build the extension into a `.wasm` module
pub struct BuildCommand {
    context: CommandContext,
    overrides: ToolchainOverrides,
}

impl BuildCommand {
    pub fn new(context: CommandContext, overrides: ToolchainOverrides) -> Self {
        Self { context, overrides }
    }

    pub(crate) async fn build(context: &CommandContext, overrides: ToolchainOverrides) -> CliResult<()> {
        let toolchain = BuiltinToolchain::new(&context.config().toolchain, overrides);
        let command = toolchain.build_command(context.workspace().root());
        context.run(command).await?;

        if VerbosityLevel::Normal.should_output() {
            output::print_success(&format!("Built {}", toolchain.output_file()));
        }
        Ok(())
    }
}

#[async_trait]
impl Command for BuildCommand {
    async fn execute(&self) -> CliResult<()> {
        Self::build(&self.context, self.overrides.clone()).await
    }
}
