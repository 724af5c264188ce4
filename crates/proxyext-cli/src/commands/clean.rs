// Remove build artifacts

use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::error::CliResult;
use crate::toolchain::{BuiltinToolchain, ToolchainOverrides};

pub struct CleanCommand {
    context: CommandContext,
    overrides: ToolchainOverrides,
}

impl CleanCommand {
    pub fn new(context: CommandContext, overrides: ToolchainOverrides) -> Self {
        Self { context, overrides }
    }
}

#[async_trait]
impl Command for CleanCommand {
    async fn execute(&self) -> CliResult<()> {
        let toolchain = BuiltinToolchain::new(&self.context.config().toolchain, self.overrides.clone());
        self.context
            .run(toolchain.clean_command(self.context.workspace().root()))
            .await
    }
}
