// proxyext CLI Library

pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
pub mod router;
pub mod toolchain;
pub mod workspace;

pub use commands::{Command, CommandContext};
pub use error::{render_error, CliError, CliResult};
pub use logging::{init_logging, VerbosityLevel};
pub use router::{Cli, CommandRouter, Commands};
pub use toolchain::{BuiltinToolchain, ToolchainOverrides};
pub use workspace::Workspace;
