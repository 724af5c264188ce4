//! # proxyext-process
//!
//! **Purpose**: Supervision of external commands (containerized toolchains, the proxy binary)
//! for the proxyext CLI
//!
//! ## Features
//!
//! - **Stream Binding**: Inherit, discard, or pump a child's stdin/stdout/stderr through
//!   caller-provided async readers and writers
//! - **Signal Coordination**: One-shot shutdown notification on SIGINT/SIGTERM, with a forced
//!   exit of the host process on a second signal
//! - **Graceful Shutdown**: SIGTERM→SIGKILL escalation with an injectable grace period
//! - **Die With Parent**: Children receive SIGTERM if the host dies unexpectedly (Linux)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use proxyext_process::{ExternalCommand, ProcessRunner, StdStreams};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runner = ProcessRunner::new();
//! let command = ExternalCommand::new("docker").args(["run", "--rm", "builder", "build"]);
//!
//! match runner.run(command, &mut StdStreams::inherit()).await {
//!     Ok(()) => println!("done"),
//!     Err(e) if e.is_shutdown() => println!("interrupted: {}", e),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod error;
pub mod platform;
pub mod runner;
pub mod signals;
pub mod stdio;

pub use command::ExternalCommand;
pub use error::{ProcessError, Result, RunError, RunFailure, ShutdownError};
pub use platform::{NativePlatform, Platform};
pub use runner::{ProcessRunner, RunState, Termination, DEFAULT_GRACE_PERIOD};
pub use signals::{
    ManualSignals, OsSignals, ShutdownNotification, ShutdownSignal, SignalCoordinator,
    SignalSource, SignalStream, FORCED_EXIT_CODE,
};
pub use stdio::{Input, Output, StdStreams};
