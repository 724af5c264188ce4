//! proxyext configuration management
//!
//! Settings are read from `<workspace>/.proxyext/config.toml` when it exists and
//! overridden by `PROXYEXT_<SECTION>__<KEY>` environment variables.

pub mod error;
pub mod manager;
pub mod types;

pub use error::{ConfigError, Result};
pub use manager::{ConfigManager, CONFIG_FILE, ENV_PREFIX, WORKSPACE_DIR};
pub use types::{
    AppConfig, BuildConfig, ConfigManager as ConfigManagerTrait, ContainerConfig, ProxyConfig,
    RunnerConfig, ToolchainConfig,
};
