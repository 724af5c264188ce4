//! Configuration manager implementation

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use tracing::debug;

use crate::{
    error::{ConfigError, Result},
    types::{AppConfig, ConfigManager as ConfigManagerTrait},
};

/// Directory inside a workspace holding proxyext metadata
pub const WORKSPACE_DIR: &str = ".proxyext";

/// Configuration file name inside [`WORKSPACE_DIR`]
pub const CONFIG_FILE: &str = "config.toml";

/// Prefix of environment overrides, e.g. `PROXYEXT_RUNNER__GRACE_PERIOD_SECS`
pub const ENV_PREFIX: &str = "PROXYEXT";

/// Keys whose environment overrides are space-separated lists
const LIST_KEYS: [&str; 2] = ["toolchain.container.options", "proxy.args"];

/// Configuration manager
pub struct ConfigManager {
    /// Configuration file path
    config_path: PathBuf,
    /// Environment prefix
    env_prefix: String,
    /// Replaces the process environment when set
    env_overrides: Option<HashMap<String, String>>,
}

impl ConfigManager {
    /// Manager for the configuration of the workspace rooted at `root`
    pub fn for_workspace(root: impl AsRef<Path>) -> Self {
        Self::with_path(root.as_ref().join(WORKSPACE_DIR).join(CONFIG_FILE))
    }

    /// Create with custom config path
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            config_path: path,
            env_prefix: ENV_PREFIX.to_string(),
            env_overrides: None,
        }
    }

    /// Read overrides from `vars` instead of the process environment
    pub fn with_env_overrides(mut self, vars: HashMap<String, String>) -> Self {
        self.env_overrides = Some(vars);
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn environment(&self) -> Environment {
        let mut env = Environment::with_prefix(&self.env_prefix)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(" ")
            .source(self.env_overrides.clone());
        for key in LIST_KEYS {
            env = env.with_list_parse_key(key);
        }
        env
    }

    /// Load and validate in one step
    pub fn load(&mut self) -> Result<AppConfig> {
        let config = self.load_config()?;
        self.validate_config(&config)?;
        Ok(config)
    }
}

impl ConfigManagerTrait for ConfigManager {
    fn load_config(&mut self) -> Result<AppConfig> {
        debug!(path = %self.config_path.display(), "Loading configuration");

        let builder = Config::builder()
            .add_source(
                File::from(self.config_path.clone())
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(self.environment());

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;
        Ok(app_config)
    }

    fn save_config(&self, config: &AppConfig) -> Result<()> {
        let toml = toml::to_string(config)?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.config_path, toml)?;
        Ok(())
    }

    fn validate_config(&self, config: &AppConfig) -> Result<()> {
        if config.runner.grace_period_secs == 0 {
            return Err(ConfigError::Validation(
                "runner.grace_period_secs must be greater than 0".to_string(),
            ));
        }

        let required = [
            ("toolchain.container.image", &config.toolchain.container.image),
            ("toolchain.container.docker_path", &config.toolchain.container.docker_path),
            ("toolchain.build.output_file", &config.toolchain.build.output_file),
            ("proxy.binary", &config.proxy.binary),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{} must not be empty", key)));
            }
        }
        Ok(())
    }
}
