//! Core configuration types and data structures

use serde::{Deserialize, Serialize};

/// Main workspace configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    /// External command supervision
    pub runner: RunnerConfig,
    /// Containerized build toolchain
    pub toolchain: ToolchainConfig,
    /// Proxy used by `run`
    pub proxy: ProxyConfig,
}

/// Settings for supervising external commands
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Seconds an external command gets to exit after SIGTERM before SIGKILL
    pub grace_period_secs: u64,
}

/// Builtin toolchain configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ToolchainConfig {
    pub container: ContainerConfig,
    pub build: BuildConfig,
}

/// How the toolchain container is launched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContainerConfig {
    /// Builder image
    pub image: String,
    /// Path to the docker CLI
    pub docker_path: String,
    /// Extra `docker run` options, inserted before the image
    pub options: Vec<String>,
}

/// Build step settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BuildConfig {
    /// Output path of the compiled extension, relative to the workspace
    pub output_file: String,
}

/// Proxy binary settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Proxy binary, a path or a name looked up on `PATH`
    pub binary: String,
    /// Extra arguments appended after `-c <config>`
    pub args: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 60,
        }
    }
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            image: "docker.io/proxyext/rust-builder:latest".to_string(),
            docker_path: "docker".to_string(),
            options: vec![],
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output_file: "target/proxyext/extension.wasm".to_string(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            binary: "envoy".to_string(),
            args: vec![],
        }
    }
}

impl RunnerConfig {
    pub fn grace_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.grace_period_secs)
    }
}

/// Configuration manager trait
pub trait ConfigManager {
    /// Load configuration
    fn load_config(&mut self) -> Result<AppConfig, crate::error::ConfigError>;
    /// Save configuration
    fn save_config(&self, config: &AppConfig) -> Result<(), crate::error::ConfigError>;
    /// Validate configuration
    fn validate_config(&self, config: &AppConfig) -> Result<(), crate::error::ConfigError>;
}
