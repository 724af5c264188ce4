//! Extension workspace discovery

use std::path::{Path, PathBuf};

use proxyext_config::WORKSPACE_DIR;
use tracing::debug;

use crate::error::{CliError, CliResult};

/// Default example name used by `proxyext run`
pub const DEFAULT_EXAMPLE: &str = "default";

/// File name of an example's proxy configuration
const EXAMPLE_CONFIG: &str = "envoy.yaml";

/// An extension workspace: a directory tree with a `.proxyext/` directory at its root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Find the workspace enclosing `dir` by walking up its ancestors
    pub fn locate(dir: impl AsRef<Path>) -> CliResult<Self> {
        let start = dir.as_ref();
        let start = if start.is_absolute() {
            start.to_path_buf()
        } else {
            std::env::current_dir()?.join(start)
        };

        for candidate in start.ancestors() {
            if candidate.join(WORKSPACE_DIR).is_dir() {
                debug!(root = %candidate.display(), "Found workspace");
                return Ok(Self {
                    root: candidate.to_path_buf(),
                });
            }
        }

        Err(CliError::Workspace(format!(
            "no {} directory found in {} or any parent directory",
            WORKSPACE_DIR,
            start.display()
        )))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the proxy configuration for the example `name`
    pub fn example_config(&self, name: &str) -> PathBuf {
        self.root
            .join(WORKSPACE_DIR)
            .join("examples")
            .join(name)
            .join(EXAMPLE_CONFIG)
    }

    /// Like [`Workspace::example_config`] but fails when the file is missing
    pub fn existing_example_config(&self, name: &str) -> CliResult<PathBuf> {
        let path = self.example_config(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(CliError::Workspace(format!(
                "example {:?} has no configuration at {}",
                name,
                path.display()
            )))
        }
    }
}
