use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::Config;
use crate::local::LocalRuntime;

pub struct CliContext {
    config: Config,
    config_path: PathBuf,
}

impl CliContext {
    pub fn new(config: Config, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Local runtime over `tree`, or over the configured fixture.
    pub async fn local_runtime(&self, tree: Option<&PathBuf>) -> Result<LocalRuntime> {
        let path = tree
            .or(self.config.tree.fixture.as_ref())
            .context("No tree fixture given; pass --tree or set tree.fixture in the config")?;
        LocalRuntime::load(path, &self.config)
            .await
            .with_context(|| format!("Failed to load tree fixture {}", path.display()))
    }
}
