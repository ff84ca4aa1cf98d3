use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

const CONFIG_DIR_NAME: &str = "uia-driver";
const CONFIG_FILE_NAME: &str = "config.yaml";

pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
    /// False when `path` did not exist and defaults were used
    pub from_file: bool,
}

/// Priority: explicit path > ./config/config.yaml > <config_dir>/uia-driver/config.yaml
pub fn resolve_config_path(explicit: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.clone());
    }
    let local_config = Path::new("config").join(CONFIG_FILE_NAME);
    if local_config.exists() {
        return Ok(local_config);
    }
    let mut path = dirs::config_dir().context("Failed to get config directory")?;
    path.push(CONFIG_DIR_NAME);
    path.push(CONFIG_FILE_NAME);
    Ok(path)
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let path = resolve_config_path(config_path)?;
    let mut loaded = read_config(&path).await?;
    loaded
        .config
        .apply_env_overrides()
        .context("Invalid environment override")?;
    Ok(loaded)
}

/// Read `path`, falling back to defaults when it does not exist.
pub async fn read_config(path: &Path) -> Result<LoadedConfig> {
    if !path.exists() {
        return Ok(LoadedConfig {
            config: Config::default(),
            path: path.to_path_buf(),
            from_file: false,
        });
    }

    let content = fs::read_to_string(path)
        .await
        .context("Failed to read config file")?;
    let config = Config::from_yaml(&content).context("Failed to parse config file")?;
    Ok(LoadedConfig {
        config,
        path: path.to_path_buf(),
        from_file: true,
    })
}
