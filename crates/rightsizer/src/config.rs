//! Rightsizer configuration
//!
//! Defaults are layered under an optional file named by `RIGHTSIZER_CONFIG`
//! and then `RIGHTSIZER__*` environment variables, e.g.
//! `RIGHTSIZER__CONTROLLER__POD_NAME=web`.

use anyhow::{Context, Result};
use rightsizer_lib::config::ResizerConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Env var holding the path of an optional config file
pub const CONFIG_PATH_ENV: &str = "RIGHTSIZER_CONFIG";

const ENV_PREFIX: &str = "RIGHTSIZER";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Port for health and metrics endpoints
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KubeSettings {
    /// Explicit kubeconfig; in-cluster or `KUBECONFIG` discovery otherwise
    pub kubeconfig: Option<PathBuf>,
}

/// Top level configuration of the binary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub api: ApiConfig,
    pub kube: KubeSettings,
    pub controller: ResizerConfig,
}

impl AgentConfig {
    /// Load configuration from the config file and environment
    pub fn load() -> Result<Self> {
        let mut builder = Self::builder()?;
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(config::File::from(PathBuf::from(path)).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        Self::finish(config)
    }

    /// Parse a TOML document layered over the defaults
    pub fn from_toml(document: &str) -> Result<Self> {
        let config = Self::builder()?
            .add_source(config::File::from_str(document, config::FileFormat::Toml))
            .build()
            .context("Failed to parse configuration")?;

        Self::finish(config)
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let defaults = config::Config::try_from(&AgentConfig::default())
            .context("Failed to serialize default configuration")?;
        Ok(config::Config::builder().add_source(defaults))
    }

    fn finish(config: config::Config) -> Result<Self> {
        let mut agent: AgentConfig = config
            .try_deserialize()
            .context("Invalid configuration")?;
        agent.kube.kubeconfig = agent.kube.kubeconfig.map(expand_home);
        Ok(agent)
    }
}

/// Expand a leading `~/` against the user's home directory
fn expand_home(path: PathBuf) -> PathBuf {
    match (path.strip_prefix("~"), home::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path,
    }
}
