use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::assemble::AssemblyLimits;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ragctx: RagctxConfig,
    #[serde(default)]
    pub assembly: AssemblyLimits,
    #[serde(default)]
    pub planner: PlannerConfig,
}

/// Storage and logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RagctxConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
}

/// Relationship expansion configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PlannerConfig {
    /// Follow one hop of outgoing relationships from the seed documents
    #[serde(default = "default_expand_relationships")]
    pub expand_relationships: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            expand_relationships: default_expand_relationships(),
        }
    }
}

fn default_expand_relationships() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in RAGCTX_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("RAGCTX_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml_str(&config_str)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("Failed to parse config.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.ragctx.db_path.as_os_str().is_empty() {
            anyhow::bail!("ragctx.db_path must not be empty");
        }

        if self.assembly.max_chunks_per_doc == 0 {
            anyhow::bail!("assembly.max_chunks_per_doc must be greater than 0");
        }

        if self.assembly.max_total_chunks == 0 {
            anyhow::bail!("assembly.max_total_chunks must be greater than 0");
        }

        if self.assembly.max_total_tokens == Some(0) {
            anyhow::bail!("assembly.max_total_tokens must be greater than 0 when set");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.ragctx.db_path
    }

    /// Get migrations directory
    pub fn migrations_dir(&self) -> &Path {
        &self.ragctx.migrations_dir
    }

    /// Default `env_logger` filter; `RUST_LOG` still takes precedence.
    pub fn log_level(&self) -> &str {
        &self.ragctx.log_level
    }
}
