use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ancesta: AncestaConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

/// Ancesta-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AncestaConfig {
    /// Path to the SQLite relationship cache.
    pub cache_db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Crawl configuration: depth limits and the strata classification of
/// relationship properties in the knowledge-graph source.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    #[serde(default = "default_initial_depth")]
    pub initial_depth: usize,
    #[serde(default = "default_extension_depth")]
    pub extension_depth: usize,
    /// Same-generation relationship property ids (e.g. spouse).
    #[serde(default = "default_homo_strata")]
    pub homo_strata: Vec<String>,
    /// Adjacent-generation relationship property ids (father, mother, child).
    #[serde(default = "default_hetero_strata")]
    pub hetero_strata: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            initial_depth: default_initial_depth(),
            extension_depth: default_extension_depth(),
            homo_strata: default_homo_strata(),
            hetero_strata: default_hetero_strata(),
        }
    }
}

/// Filter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Property ids offered as attribute-membership filters.
    #[serde(default = "default_text_filter_properties")]
    pub text_filter_properties: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            text_filter_properties: default_text_filter_properties(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_initial_depth() -> usize {
    2
}

fn default_extension_depth() -> usize {
    1
}

fn default_homo_strata() -> Vec<String> {
    vec!["WD-P26".to_string()]
}

fn default_hetero_strata() -> Vec<String> {
    vec![
        "WD-P22".to_string(),
        "WD-P25".to_string(),
        "WD-P40".to_string(),
    ]
}

fn default_text_filter_properties() -> Vec<String> {
    vec![
        "SW-P2".to_string(),
        "SW-P3".to_string(),
        "WD-P53".to_string(),
        "WD-P106".to_string(),
    ]
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in ANCESTA_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("ANCESTA_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .context("Failed to parse config.toml")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.crawl.extension_depth == 0 {
            anyhow::bail!("crawl.extension_depth must be greater than 0");
        }

        if self.crawl.homo_strata.is_empty() && self.crawl.hetero_strata.is_empty() {
            anyhow::bail!("at least one of crawl.homo_strata / crawl.hetero_strata must be non-empty");
        }

        for id in &self.crawl.homo_strata {
            if self.crawl.hetero_strata.contains(id) {
                anyhow::bail!(
                    "relationship property {} appears in both homo_strata and hetero_strata",
                    id
                );
            }
        }

        Ok(())
    }

    /// Get the relationship cache path
    pub fn cache_db_path(&self) -> &Path {
        &self.ancesta.cache_db_path
    }

    /// Stratum classification built from the configured property-id lists.
    pub fn strata_map(&self) -> crate::model::StrataMap {
        crate::model::StrataMap::from_ids(&self.crawl.homo_strata, &self.crawl.hetero_strata)
    }
}
