use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::Organization;
use crate::search::FlattenOptions;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Index configuration
    pub index: IndexConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,

    /// Tenants provisioned at startup
    #[serde(default)]
    pub tenants: Vec<TenantConfig>,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: ATTR_INDEX_)
            .add_source(
                config::Environment::with_prefix("ATTR_INDEX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index: IndexConfig::default(),
            observability: ObservabilityConfig::default(),
            tenants: vec![TenantConfig {
                name: "default".to_string(),
                id: 1,
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index backend
    #[serde(default)]
    pub backend: IndexBackend,

    /// Directory holding one persisted index file per tenant
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Join nested attribute keys with `.` instead of `_`
    #[serde(default)]
    pub dot_search: bool,

    /// Truncate indexed values to this many characters (0 disables)
    #[serde(default)]
    pub value_trim: usize,

    /// zlib compression level (0-9)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// Autosave interval (seconds, 0 disables)
    #[serde(default = "default_save_interval")]
    pub save_interval_secs: u64,

    /// Reindex worker count (0 uses available parallelism)
    #[serde(default)]
    pub reindex_workers: usize,
}

impl IndexConfig {
    /// Flattening options derived from this configuration
    pub fn flatten_options(&self) -> FlattenOptions {
        FlattenOptions {
            separator: if self.dot_search { '.' } else { '_' },
            value_trim: (self.value_trim > 0).then_some(self.value_trim),
        }
    }

    /// Number of reindex workers to run
    pub fn worker_count(&self) -> usize {
        if self.reindex_workers > 0 {
            self.reindex_workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::default(),
            data_dir: default_data_dir(),
            dot_search: false,
            value_trim: 0,
            compression_level: default_compression_level(),
            save_interval_secs: default_save_interval(),
            reindex_workers: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackend {
    /// In-memory compressed tries persisted to one file per tenant
    #[default]
    Trie,
    /// Relational backend (not compiled into this build)
    Sql,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TenantConfig {
    pub name: String,
    pub id: i64,
}

impl From<&TenantConfig> for Organization {
    fn from(tenant: &TenantConfig) -> Self {
        Organization::new(tenant.name.clone(), tenant.id)
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data/index")
}

fn default_compression_level() -> u32 {
    6
}

fn default_save_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
