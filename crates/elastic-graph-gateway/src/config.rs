//! Gateway configuration (SPEC_FULL.md §1.2): a YAML file plus
//! `ELASTIC_GRAPH_<SECTION>__<FIELD>` environment overrides for secrets,
//! matching the teacher's `Configuration::from_str` / env-layering pattern.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfiguration {
    pub datastore: DatastoreConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub client_identity: ClientIdentityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatastoreConfig {
    pub clusters: HashMap<String, ClusterConfig>,
    #[serde(default = "DatastoreConfig::default_page_size")]
    pub default_page_size: usize,
    #[serde(default = "DatastoreConfig::default_max_page_size")]
    pub max_page_size: usize,
}

impl DatastoreConfig {
    fn default_page_size() -> usize {
        10
    }

    fn default_max_page_size() -> usize {
        500
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    pub url: String,
    pub username: Option<String>,
    pub password_env: Option<String>,
}

impl ClusterConfig {
    /// Resolves the password from the environment variable named by
    /// `password_env`, if configured. Never logged.
    pub fn password(&self) -> Option<String> {
        self.password_env.as_deref().and_then(|var| std::env::var(var).ok())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub port: u16,
    pub max_request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LoggingConfig::default_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "QueryConfig::default_slow_query_threshold_ms")]
    pub slow_query_threshold_ms: u64,
}

impl QueryConfig {
    fn default_slow_query_threshold_ms() -> u64 {
        1000
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            slow_query_threshold_ms: QueryConfig::default_slow_query_threshold_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientIdentityConfig {
    #[serde(default = "ClientIdentityConfig::default_header_name")]
    pub header_name: String,
}

impl ClientIdentityConfig {
    fn default_header_name() -> String {
        "X-Client-Name".to_string()
    }
}

impl Default for ClientIdentityConfig {
    fn default() -> Self {
        ClientIdentityConfig {
            header_name: ClientIdentityConfig::default_header_name(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl GatewayConfiguration {
    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_str(&contents)
    }
}
