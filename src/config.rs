use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_CONFIG: &str = "SHIPMENT_QUERY_CONFIG";
pub const ENV_AGGREGATE_ID: &str = "SHIPMENT_QUERY_AGGREGATE_ID";
pub const ENV_COLLECTION: &str = "SHIPMENT_QUERY_COLLECTION";
pub const ENV_SEED_FILE: &str = "SHIPMENT_QUERY_SEED_FILE";
pub const ENV_LOG_DIR: &str = "SHIPMENT_QUERY_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "SHIPMENT_QUERY_LOG_LEVEL";
pub const ENV_LOG_CONFIG: &str = "SHIPMENT_QUERY_LOG_CONFIG";
pub const ENV_LOG_RETENTION: &str = "SHIPMENT_QUERY_LOG_RETENTION";
pub const ENV_WORKERS: &str = "SHIPMENT_QUERY_WORKERS";

/// Aggregate ID of the shipment aggregate.
pub const SHIPMENT_AGGREGATE_ID: i8 = 6;

/// Service configuration.
///
/// Precedence: CLI flags > environment > config file > defaults. CLI overrides
/// are applied by the binary after `load`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub aggregate_id: i8,
    pub collection: String,
    pub seed_file: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    /// log4rs YAML file; replaces the built-in appenders when set.
    pub log_config: Option<PathBuf>,
    pub log_retention: usize,
    /// Number of events handled concurrently by `serve`.
    pub workers: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            aggregate_id: SHIPMENT_AGGREGATE_ID,
            collection: "agg_shipment".to_string(),
            seed_file: None,
            log_dir: None,
            log_level: None,
            log_config: None,
            log_retention: 7,
            workers: 4,
        }
    }
}

impl ServiceConfig {
    /// Loads the config file (explicit path, then `$SHIPMENT_QUERY_CONFIG`, then
    /// `./shipment-query.toml` if present) and applies environment overrides.
    ///
    /// # Errors
    /// Returns an error if a named file cannot be read or parsed, or an
    /// environment value is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |k| std::env::var(k).ok())
    }

    /// `load` with an injectable environment lookup.
    ///
    /// # Errors
    /// See [`ServiceConfig::load`].
    pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match path.map(PathBuf::from).or_else(|| env(ENV_CONFIG).map(PathBuf::from)) {
            Some(p) => Some(p),
            None => {
                let local = PathBuf::from("shipment-query.toml");
                local.exists().then_some(local)
            }
        };
        let mut cfg = match file {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        cfg.apply_env(env)?;
        Ok(cfg)
    }

    /// # Errors
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&s)?)
    }

    /// # Errors
    /// Returns `ConfigError::InvalidValue` for unparseable numeric values.
    pub fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = env(ENV_AGGREGATE_ID) {
            self.aggregate_id = parse_num(ENV_AGGREGATE_ID, &v)?;
        }
        if let Some(v) = env(ENV_COLLECTION) {
            self.collection = v;
        }
        if let Some(v) = env(ENV_SEED_FILE) {
            self.seed_file = Some(PathBuf::from(v));
        }
        if let Some(v) = env(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = env(ENV_LOG_LEVEL) {
            self.log_level = Some(v);
        }
        if let Some(v) = env(ENV_LOG_CONFIG) {
            self.log_config = Some(PathBuf::from(v));
        }
        if let Some(v) = env(ENV_LOG_RETENTION) {
            self.log_retention = parse_num(ENV_LOG_RETENTION, &v)?;
        }
        if let Some(v) = env(ENV_WORKERS) {
            let workers: usize = parse_num(ENV_WORKERS, &v)?;
            if workers == 0 {
                return Err(ConfigError::InvalidValue { key: ENV_WORKERS.into(), value: v });
            }
            self.workers = workers;
        }
        Ok(())
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
