use std::path::PathBuf;
use std::time::Duration;

use rolesync_directory::GuildId;

/// Configuration for the role sync daemon.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bot token for the directory API.
    pub token: String,

    /// Destination server all creator mappings sync into.
    pub dest_server_id: GuildId,

    /// Directory holding per-creator YAML config files.
    pub config_dir: PathBuf,

    /// Whether the periodic scheduler runs. When false, `run` starts but
    /// only serves on-demand syncs triggered out of band.
    pub auto_sync_enabled: bool,

    /// Time between scheduler ticks.
    pub sync_interval: Duration,

    /// Minimum spacing between mutating directory calls within a job.
    pub mutation_interval: Duration,

    /// Maximum reconciliation jobs running at once.
    pub max_concurrent_jobs: usize,

    /// Override for the directory API base URL.
    pub api_base_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    ///
    /// This allows tests to supply variables without mutating process-global
    /// environment state.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let token = reader("ROLESYNC_TOKEN")
            .map_err(|_| ConfigError::MissingVar("ROLESYNC_TOKEN".into()))?;

        let dest_server_id = reader("ROLESYNC_DEST_SERVER_ID")
            .map_err(|_| ConfigError::MissingVar("ROLESYNC_DEST_SERVER_ID".into()))?
            .parse::<GuildId>()
            .map_err(|e| {
                ConfigError::InvalidValue("ROLESYNC_DEST_SERVER_ID".into(), e.to_string())
            })?;

        let config_dir = reader("ROLESYNC_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("configs"));

        let auto_sync_enabled = reader("ROLESYNC_AUTO_SYNC_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let sync_interval_secs = reader("ROLESYNC_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidValue("ROLESYNC_INTERVAL_SECS".into(), e.to_string())
            })?;

        let mutation_interval_ms = reader("ROLESYNC_MUTATION_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidValue("ROLESYNC_MUTATION_INTERVAL_MS".into(), e.to_string())
            })?;

        let max_concurrent_jobs = reader("ROLESYNC_MAX_CONCURRENT_JOBS")
            .unwrap_or_else(|_| "4".to_string())
            .parse::<usize>()
            .map_err(|e| {
                ConfigError::InvalidValue("ROLESYNC_MAX_CONCURRENT_JOBS".into(), e.to_string())
            })?;

        let api_base_url = reader("ROLESYNC_API_BASE_URL").ok();

        Ok(Self {
            token,
            dest_server_id,
            config_dir,
            auto_sync_enabled,
            sync_interval: Duration::from_secs(sync_interval_secs),
            mutation_interval: Duration::from_millis(mutation_interval_ms),
            max_concurrent_jobs,
            api_base_url,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env::VarError;

    /// Create a reader closure from a HashMap (no global env mutation).
    fn make_reader(vars: HashMap<&str, &str>) -> impl Fn(&str) -> Result<String, VarError> {
        let owned: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| owned.get(key).cloned().ok_or(VarError::NotPresent)
    }

    #[test]
    fn test_missing_token() {
        let reader = make_reader(HashMap::from([("ROLESYNC_DEST_SERVER_ID", "2")]));
        let err = AppConfig::from_reader(reader).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(_)));
        assert!(err.to_string().contains("ROLESYNC_TOKEN"));
    }

    #[test]
    fn test_missing_dest_server() {
        let reader = make_reader(HashMap::from([("ROLESYNC_TOKEN", "token")]));
        let err = AppConfig::from_reader(reader).unwrap_err();
        assert!(err.to_string().contains("ROLESYNC_DEST_SERVER_ID"));
    }

    #[test]
    fn test_defaults() {
        let reader = make_reader(HashMap::from([
            ("ROLESYNC_TOKEN", "token"),
            ("ROLESYNC_DEST_SERVER_ID", "2"),
        ]));

        let config = AppConfig::from_reader(reader).expect("should succeed with defaults");
        assert_eq!(config.dest_server_id, GuildId::new(2));
        assert_eq!(config.config_dir, PathBuf::from("configs"));
        assert!(config.auto_sync_enabled);
        assert_eq!(config.sync_interval, Duration::from_secs(60));
        assert_eq!(config.mutation_interval, Duration::from_millis(1000));
        assert_eq!(config.max_concurrent_jobs, 4);
        assert!(config.api_base_url.is_none());
    }

    #[test]
    fn test_custom_values() {
        let reader = make_reader(HashMap::from([
            ("ROLESYNC_TOKEN", "token"),
            ("ROLESYNC_DEST_SERVER_ID", "42"),
            ("ROLESYNC_CONFIG_DIR", "/etc/rolesync"),
            ("ROLESYNC_AUTO_SYNC_ENABLED", "false"),
            ("ROLESYNC_INTERVAL_SECS", "300"),
            ("ROLESYNC_MUTATION_INTERVAL_MS", "250"),
            ("ROLESYNC_MAX_CONCURRENT_JOBS", "8"),
            ("ROLESYNC_API_BASE_URL", "http://localhost:8080/api"),
        ]));

        let config = AppConfig::from_reader(reader).unwrap();
        assert_eq!(config.dest_server_id, GuildId::new(42));
        assert_eq!(config.config_dir, PathBuf::from("/etc/rolesync"));
        assert!(!config.auto_sync_enabled);
        assert_eq!(config.sync_interval, Duration::from_secs(300));
        assert_eq!(config.mutation_interval, Duration::from_millis(250));
        assert_eq!(config.max_concurrent_jobs, 8);
        assert_eq!(
            config.api_base_url.as_deref(),
            Some("http://localhost:8080/api")
        );
    }

    #[test]
    fn test_invalid_dest_server() {
        let reader = make_reader(HashMap::from([
            ("ROLESYNC_TOKEN", "token"),
            ("ROLESYNC_DEST_SERVER_ID", "not-a-snowflake"),
        ]));

        let err = AppConfig::from_reader(reader).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(..)));
        assert!(err.to_string().contains("ROLESYNC_DEST_SERVER_ID"));
    }

    #[test]
    fn test_invalid_interval() {
        let reader = make_reader(HashMap::from([
            ("ROLESYNC_TOKEN", "token"),
            ("ROLESYNC_DEST_SERVER_ID", "2"),
            ("ROLESYNC_INTERVAL_SECS", "soon"),
        ]));

        let err = AppConfig::from_reader(reader).unwrap_err();
        assert!(err.to_string().contains("ROLESYNC_INTERVAL_SECS"));
    }
}
