use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    duration::parse_duration,
    error::{ConfigError, Result},
    search::SearchSettings,
};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "KPM_REGISTRY_CONFIG";
/// Environment variable overriding the database path.
pub const DB_PATH_ENV: &str = "KPM_REGISTRY_DB";
/// Environment variable naming the kpm root directory.
pub const ROOT_ENV: &str = "KPM_ROOT";

/// Registry store configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Path to the SQLite database holding the package table.
    /// Default: $KPM_ROOT/registry/registry.db
    pub db_path: Option<String>,

    /// Maximum number of pooled database connections.
    /// Default: 8
    pub pool_size: Option<u32>,

    /// How long a call may wait for a pooled connection.
    /// Default: 5s
    pub acquire_timeout: Option<String>,

    /// How long SQLite waits on a locked database before reporting busy.
    /// Default: 5s
    pub busy_timeout: Option<String>,

    /// Deadline applied to calls that do not carry their own, or "never".
    /// Default: 30s
    pub default_deadline: Option<String>,

    /// Number of internal retries after a transient failure.
    /// Default: 1
    pub retry_budget: Option<u32>,

    /// Pause before an internal retry.
    /// Default: 50ms
    pub retry_backoff: Option<String>,

    /// Search settings.
    #[serde(default)]
    pub search: SearchSettings,
}

impl Config {
    pub fn default_config() -> Self {
        let db_path = kpm_root().map(|root| {
            root.join("registry")
                .join("registry.db")
                .to_string_lossy()
                .into_owned()
        });

        Self {
            db_path,
            pool_size: Some(8),
            acquire_timeout: Some("5s".to_string()),
            busy_timeout: Some("5s".to_string()),
            default_deadline: Some("30s".to_string()),
            retry_budget: Some(1),
            retry_backoff: Some("50ms".to_string()),
            search: SearchSettings {
                default_results: Some(20),
                max_results: Some(100),
                match_mode: None,
                case_sensitive: Some(true),
            },
        }
    }

    /// Loads the configuration from `path`.
    /// If the file is not found, the default configuration is used.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config = match fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %path.display(), "loading registry config");
                toml::from_str(&content)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "config not found, using defaults");
                Self::default_config()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    /// Loads the configuration named by `KPM_REGISTRY_CONFIG`, falling back to
    /// `$KPM_ROOT/registry.toml`, then to the defaults.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .map(PathBuf::from)
            .or_else(|| kpm_root().map(|root| root.join("registry.toml")));

        match path {
            Some(path) => Self::load(path),
            None => {
                let mut config = Self::default_config();
                config.resolve()?;
                Ok(config)
            }
        }
    }

    pub fn resolve(&mut self) -> Result<()> {
        if self.db_path.is_none() {
            self.db_path = Self::default_config().db_path;
        }

        let pool_size = *self.pool_size.get_or_insert(8);
        if pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pool_size",
                reason: "must be at least 1".to_string(),
            });
        }

        self.acquire_timeout.get_or_insert_with(|| "5s".to_string());
        self.busy_timeout.get_or_insert_with(|| "5s".to_string());
        self.default_deadline.get_or_insert_with(|| "30s".to_string());
        self.retry_budget.get_or_insert(1);
        self.retry_backoff.get_or_insert_with(|| "50ms".to_string());

        self.acquire_timeout()?;
        self.busy_timeout()?;
        self.default_deadline()?;
        self.retry_backoff()?;

        self.search.resolve()
    }

    pub fn get_db_path(&self) -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var(DB_PATH_ENV) {
            return Ok(PathBuf::from(env_path));
        }
        self.db_path
            .as_ref()
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingDbPath)
    }

    pub fn pool_size(&self) -> u32 {
        self.pool_size.unwrap_or(8)
    }

    pub fn acquire_timeout(&self) -> Result<Duration> {
        required_duration("acquire_timeout", self.acquire_timeout.as_deref(), "5s")
    }

    pub fn busy_timeout(&self) -> Result<Duration> {
        required_duration("busy_timeout", self.busy_timeout.as_deref(), "5s")
    }

    /// Returns `None` when calls run without a default deadline.
    pub fn default_deadline(&self) -> Result<Option<Duration>> {
        match self.default_deadline.as_deref().unwrap_or("30s") {
            "never" => Ok(None),
            value => required_duration("default_deadline", Some(value), "30s").map(Some),
        }
    }

    pub fn retry_budget(&self) -> u32 {
        self.retry_budget.unwrap_or(1)
    }

    pub fn retry_backoff(&self) -> Result<Duration> {
        required_duration("retry_backoff", self.retry_backoff.as_deref(), "50ms")
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let serialized = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serialized)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

fn required_duration(field: &'static str, value: Option<&str>, default: &str) -> Result<Duration> {
    let value = value.unwrap_or(default);
    parse_duration(value).ok_or_else(|| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
    })
}

fn kpm_root() -> Option<PathBuf> {
    if let Ok(root) = std::env::var(ROOT_ENV) {
        return Some(PathBuf::from(root));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join("kpm"))
}

#[cfg(test)]
mod tests {
    use serial_test::serial;
    use tempfile::tempdir;

    use super::*;
    use crate::{search::MatchMode, test_utils::with_env};

    #[test]
    #[serial]
    fn test_default_config_creation() {
        with_env(vec![(ROOT_ENV, "/srv/kpm")], || {
            let config = Config::default_config();

            assert_eq!(
                config.db_path.as_deref(),
                Some("/srv/kpm/registry/registry.db")
            );
            assert_eq!(config.pool_size, Some(8));
            assert_eq!(config.retry_budget, Some(1));
            assert_eq!(config.search.max_results(), 100);
        });
    }

    #[test]
    #[serial]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path().join("missing.toml")).unwrap();

        assert_eq!(config.pool_size(), 8);
        assert_eq!(config.busy_timeout().unwrap(), Duration::from_secs(5));
        assert_eq!(
            config.default_deadline().unwrap(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.toml");
        fs::write(
            &path,
            r#"
db_path = "/tmp/registry.db"
pool_size = 2
default_deadline = "never"

[search]
match_mode = "substring"
case_sensitive = false
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.db_path.as_deref(), Some("/tmp/registry.db"));
        assert_eq!(config.pool_size(), 2);
        assert_eq!(config.default_deadline().unwrap(), None);
        assert_eq!(config.retry_backoff().unwrap(), Duration::from_millis(50));
        assert_eq!(config.search.match_mode(), MatchMode::Substring);
        assert!(!config.search.case_sensitive());
        assert_eq!(config.search.default_results(), 20);
    }

    #[test]
    #[serial]
    fn test_resolve_rejects_zero_pool() {
        let mut config = Config::default_config();
        config.pool_size = Some(0);

        assert!(matches!(
            config.resolve(),
            Err(ConfigError::InvalidValue {
                field: "pool_size",
                ..
            })
        ));
    }

    #[test]
    #[serial]
    fn test_resolve_rejects_bad_duration() {
        let mut config = Config::default_config();
        config.busy_timeout = Some("soon".to_string());

        assert!(matches!(
            config.resolve(),
            Err(ConfigError::InvalidDuration {
                field: "busy_timeout",
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.toml");
        fs::write(&path, "pool_size = \"many\"").unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::TomlDeError(_))
        ));
    }

    #[test]
    #[serial]
    fn test_db_path_env_override() {
        with_env(vec![(DB_PATH_ENV, "/custom/registry.db")], || {
            let config = Config::default_config();
            assert_eq!(
                config.get_db_path().unwrap(),
                PathBuf::from("/custom/registry.db")
            );
        });
    }

    #[test]
    #[serial]
    fn test_from_env_reads_config_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "retry_budget = 3").unwrap();

        with_env(vec![(CONFIG_PATH_ENV, path.to_str().unwrap())], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.retry_budget(), 3);
        });
    }

    #[test]
    #[serial]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("registry.toml");

        let mut config = Config::default_config();
        config.db_path = Some("/data/registry.db".to_string());
        config.search.max_results = Some(50);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.db_path.as_deref(), Some("/data/registry.db"));
        assert_eq!(loaded.search.max_results(), 50);
    }
}
