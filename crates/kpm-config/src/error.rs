use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(kpm_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(kpm_config::toml_deserialize),
        help("Check your registry.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Invalid duration for `{field}`: {value}")]
    #[diagnostic(
        code(kpm_config::invalid_duration),
        help("Use a duration such as `250ms`, `5s`, `1m30s` or `never`")
    )]
    InvalidDuration { field: &'static str, value: String },

    #[error("Invalid value for `{field}`: {reason}")]
    #[diagnostic(code(kpm_config::invalid_value))]
    InvalidValue { field: &'static str, reason: String },

    #[error("Database path is not configured")]
    #[diagnostic(
        code(kpm_config::missing_db_path),
        help("Set `db_path` in the config file or the KPM_REGISTRY_DB environment variable")
    )]
    MissingDbPath,

    #[error("IO error: {0}")]
    #[diagnostic(code(kpm_config::io))]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
