use std::path::Path;
use std::sync::LazyLock;

use crate::config::schema::ServerConfig;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/server-config.json");

pub const ENV_BIND: &str = "MAINTDESK_BIND";
pub const ENV_DATABASE: &str = "MAINTDESK_DATABASE";
pub const ENV_CONFIG: &str = "MAINTDESK_CONFIG";

static VALIDATOR: LazyLock<Result<jsonschema::Validator, String>> = LazyLock::new(|| {
    let schema: serde_json::Value = serde_json::from_str(SCHEMA_JSON)
        .map_err(|e| format!("Invalid embedded schema JSON: {}", e))?;
    jsonschema::validator_for(&schema).map_err(|e| format!("Failed to compile JSON schema: {}", e))
});

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServerConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

/// Loads the config at `path`, or the defaults when the file does not exist.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<ServerConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        log::info!("No config at {}, using defaults", path.display());
        return Ok(ServerConfig::default());
    }
    load_config(path)
}

pub fn load_config_from_str(content: &str) -> Result<ServerConfig, ConfigError> {
    let mut value: serde_json::Value = serde_yaml::from_str(content)?;
    if value.is_null() {
        value = serde_json::Value::Object(Default::default());
    }

    validate_schema(&value)?;

    let config: ServerConfig =
        serde_json::from_value(value).map_err(|e| ConfigError::Validation {
            message: e.to_string(),
        })?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(value: &serde_json::Value) -> Result<(), ConfigError> {
    let validator = VALIDATOR
        .as_ref()
        .map_err(|reason| ConfigError::Validation {
            message: reason.clone(),
        })?;

    let errors: Vec<String> = validator.iter_errors(value).map(|e| e.to_string()).collect();
    if !errors.is_empty() {
        return Err(ConfigError::Validation {
            message: errors.join("; "),
        });
    }
    Ok(())
}

pub fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.page_size == 0 {
        errors.push("page_size must be at least 1".to_string());
    }
    if config.max_page_size < config.page_size {
        errors.push(format!(
            "max_page_size ({}) must not be smaller than page_size ({})",
            config.max_page_size, config.page_size
        ));
    }
    if config.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(format!(
            "bind_address '{}' is not a valid socket address",
            config.bind_address
        ));
    }
    if config.cors_origins.iter().any(|o| o.trim().is_empty()) {
        errors.push("cors_origins must not contain empty entries".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation {
            message: errors.join("; "),
        })
    }
}

/// Applies `MAINTDESK_BIND` and `MAINTDESK_DATABASE` on top of `config`.
pub fn apply_env_overrides(config: &mut ServerConfig) -> Result<(), ConfigError> {
    if let Ok(bind) = std::env::var(ENV_BIND) {
        if !bind.trim().is_empty() {
            config.bind_address = bind.trim().to_string();
        }
    }
    if let Ok(path) = std::env::var(ENV_DATABASE) {
        if !path.trim().is_empty() {
            config.database_path = Some(path.trim().into());
        }
    }
    validate_config(config)
}

/// Config file location: `MAINTDESK_CONFIG`, else `~/.maintdesk/config.yaml`.
pub fn config_path() -> Option<std::path::PathBuf> {
    match std::env::var(ENV_CONFIG) {
        Ok(path) if !path.trim().is_empty() => Some(path.trim().into()),
        _ => dirs::home_dir().map(|h| h.join(".maintdesk").join("config.yaml")),
    }
}
