//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{DatabaseTarget, Environment, S3StorageConfig, ShelfpackConfig, StorageBackend};
use super::secret::secret_string;
use crate::domain::errors::ShelfpackError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`ShelfpackConfig`]
/// 4. Applies environment variable overrides (`SHELFPACK_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`ShelfpackError::Configuration`] if the file cannot be read, a
/// referenced variable is unset, parsing fails, or validation fails.
pub fn load_config(path: impl AsRef<Path>) -> Result<ShelfpackConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ShelfpackError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ShelfpackError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    load_config_str(&contents)
}

/// Same as [`load_config`] but from an in-memory TOML document
pub fn load_config_str(contents: &str) -> Result<ShelfpackConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: ShelfpackConfig = toml::from_str(&contents)
        .map_err(|e| ShelfpackError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        ShelfpackError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`.
///
/// Comment lines are copied through untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| ShelfpackError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(ShelfpackError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(val) => val.trim().parse().map(Some).map_err(|_| {
            ShelfpackError::Configuration(format!("Invalid value for {name}: '{val}'"))
        }),
        Err(_) => Ok(None),
    }
}

/// Applies environment variable overrides using the `SHELFPACK_*` prefix
///
/// Variables follow the pattern `SHELFPACK_<SECTION>_<KEY>`, for example
/// `SHELFPACK_CATALOG_BASE_URL` or `SHELFPACK_WORKERS_CONCURRENCY`.
fn apply_env_overrides(config: &mut ShelfpackConfig) -> Result<()> {
    // Application
    if let Ok(val) = std::env::var("SHELFPACK_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("SHELFPACK_ENVIRONMENT") {
        config.environment = match val.to_lowercase().as_str() {
            "development" => Environment::Development,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            _ => {
                return Err(ShelfpackError::Configuration(format!(
                    "Invalid value for SHELFPACK_ENVIRONMENT: '{val}'"
                )))
            }
        };
    }

    // Storage
    if let Ok(val) = std::env::var("SHELFPACK_STORAGE_BACKEND") {
        config.storage.backend = match val.to_lowercase().as_str() {
            "local" => StorageBackend::Local,
            "s3" => StorageBackend::S3,
            _ => {
                return Err(ShelfpackError::Configuration(format!(
                    "Invalid value for SHELFPACK_STORAGE_BACKEND: '{val}'"
                )))
            }
        };
    }
    if let Ok(val) = std::env::var("SHELFPACK_STORAGE_LOCAL_ROOT") {
        config.storage.local.root = val;
    }
    if let Ok(bucket) = std::env::var("SHELFPACK_STORAGE_S3_BUCKET") {
        let s3 = config.storage.s3.get_or_insert_with(|| S3StorageConfig {
            bucket: String::new(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            allow_http: false,
            multipart_chunk_size_mb: 8,
            max_concurrency: 4,
        });
        s3.bucket = bucket;
    }
    if let Some(ref mut s3) = config.storage.s3 {
        if let Ok(val) = std::env::var("SHELFPACK_STORAGE_S3_REGION") {
            s3.region = val;
        }
        if let Ok(val) = std::env::var("SHELFPACK_STORAGE_S3_ENDPOINT") {
            s3.endpoint = Some(val);
        }
        if let Ok(val) = std::env::var("SHELFPACK_STORAGE_S3_ACCESS_KEY_ID") {
            s3.access_key_id = Some(val);
        }
        if let Ok(val) = std::env::var("SHELFPACK_STORAGE_S3_SECRET_ACCESS_KEY") {
            s3.secret_access_key = Some(secret_string(val));
        }
        if let Some(allow) = parse_env("SHELFPACK_STORAGE_S3_ALLOW_HTTP")? {
            s3.allow_http = allow;
        }
    }

    // Job store
    if let Ok(val) = std::env::var("SHELFPACK_DATABASE_TARGET") {
        config.database_target = match val.to_lowercase().as_str() {
            "memory" => DatabaseTarget::Memory,
            "postgresql" => DatabaseTarget::PostgreSQL,
            _ => {
                return Err(ShelfpackError::Configuration(format!(
                    "Invalid value for SHELFPACK_DATABASE_TARGET: '{val}'"
                )))
            }
        };
    }
    if let Some(ref mut pg) = config.postgresql {
        if let Ok(val) = std::env::var("SHELFPACK_POSTGRESQL_CONNECTION_STRING") {
            pg.connection_string = secret_string(val);
        }
        if let Some(max) = parse_env("SHELFPACK_POSTGRESQL_MAX_CONNECTIONS")? {
            pg.max_connections = max;
        }
    }

    // Catalog
    if let Ok(val) = std::env::var("SHELFPACK_CATALOG_BASE_URL") {
        config.catalog.base_url = val;
    }
    if let Ok(val) = std::env::var("SHELFPACK_CATALOG_AUTH_TYPE") {
        config.catalog.auth_type = val;
    }
    if let Ok(val) = std::env::var("SHELFPACK_CATALOG_USERNAME") {
        config.catalog.username = Some(val);
    }
    if let Ok(val) = std::env::var("SHELFPACK_CATALOG_PASSWORD") {
        config.catalog.password = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("SHELFPACK_CATALOG_API_TOKEN") {
        config.catalog.api_token = Some(secret_string(val));
    }
    if let Some(verify) = parse_env("SHELFPACK_CATALOG_TLS_VERIFY")? {
        config.catalog.tls_verify = verify;
    }

    // Workers
    if let Some(concurrency) = parse_env("SHELFPACK_WORKERS_CONCURRENCY")? {
        config.workers.concurrency = concurrency;
    }
    if let Ok(val) = std::env::var("SHELFPACK_WORKERS_QUEUE_NAME") {
        config.workers.queue_name = val;
    }

    // Logging
    if let Some(enabled) = parse_env("SHELFPACK_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = enabled;
    }
    if let Ok(val) = std::env::var("SHELFPACK_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
