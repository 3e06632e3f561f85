use std::time::Duration;

use thiserror::Error;

const DEFAULT_PORT: u16 = 8005;
const DEFAULT_DATABASE: &str = "content";
const DEFAULT_FILE_COLLECTION: &str = "files";
const DEFAULT_FS_COLLECTION: &str = "fs_files";
const DEFAULT_CHUNK_COLLECTION: &str = "fs_chunks";
/// 255 KiB, the conventional chunk size of chunked object stores.
const DEFAULT_CHUNK_SIZE: usize = 255 * 1024;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;
const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 5;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Where the document collection and the chunked object store live.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    pub database_url: String,
    pub database: String,
    pub file_collection: String,
    pub fs_collection: String,
    pub chunk_collection: String,
    pub chunk_size: usize,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthSettings {
    pub login_service_url: String,
    pub timeout: Duration,
}

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub port: u16,
    pub store: StoreSettings,
    pub auth: AuthSettings,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub shutdown_timeout: Duration,
    pub request_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let identifier = |name: &'static str, default: &str| {
            let value = lookup(name).unwrap_or_else(|| default.to_string());
            validate_identifier(name, value)
        };

        let store = StoreSettings {
            database_url: required("DATABASE_URL")?,
            database: identifier("DATABASE", DEFAULT_DATABASE)?,
            file_collection: identifier("FILE_COLLECTION", DEFAULT_FILE_COLLECTION)?,
            fs_collection: identifier("FS_COLLECTION", DEFAULT_FS_COLLECTION)?,
            chunk_collection: identifier("CHUNK_COLLECTION", DEFAULT_CHUNK_COLLECTION)?,
            chunk_size: parse_or(&lookup, "CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
        };

        if store.chunk_size == 0 || store.chunk_size > i32::MAX as usize {
            return Err(ConfigError::Invalid {
                name: "CHUNK_SIZE",
                reason: format!("{} is out of range", store.chunk_size),
            });
        }

        let auth = AuthSettings {
            login_service_url: required("LOGIN_SERVICE_URL")?,
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "AUTH_TIMEOUT_SECS",
                DEFAULT_AUTH_TIMEOUT_SECS,
            )?),
        };

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS").map(|origins| {
            origins
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect()
        });

        Ok(Self {
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            store,
            auth,
            cors_allowed_origins,
            shutdown_timeout: Duration::from_secs(parse_or(
                &lookup,
                "SHUTDOWN_TIMEOUT_SECS",
                DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            )?),
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Collection names are interpolated into SQL, so only plain identifiers pass.
fn validate_identifier(name: &'static str, value: String) -> Result<String, ConfigError> {
    let mut chars = value.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && value.len() <= 63 {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            name,
            reason: format!("'{}' is not a valid identifier", value),
        })
    }
}
