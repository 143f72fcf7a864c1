//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8083)
//! - `DATABASE_URL` - `PostgreSQL` connection string; when unset the JSON file store is used
//! - `DATA_DIR` - Directory for the JSON file store (default: ./data)
//! - `NATS_URL` - Enables publishing sync events to NATS
//! - `NATS_SUBJECT_PREFIX` - Subject prefix for sync events (default: storefront)
//! - `WHATSAPP_NUMBER` - Shop number that receives order confirmations; enables `wa.me` links
//! - `STORE_NAME` - Shop name used in WhatsApp messages (default: Handicraft Store)
//! - `ADMIN_TOKEN` - Shared admin credential; admin routes are open when unset
//! - `CHECKOUT_SECRET` - Key for signing checkout progress tokens (min 16 chars)
//! - `SYNC_BUFFER` - Number of sync events retained for polling clients (default: 1024)
//! - `LOG_FORMAT` - `json` for structured output, anything else for text

use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

const MIN_CHECKOUT_SECRET_LENGTH: usize = 16;
const DEFAULT_STORE_NAME: &str = "Handicraft Store";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// `json` selects JSON output; anything else, including unset, is text.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: Option<String>,
    pub data_dir: PathBuf,
    pub nats: Option<NatsConfig>,
    pub whatsapp: Option<WhatsAppConfig>,
    pub admin_token: Option<String>,
    pub checkout_secret: Vec<u8>,
    pub sync_buffer: usize,
    pub log_format: LogFormat,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NatsConfig {
    pub url: String,
    pub subject_prefix: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WhatsAppConfig {
    /// International number, digits only.
    pub number: String,
    pub store_name: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("data_dir", &self.data_dir)
            .field("nats", &self.nats)
            .field("whatsapp", &self.whatsapp)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "[REDACTED]"))
            .field("checkout_secret", &"[REDACTED]")
            .field("sync_buffer", &self.sync_buffer)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Config {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set but unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = parse_or(get("HOST"), "HOST", IpAddr::from([0, 0, 0, 0]))?;
        let port = parse_or(get("PORT"), "PORT", 8083u16)?;
        let sync_buffer = parse_or(get("SYNC_BUFFER"), "SYNC_BUFFER", 1024usize)?;
        if sync_buffer == 0 {
            return Err(ConfigError::InvalidEnvVar("SYNC_BUFFER".into(), "must be positive".into()));
        }

        let nats = get("NATS_URL").map(|url| NatsConfig {
            url,
            subject_prefix: get("NATS_SUBJECT_PREFIX").unwrap_or_else(|| "storefront".to_string()),
        });

        let whatsapp = match get("WHATSAPP_NUMBER") {
            Some(raw) => {
                let number: String = raw.chars().filter(char::is_ascii_digit).collect();
                if number.len() < 6 {
                    return Err(ConfigError::InvalidEnvVar("WHATSAPP_NUMBER".into(), format!("'{raw}' is not a phone number")));
                }
                Some(WhatsAppConfig {
                    number,
                    store_name: get("STORE_NAME").unwrap_or_else(|| DEFAULT_STORE_NAME.to_string()),
                })
            }
            None => None,
        };

        let checkout_secret = match get("CHECKOUT_SECRET") {
            Some(secret) if secret.len() < MIN_CHECKOUT_SECRET_LENGTH => {
                return Err(ConfigError::InsecureSecret(
                    "CHECKOUT_SECRET".into(),
                    format!("must be at least {MIN_CHECKOUT_SECRET_LENGTH} characters"),
                ));
            }
            Some(secret) => secret.into_bytes(),
            None => {
                tracing::warn!("CHECKOUT_SECRET not set, checkout tokens will not survive a restart");
                (0..32).map(|_| rand::random::<u8>()).collect()
            }
        };

        let log_format = LogFormat::parse(get("LOG_FORMAT").as_deref());

        Ok(Self {
            host,
            port,
            database_url: get("DATABASE_URL"),
            data_dir: get("DATA_DIR").map_or_else(|| PathBuf::from("./data"), PathBuf::from),
            nats,
            whatsapp,
            admin_token: get("ADMIN_TOKEN"),
            checkout_secret,
            sync_buffer,
            log_format,
        })
    }

    /// A config for tests and embedding: file store at `data_dir`, every optional feature off.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            database_url: None,
            data_dir: data_dir.into(),
            nats: None,
            whatsapp: None,
            admin_token: None,
            checkout_secret: b"local-checkout-secret".to_vec(),
            sync_buffer: 1024,
            log_format: LogFormat::Text,
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults_turn_features_off() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 8083);
        assert!(config.database_url.is_none());
        assert!(config.nats.is_none());
        assert!(config.whatsapp.is_none());
        assert!(config.admin_token.is_none());
        assert_eq!(config.checkout_secret.len(), 32);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn test_presence_enables_features() {
        let config = load(&[
            ("WHATSAPP_NUMBER", "+212 600-000-000"),
            ("NATS_URL", "nats://localhost:4222"),
            ("ADMIN_TOKEN", "letmein"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();
        let whatsapp = config.whatsapp.unwrap();
        assert_eq!(whatsapp.number, "212600000000");
        assert_eq!(whatsapp.store_name, DEFAULT_STORE_NAME);
        assert_eq!(config.nats.unwrap().subject_prefix, "storefront");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_values_fail() {
        assert!(matches!(load(&[("PORT", "eighty")]), Err(ConfigError::InvalidEnvVar(..))));
        assert!(matches!(load(&[("CHECKOUT_SECRET", "short")]), Err(ConfigError::InsecureSecret(..))));
        assert!(matches!(load(&[("WHATSAPP_NUMBER", "n/a")]), Err(ConfigError::InvalidEnvVar(..))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&[("ADMIN_TOKEN", "letmein"), ("CHECKOUT_SECRET", "0123456789abcdef0123")]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("letmein"));
        assert!(!debug.contains("0123456789abcdef"));
    }
}
