//! Process configuration, read from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `BIND_ADDR` | `0.0.0.0:8080` |
//! | `PAGE_SIZE` | `10` |
//! | `MAX_PAGE_SIZE` | `100` |
//! | `USE_PERSISTENT_STORES` | `false` |
//! | `DATABASE_URL` | unset |
//! | `DATABASE_MAX_CONNECTIONS` | `5` |
//! | `LOG_FORMAT` | `json` |

use std::net::SocketAddr;

use thiserror::Error;

use pricebook_observability::LogFormat;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// Page size used when a list request does not ask for one.
    pub page_size: u64,
    /// Upper bound for a requested page size.
    pub max_page_size: u64,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub log_format: LogFormat,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            page_size: 10,
            max_page_size: 100,
            use_persistent_stores: false,
            database_url: None,
            database_max_connections: 5,
            log_format: LogFormat::Json,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (unset keys keep defaults).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_addr = parse_or(&lookup, "BIND_ADDR", defaults.bind_addr)?;
        let page_size = parse_or(&lookup, "PAGE_SIZE", defaults.page_size)?;
        let max_page_size = parse_or(&lookup, "MAX_PAGE_SIZE", defaults.max_page_size)?;
        let use_persistent_stores =
            parse_or(&lookup, "USE_PERSISTENT_STORES", defaults.use_persistent_stores)?;
        let database_max_connections =
            parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", defaults.database_max_connections)?;
        let log_format = parse_or(&lookup, "LOG_FORMAT", defaults.log_format)?;
        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());

        if page_size == 0 {
            return Err(invalid("PAGE_SIZE", page_size, "must be at least 1"));
        }
        if max_page_size < page_size {
            return Err(invalid(
                "MAX_PAGE_SIZE",
                max_page_size,
                format!("must be at least PAGE_SIZE ({page_size})"),
            ));
        }
        if database_max_connections == 0 {
            return Err(invalid(
                "DATABASE_MAX_CONNECTIONS",
                database_max_connections,
                "must be at least 1",
            ));
        }

        Ok(Self {
            bind_addr,
            page_size,
            max_page_size,
            use_persistent_stores,
            database_url,
            database_max_connections,
            log_format,
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn invalid(key: &'static str, value: impl ToString, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let cfg = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, ApiConfig::default());
        assert_eq!(cfg.page_size, 10);
    }

    #[test]
    fn reads_every_variable() {
        let cfg = ApiConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:3000"),
            ("PAGE_SIZE", "25"),
            ("MAX_PAGE_SIZE", "50"),
            ("USE_PERSISTENT_STORES", "true"),
            ("DATABASE_URL", "postgres://localhost/catalog"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("LOG_FORMAT", "pretty"),
        ]))
        .unwrap();

        assert_eq!(cfg.bind_addr, "127.0.0.1:3000".parse().unwrap());
        assert_eq!(cfg.page_size, 25);
        assert_eq!(cfg.max_page_size, 50);
        assert!(cfg.use_persistent_stores);
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/catalog"));
        assert_eq!(cfg.database_max_connections, 12);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }

    #[test]
    fn rejects_unparseable_values() {
        let err = ApiConfig::from_lookup(lookup(&[("PAGE_SIZE", "ten")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PAGE_SIZE", .. }));

        let err = ApiConfig::from_lookup(lookup(&[("USE_PERSISTENT_STORES", "yes")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "USE_PERSISTENT_STORES", .. }));
    }

    #[test]
    fn rejects_inconsistent_page_sizes() {
        let err = ApiConfig::from_lookup(lookup(&[("PAGE_SIZE", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PAGE_SIZE", .. }));

        let err =
            ApiConfig::from_lookup(lookup(&[("PAGE_SIZE", "20"), ("MAX_PAGE_SIZE", "5")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "MAX_PAGE_SIZE", .. }));
    }

    #[test]
    fn blank_database_url_counts_as_unset() {
        let cfg = ApiConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap();
        assert_eq!(cfg.database_url, None);
    }
}
