use std::str::FromStr;
use std::time::Duration;

use ddms_events::NotifierConfig;
use ddms_modbus::{CollectorConfig, PollingConfig};

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Poller configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_format: LogFormat,
    pub polling: PollingConfig,
}

impl PollerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                      | Default  |
    /// |------------------------------|----------|
    /// | `DATABASE_URL`               | required |
    /// | `DB_MAX_CONNECTIONS`         | `10`     |
    /// | `MODBUS_TIMEOUT_SECS`        | `10`     |
    /// | `MODBUS_RETRIES`             | `3`      |
    /// | `RECONNECT_DELAY_SECS`       | `60`     |
    /// | `FAILURE_THRESHOLD`          | `3`      |
    /// | `NOTIFICATION_COOLDOWN_SECS` | `300`    |
    /// | `LOG_FORMAT`                 | `text`   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let db_max_connections: u32 =
            parse_or(&lookup, "DB_MAX_CONNECTIONS", 10, "a positive integer")?;
        let timeout_secs: u64 = parse_or(&lookup, "MODBUS_TIMEOUT_SECS", 10, "a number of seconds")?;
        let retries: u32 = parse_or(&lookup, "MODBUS_RETRIES", 3, "a positive integer")?;
        let reconnect_secs: u64 =
            parse_or(&lookup, "RECONNECT_DELAY_SECS", 60, "a number of seconds")?;
        let failure_threshold: u32 =
            parse_or(&lookup, "FAILURE_THRESHOLD", 3, "a positive integer")?;
        let cooldown_secs: u64 =
            parse_or(&lookup, "NOTIFICATION_COOLDOWN_SECS", 300, "a number of seconds")?;

        for (name, value) in [
            ("DB_MAX_CONNECTIONS", u64::from(db_max_connections)),
            ("MODBUS_RETRIES", u64::from(retries)),
            ("FAILURE_THRESHOLD", u64::from(failure_threshold)),
            ("MODBUS_TIMEOUT_SECS", timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    name,
                    expected: "greater than zero",
                    value: value.to_string(),
                });
            }
        }

        let log_format = match lookup("LOG_FORMAT") {
            None => LogFormat::Text,
            Some(v) => match v.trim().to_ascii_lowercase().as_str() {
                "" | "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "LOG_FORMAT",
                        expected: "'text' or 'json'",
                        value: v,
                    })
                }
            },
        };

        let polling = PollingConfig {
            reconnect_delay: Duration::from_secs(reconnect_secs),
            failure_threshold,
            collector: CollectorConfig {
                timeout: Duration::from_secs(timeout_secs),
                retries,
                ..CollectorConfig::default()
            },
            notifier: NotifierConfig {
                cooldown: Duration::from_secs(cooldown_secs),
            },
        };

        Ok(Self {
            database_url,
            db_max_connections,
            log_format,
            polling,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<PollerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PollerConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/ddms")]).unwrap();

        assert_eq!(config.database_url, "postgres://localhost/ddms");
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.polling.reconnect_delay, Duration::from_secs(60));
        assert_eq!(config.polling.failure_threshold, 3);
        assert_eq!(config.polling.collector.timeout, Duration::from_secs(10));
        assert_eq!(config.polling.collector.retries, 3);
        assert_eq!(config.polling.collector.retry_pause, Duration::from_secs(1));
        assert_eq!(config.polling.notifier.cooldown, Duration::from_secs(300));
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db/ddms"),
            ("DB_MAX_CONNECTIONS", "25"),
            ("MODBUS_TIMEOUT_SECS", "3"),
            ("MODBUS_RETRIES", "5"),
            ("RECONNECT_DELAY_SECS", "15"),
            ("FAILURE_THRESHOLD", "2"),
            ("NOTIFICATION_COOLDOWN_SECS", "60"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();

        assert_eq!(config.db_max_connections, 25);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.polling.reconnect_delay, Duration::from_secs(15));
        assert_eq!(config.polling.failure_threshold, 2);
        assert_eq!(config.polling.collector.timeout, Duration::from_secs(3));
        assert_eq!(config.polling.collector.retries, 5);
        assert_eq!(config.polling.notifier.cooldown, Duration::from_secs(60));
    }

    #[test]
    fn database_url_is_required() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::Missing("DATABASE_URL"));
        assert_eq!(
            load(&[("DATABASE_URL", "  ")]).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
    }

    #[test]
    fn rejects_malformed_values() {
        assert_matches!(
            load(&[("DATABASE_URL", "postgres://x"), ("MODBUS_RETRIES", "many")]),
            Err(ConfigError::Invalid { name: "MODBUS_RETRIES", .. })
        );
        assert_matches!(
            load(&[("DATABASE_URL", "postgres://x"), ("FAILURE_THRESHOLD", "0")]),
            Err(ConfigError::Invalid { name: "FAILURE_THRESHOLD", .. })
        );
        assert_matches!(
            load(&[("DATABASE_URL", "postgres://x"), ("LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid { name: "LOG_FORMAT", .. })
        );
    }
}
