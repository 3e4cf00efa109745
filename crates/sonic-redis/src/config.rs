use std::{fmt, str::FromStr, time::Duration};

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use sonic_common::error::{ExporterError, Result};

use crate::database::Database;

pub const DEFAULT_ADDRESS: &str = "localhost:6379";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Tcp,
    Unix,
}

impl FromStr for Network {
    type Err = ExporterError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "unix" => Ok(Self::Unix),
            other => Err(ExporterError::Config(format!(
                "unsupported redis network: {other}"
            ))),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::Unix => f.write_str("unix"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    pub address: String,
    pub password: String,
    pub network: Network,
    /// Upper bound on dialing and the connection handshake.
    pub connect_timeout: Duration,
    /// Upper bound on waiting for the reply to a single command.
    pub response_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            password: String::new(),
            network: Network::Tcp,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

impl RedisConfig {
    /// Reads `REDIS_ADDRESS`, `REDIS_PASSWORD`, `REDIS_NETWORK`,
    /// `REDIS_CONNECT_TIMEOUT` and `REDIS_RESPONSE_TIMEOUT` (seconds).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let address = lookup("REDIS_ADDRESS")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());
        let password = lookup("REDIS_PASSWORD").unwrap_or_default();
        let network = match lookup("REDIS_NETWORK") {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => Network::Tcp,
        };
        let connect_timeout =
            parse_timeout(&lookup, "REDIS_CONNECT_TIMEOUT")?.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let response_timeout =
            parse_timeout(&lookup, "REDIS_RESPONSE_TIMEOUT")?.unwrap_or(DEFAULT_RESPONSE_TIMEOUT);

        Ok(Self {
            address,
            password,
            network,
            connect_timeout,
            response_timeout,
        })
    }

    pub fn connection_url(&self, database: Database) -> String {
        let password = utf8_percent_encode(&self.password, NON_ALPHANUMERIC).to_string();

        match self.network {
            Network::Tcp if password.is_empty() => {
                format!("redis://{}/{}", self.address, database.index())
            }
            Network::Tcp => format!("redis://:{password}@{}/{}", self.address, database.index()),
            Network::Unix if password.is_empty() => {
                format!("redis+unix://{}?db={}", self.address, database.index())
            }
            Network::Unix => format!(
                "redis+unix://{}?db={}&pass={password}",
                self.address,
                database.index()
            ),
        }
    }
}

fn parse_timeout<F>(lookup: &F, name: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(name).filter(|value| !value.trim().is_empty()) else {
        return Ok(None);
    };

    match value.trim().parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds > 0.0 => {
            Ok(Some(Duration::from_secs_f64(seconds)))
        }
        _ => Err(ExporterError::Config(format!(
            "{name} must be a positive number of seconds: {value}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use super::{Network, RedisConfig};
    use crate::database::Database;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = RedisConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, RedisConfig::default());
        assert_eq!(
            config.connection_url(Database::State),
            "redis://localhost:6379/6"
        );
    }

    #[test]
    fn password_is_percent_encoded() {
        let config = RedisConfig::from_lookup(lookup(&[
            ("REDIS_ADDRESS", "10.0.0.1:6380"),
            ("REDIS_PASSWORD", "p@ss/word"),
        ]))
        .unwrap();

        assert_eq!(
            config.connection_url(Database::Counters),
            "redis://:p%40ss%2Fword@10.0.0.1:6380/2"
        );
    }

    #[test]
    fn unix_socket_network_is_supported() {
        let config = RedisConfig::from_lookup(lookup(&[
            ("REDIS_ADDRESS", "/var/run/redis/redis.sock"),
            ("REDIS_NETWORK", "unix"),
        ]))
        .unwrap();

        assert_eq!(config.network, Network::Unix);
        assert_eq!(
            config.connection_url(Database::Appl),
            "redis+unix:///var/run/redis/redis.sock?db=0"
        );
    }

    #[test]
    fn unknown_network_is_rejected() {
        let result = RedisConfig::from_lookup(lookup(&[("REDIS_NETWORK", "udp")]));
        assert!(result.is_err());
    }

    #[test]
    fn timeouts_default_and_can_be_overridden() {
        let config = RedisConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.response_timeout, Duration::from_secs(3));

        let config = RedisConfig::from_lookup(lookup(&[
            ("REDIS_CONNECT_TIMEOUT", "1.5"),
            ("REDIS_RESPONSE_TIMEOUT", "10"),
        ]))
        .unwrap();
        assert_eq!(config.connect_timeout, Duration::from_millis(1500));
        assert_eq!(config.response_timeout, Duration::from_secs(10));
    }

    #[test]
    fn invalid_timeouts_are_rejected() {
        assert!(RedisConfig::from_lookup(lookup(&[("REDIS_CONNECT_TIMEOUT", "soon")])).is_err());
        assert!(RedisConfig::from_lookup(lookup(&[("REDIS_RESPONSE_TIMEOUT", "0")])).is_err());
    }
}
