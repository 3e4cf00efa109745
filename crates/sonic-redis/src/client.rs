use std::{borrow::Cow, collections::HashMap};

use async_trait::async_trait;
use redis::{AsyncConnectionConfig, Client, RedisError, aio::MultiplexedConnection};
use sonic_common::error::{ExporterError, Result};
use tracing::{debug, trace};

use crate::{
    config::RedisConfig,
    database::Database,
    store::{KeyValueStore, StoreConnector},
};

#[derive(Debug, Clone)]
pub struct RedisConnector {
    config: RedisConfig,
}

impl RedisConnector {
    pub fn new(config: RedisConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(RedisConfig::from_env()?))
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }
}

#[async_trait]
impl StoreConnector for RedisConnector {
    async fn connect(&self) -> Result<Box<dyn KeyValueStore>> {
        Ok(Box::new(RedisStore::new(self.config.clone())))
    }
}

/// A scrape-scoped Redis session. One multiplexed connection per logical
/// database is opened on first use and closed when the store is dropped.
/// Dialing and every command are bounded by the configured timeouts.
pub struct RedisStore {
    config: RedisConfig,
    connections: HashMap<Database, MultiplexedConnection>,
}

impl RedisStore {
    pub fn new(config: RedisConfig) -> Self {
        Self {
            config,
            connections: HashMap::new(),
        }
    }

    async fn connection(&mut self, database: Database) -> Result<&mut MultiplexedConnection> {
        if !self.connections.contains_key(&database) {
            let client = Client::open(self.config.connection_url(database)).map_err(|err| {
                ExporterError::Config(format!("invalid redis settings for {database}: {err}"))
            })?;
            let timeouts = AsyncConnectionConfig::new()
                .set_connection_timeout(self.config.connect_timeout)
                .set_response_timeout(self.config.response_timeout);
            let connection = client
                .get_multiplexed_async_connection_with_config(&timeouts)
                .await
                .map_err(|err| {
                    ExporterError::StoreUnavailable(format!(
                        "{database} at {}: {err}",
                        self.config.address
                    ))
                })?;
            debug!(database = %database, "opened redis connection");
            self.connections.insert(database, connection);
        }

        self.connections.get_mut(&database).ok_or_else(|| {
            ExporterError::StoreUnavailable(format!("{database} connection missing"))
        })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn keys(&mut self, database: Database, pattern: &str) -> Result<Vec<String>> {
        let connection = self.connection(database).await?;
        let keys: Vec<Vec<u8>> = redis::cmd("KEYS")
            .arg(pattern)
            .query_async(connection)
            .await
            .map_err(|err| command_error(database, pattern, err))?;
        Ok(keys.iter().map(|key| decode(database, key)).collect())
    }

    async fn hgetall(&mut self, database: Database, key: &str) -> Result<HashMap<String, String>> {
        let connection = self.connection(database).await?;
        let fields: HashMap<Vec<u8>, Vec<u8>> = redis::cmd("HGETALL")
            .arg(key)
            .query_async(connection)
            .await
            .map_err(|err| command_error(database, key, err))?;
        Ok(fields
            .iter()
            .map(|(field, value)| (decode(database, field), decode(database, value)))
            .collect())
    }
}

/// Store values are arbitrary bytes; invalid UTF-8 is replaced rather than
/// failing the whole reply.
fn decode(database: Database, raw: &[u8]) -> String {
    match String::from_utf8_lossy(raw) {
        Cow::Borrowed(value) => value.to_string(),
        Cow::Owned(value) => {
            trace!(database = %database, value = %value, "replaced invalid utf-8 in reply");
            value
        }
    }
}

fn command_error(database: Database, target: &str, err: RedisError) -> ExporterError {
    if err.is_io_error()
        || err.is_timeout()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
    {
        return ExporterError::StoreUnavailable(format!("{database}: {err}"));
    }

    ExporterError::ScanFailed {
        database: database.name().to_string(),
        pattern: target.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, io, time::Duration};

    use redis::{ErrorKind, RedisError};
    use sonic_common::ExporterError;
    use tokio::{
        io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
        net::{TcpListener, TcpStream},
    };

    use super::{RedisStore, command_error};
    use crate::{config::RedisConfig, database::Database, glob::glob_match, store::KeyValueStore};

    type Hashes = HashMap<String, Vec<(&'static str, &'static [u8])>>;

    fn config(address: String) -> RedisConfig {
        RedisConfig {
            address,
            connect_timeout: Duration::from_millis(300),
            response_timeout: Duration::from_millis(300),
            ..RedisConfig::default()
        }
    }

    /// Minimal RESP2 server: KEYS and HGETALL are answered from `hashes`,
    /// HGETALL on `BROKEN` returns an error reply, KEYS on `STALL` never
    /// answers, anything else is acknowledged with `+OK`.
    async fn serve(hashes: Hashes) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(answer(stream, hashes.clone()));
            }
        });
        address
    }

    async fn answer(stream: TcpStream, hashes: Hashes) {
        let mut reader = BufReader::new(stream);
        while let Some(args) = read_command(&mut reader).await {
            let command = String::from_utf8_lossy(&args[0]).to_ascii_uppercase();
            let target = args
                .get(1)
                .map(|arg| String::from_utf8_lossy(arg).to_string())
                .unwrap_or_default();

            let mut reply = Vec::new();
            match command.as_str() {
                "KEYS" if target == "STALL" => continue,
                "KEYS" => {
                    let keys: Vec<&String> =
                        hashes.keys().filter(|key| glob_match(&target, key)).collect();
                    reply.extend_from_slice(format!("*{}\r\n", keys.len()).as_bytes());
                    for key in keys {
                        bulk(&mut reply, key.as_bytes());
                    }
                }
                "HGETALL" if target == "BROKEN" => {
                    reply.extend_from_slice(b"-WRONGTYPE Operation against a key holding the wrong kind of value\r\n");
                }
                "HGETALL" => {
                    let fields = hashes.get(&target).cloned().unwrap_or_default();
                    reply.extend_from_slice(format!("*{}\r\n", fields.len() * 2).as_bytes());
                    for (field, value) in fields {
                        bulk(&mut reply, field.as_bytes());
                        bulk(&mut reply, value);
                    }
                }
                _ => reply.extend_from_slice(b"+OK\r\n"),
            }

            if reader.get_mut().write_all(&reply).await.is_err() {
                return;
            }
        }
    }

    async fn read_command(reader: &mut BufReader<TcpStream>) -> Option<Vec<Vec<u8>>> {
        let mut line = String::new();
        if reader.read_line(&mut line).await.ok()? == 0 {
            return None;
        }
        let count: usize = line.trim().strip_prefix('*')?.parse().ok()?;

        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            line.clear();
            reader.read_line(&mut line).await.ok()?;
            let len: usize = line.trim().strip_prefix('$')?.parse().ok()?;
            let mut arg = vec![0; len + 2];
            reader.read_exact(&mut arg).await.ok()?;
            arg.truncate(len);
            args.push(arg);
        }
        Some(args)
    }

    fn bulk(reply: &mut Vec<u8>, value: &[u8]) {
        reply.extend_from_slice(format!("${}\r\n", value.len()).as_bytes());
        reply.extend_from_slice(value);
        reply.extend_from_slice(b"\r\n");
    }

    #[tokio::test]
    async fn keys_and_hashes_are_read_over_resp() {
        let mut hashes = Hashes::new();
        hashes.insert(
            "PSU_INFO|PSU1".to_string(),
            vec![("status", b"true".as_slice()), ("input_voltage", b"12.1".as_slice())],
        );
        hashes.insert("FAN_INFO|fan1".to_string(), vec![("speed", b"900".as_slice())]);
        let mut store = RedisStore::new(config(serve(hashes).await));

        let keys = store.keys(Database::State, "PSU_INFO|*").await.unwrap();
        assert_eq!(keys, vec!["PSU_INFO|PSU1".to_string()]);

        let fields = store.hgetall(Database::State, "PSU_INFO|PSU1").await.unwrap();
        assert_eq!(fields.get("status").map(String::as_str), Some("true"));
        assert_eq!(fields.get("input_voltage").map(String::as_str), Some("12.1"));

        let missing = store.hgetall(Database::State, "PSU_INFO|PSU9").await.unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn invalid_utf8_value_does_not_fail_the_hash() {
        let mut hashes = Hashes::new();
        hashes.insert(
            "PSU_INFO|PSU1".to_string(),
            vec![("status", b"true".as_slice()), ("model", b"\xff\xfe".as_slice())],
        );
        let mut store = RedisStore::new(config(serve(hashes).await));

        let fields = store.hgetall(Database::State, "PSU_INFO|PSU1").await.unwrap();
        assert_eq!(fields.get("status").map(String::as_str), Some("true"));
        assert_eq!(fields.get("model").map(String::as_str), Some("\u{FFFD}\u{FFFD}"));
    }

    #[tokio::test]
    async fn error_reply_is_a_scan_failure() {
        let mut store = RedisStore::new(config(serve(Hashes::new()).await));

        let err = store.hgetall(Database::Counters, "BROKEN").await.unwrap_err();
        assert!(matches!(
            err,
            ExporterError::ScanFailed { ref database, ref pattern, .. }
                if database == "COUNTERS_DB" && pattern == "BROKEN"
        ));
    }

    #[tokio::test]
    async fn silent_server_fails_within_the_connect_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });
        let mut store = RedisStore::new(config(address));

        let result = tokio::time::timeout(Duration::from_secs(5), store.keys(Database::State, "*"))
            .await
            .expect("keys must not hang on a silent server");
        assert!(matches!(result, Err(ExporterError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn stalled_reply_fails_within_the_response_timeout() {
        let mut store = RedisStore::new(config(serve(Hashes::new()).await));

        let result =
            tokio::time::timeout(Duration::from_secs(5), store.keys(Database::State, "STALL"))
                .await
                .expect("keys must not hang on a stalled reply");
        assert!(matches!(result, Err(ExporterError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn refused_connection_is_store_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);
        let mut store = RedisStore::new(config(address));

        let result = store.hgetall(Database::Appl, "PORT_TABLE:Ethernet0").await;
        assert!(matches!(result, Err(ExporterError::StoreUnavailable(_))));
    }

    #[test]
    fn transport_and_reply_errors_are_told_apart() {
        let timed_out = RedisError::from(io::Error::from(io::ErrorKind::TimedOut));
        assert!(matches!(
            command_error(Database::State, "FAN_INFO|*", timed_out),
            ExporterError::StoreUnavailable(_)
        ));

        let reset = RedisError::from(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(matches!(
            command_error(Database::State, "FAN_INFO|*", reset),
            ExporterError::StoreUnavailable(_)
        ));

        let reply = RedisError::from((ErrorKind::TypeError, "unexpected reply"));
        assert!(matches!(
            command_error(Database::State, "FAN_INFO|*", reply),
            ExporterError::ScanFailed { .. }
        ));
    }
}
