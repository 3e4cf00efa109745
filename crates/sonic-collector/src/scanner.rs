use std::collections::BTreeMap;

use sonic_common::error::Result;
use sonic_redis::{Database, KeyValueStore};
use tracing::debug;

/// A hash record read from the store. Fields are kept sorted so that the
/// same source data always produces the same sample order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyRecord {
    pub key: String,
    pub fields: BTreeMap<String, String>,
}

impl KeyRecord {
    pub fn new(key: &str, fields: &[(&str, &str)]) -> Self {
        Self {
            key: key.to_string(),
            fields: fields
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The `index`th `separator`-delimited segment of the key.
    pub fn key_segment(&self, separator: char, index: usize) -> Option<&str> {
        self.key.split(separator).nth(index)
    }
}

/// Lists the keys matching `pattern`, sorted.
pub async fn list_keys(
    store: &mut dyn KeyValueStore,
    database: Database,
    pattern: &str,
) -> Result<Vec<String>> {
    let mut keys = store.keys(database, pattern).await?;
    keys.sort();
    keys.dedup();
    Ok(keys)
}

pub async fn fetch(store: &mut dyn KeyValueStore, database: Database, key: &str) -> Result<KeyRecord> {
    let fields = store.hgetall(database, key).await?;
    Ok(KeyRecord {
        key: key.to_string(),
        fields: fields.into_iter().collect(),
    })
}

/// Discovers every key matching `pattern` and fetches its hash. The first
/// failure aborts the scan; partial results are never returned.
pub async fn scan(
    store: &mut dyn KeyValueStore,
    database: Database,
    pattern: &str,
) -> Result<Vec<KeyRecord>> {
    let keys = list_keys(store, database, pattern).await?;
    let mut records = Vec::with_capacity(keys.len());
    for key in keys {
        records.push(fetch(store, database, &key).await?);
    }

    debug!(database = %database, pattern, records = records.len(), "scanned key space");
    Ok(records)
}
