use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use sonic_common::error::{ExporterError, Result};

use crate::{
    database::Database,
    glob::glob_match,
    store::{KeyValueStore, StoreConnector},
};

/// In-process stand-in for the SONiC Redis instance. Clones share the same
/// data set and counters.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    hashes: HashMap<Database, BTreeMap<String, HashMap<String, String>>>,
    unavailable: bool,
    failing: HashSet<(Database, String)>,
    latency: Option<Duration>,
    connects: usize,
    open_sessions: usize,
    commands: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_hash(&self, database: Database, key: &str, fields: &[(&str, &str)]) {
        let fields = fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        self.state()
            .hashes
            .entry(database)
            .or_default()
            .insert(key.to_string(), fields);
    }

    pub fn remove_hash(&self, database: Database, key: &str) {
        if let Some(keys) = self.state().hashes.get_mut(&database) {
            keys.remove(key);
        }
    }

    /// Makes every subsequent `connect` fail with `StoreUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// Makes `keys` for this exact pattern, or `hgetall` for this exact key,
    /// fail with `ScanFailed`.
    pub fn fail_on(&self, database: Database, target: &str) {
        self.state().failing.insert((database, target.to_string()));
    }

    pub fn clear_failures(&self) {
        self.state().failing.clear();
    }

    /// Delays every command, to widen the window in which scrapes could overlap.
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = Some(latency);
    }

    pub fn connect_count(&self) -> usize {
        self.state().connects
    }

    pub fn command_count(&self) -> usize {
        self.state().commands
    }

    pub fn open_sessions(&self) -> usize {
        self.state().open_sessions
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Records one command and returns the configured latency.
    fn begin_command(&self, database: Database, target: &str) -> Result<Option<Duration>> {
        let mut state = self.state();
        state.commands += 1;
        if state.failing.contains(&(database, target.to_string())) {
            return Err(ExporterError::ScanFailed {
                database: database.name().to_string(),
                pattern: target.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(state.latency)
    }
}

#[async_trait]
impl StoreConnector for MemoryStore {
    async fn connect(&self) -> Result<Box<dyn KeyValueStore>> {
        let mut state = self.state();
        state.connects += 1;
        if state.unavailable {
            return Err(ExporterError::StoreUnavailable(
                "memory store marked unavailable".to_string(),
            ));
        }
        state.open_sessions += 1;
        drop(state);

        Ok(Box::new(MemorySession {
            store: self.clone(),
        }))
    }
}

/// One scrape's view of a [`MemoryStore`].
pub struct MemorySession {
    store: MemoryStore,
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        let mut state = self.store.state();
        state.open_sessions = state.open_sessions.saturating_sub(1);
    }
}

#[async_trait]
impl KeyValueStore for MemorySession {
    async fn keys(&mut self, database: Database, pattern: &str) -> Result<Vec<String>> {
        if let Some(latency) = self.store.begin_command(database, pattern)? {
            tokio::time::sleep(latency).await;
        }

        let state = self.store.state();
        Ok(state
            .hashes
            .get(&database)
            .map(|keys| {
                keys.keys()
                    .filter(|key| glob_match(pattern, key))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn hgetall(&mut self, database: Database, key: &str) -> Result<HashMap<String, String>> {
        if let Some(latency) = self.store.begin_command(database, key)? {
            tokio::time::sleep(latency).await;
        }

        let state = self.store.state();
        Ok(state
            .hashes
            .get(&database)
            .and_then(|keys| keys.get(key))
            .cloned()
            .unwrap_or_default())
    }
}
