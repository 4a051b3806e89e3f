use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{Map, Value};

use crate::ports::host::{HostSession, SessionError};

/// In-memory request session.
///
/// Used when a login happens on a request that arrived without a host
/// session, and by tests. Clones share the same entries.
#[derive(Debug, Default, Clone)]
pub struct MemorySession {
    entries: Arc<DashMap<String, Value>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(entries: Map<String, Value>) -> Self {
        let session = Self::new();
        for (key, value) in entries {
            session.entries.insert(key, value);
        }
        session
    }

    /// Copy of every entry, for inspection.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HostSession for MemorySession {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn insert(&self, key: &str, value: Value) -> Result<(), SessionError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Option<Value> {
        self.entries.remove(key).map(|(_, value)| value)
    }
}
