//! In-process row store for dry runs and tests.

use std::sync::Arc;

use model::StoredRecord;
use parking_lot::Mutex;

use crate::{Connector, StoreConnection, StoreError};

#[derive(Debug, Default)]
struct State {
    rows: Vec<StoredRecord>,
    /// bumped to invalidate every open connection
    generation: u64,
    refuse_connections: bool,
    fail_inserts: bool,
    connect_attempts: usize,
    connects: usize,
    insert_attempts: usize,
}

/// Shared handle to the rows and failure switches of an in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector { state: self.state.clone() }
    }

    pub fn rows(&self) -> Vec<StoredRecord> {
        self.state.lock().rows.clone()
    }

    pub fn row_count(&self) -> usize {
        self.state.lock().rows.len()
    }

    /// Makes every open connection fail its next liveness check.
    pub fn drop_connections(&self) {
        self.state.lock().generation += 1;
    }

    pub fn set_refuse_connections(&self, refuse: bool) {
        self.state.lock().refuse_connections = refuse;
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        self.state.lock().fail_inserts = fail;
    }

    pub fn connect_attempts(&self) -> usize {
        self.state.lock().connect_attempts
    }

    /// Successful connects only.
    pub fn connects(&self) -> usize {
        self.state.lock().connects
    }

    pub fn insert_attempts(&self) -> usize {
        self.state.lock().insert_attempts
    }
}

#[derive(Debug, Clone)]
pub struct MemoryConnector {
    state: Arc<Mutex<State>>,
}

#[derive(Debug)]
pub struct MemoryConnection {
    state: Arc<Mutex<State>>,
    generation: u64,
}

#[async_trait::async_trait]
impl Connector for MemoryConnector {
    type Conn = MemoryConnection;

    async fn connect(&self) -> Result<MemoryConnection, StoreError> {
        let mut st = self.state.lock();
        st.connect_attempts += 1;
        if st.refuse_connections {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        st.connects += 1;
        Ok(MemoryConnection { state: self.state.clone(), generation: st.generation })
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[async_trait::async_trait]
impl StoreConnection for MemoryConnection {
    async fn ping(&mut self) -> Result<(), StoreError> {
        if self.state.lock().generation == self.generation {
            Ok(())
        } else {
            Err(StoreError::Unavailable("connection closed".into()))
        }
    }

    async fn insert(&mut self, record: &StoredRecord) -> Result<u64, StoreError> {
        let mut st = self.state.lock();
        st.insert_attempts += 1;
        if st.fail_inserts {
            return Err(StoreError::Insert("insert rejected".into()));
        }
        tracing::debug!(row = %serde_json::to_string(record).unwrap_or_default(), "memory insert");
        st.rows.push(record.clone());
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dropped_connection_fails_ping() {
        let store = MemoryStore::new();
        let mut conn = store.connector().connect().await.unwrap();
        assert!(conn.ping().await.is_ok());
        store.drop_connections();
        assert!(conn.ping().await.is_err());

        let mut fresh = store.connector().connect().await.unwrap();
        assert!(fresh.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_counters() {
        let store = MemoryStore::new();
        store.set_refuse_connections(true);
        assert!(store.connector().connect().await.is_err());
        assert_eq!(store.connect_attempts(), 1);
        assert_eq!(store.connects(), 0);
    }
}
