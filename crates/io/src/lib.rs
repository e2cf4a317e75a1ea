//! Persistence of enriched records into the location history store.

use model::StoredRecord;

pub mod memory;
pub mod postgres;
pub mod schema;

pub use memory::{MemoryConnector, MemoryStore};
pub use postgres::{PgConfig, PgConnector};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unavailable(String),
    #[error("insert failed: {0}")]
    Insert(String),
}

/// A live connection to the row store.
#[async_trait::async_trait]
pub trait StoreConnection: Send {
    /// Lightweight liveness probe.
    async fn ping(&mut self) -> Result<(), StoreError>;

    /// Inserts one row, returning the number of rows written.
    async fn insert(&mut self, record: &StoredRecord) -> Result<u64, StoreError>;
}

/// Opens connections to the row store.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    type Conn: StoreConnection;

    async fn connect(&self) -> Result<Self::Conn, StoreError>;

    /// Where the connector points, for logs.
    fn describe(&self) -> String;
}

/// Best-effort appender: probe, reconnect at most once, insert once.
///
/// A failed append is logged and handed back to the caller; it is never
/// retried and the record is not kept anywhere.
pub struct PersistenceWriter<C: Connector> {
    connector: C,
    conn: Option<C::Conn>,
}

impl<C: Connector> PersistenceWriter<C> {
    /// Opens the initial connection. Failing here is a startup error.
    pub async fn connect(connector: C) -> Result<Self, StoreError> {
        tracing::info!(store = %connector.describe(), "connecting to store");
        let mut conn = connector.connect().await?;
        conn.ping().await?;
        Ok(Self { connector, conn: Some(conn) })
    }

    /// Writer without an open connection; the first append connects.
    #[cfg(test)]
    fn lazy(connector: C) -> Self {
        Self { connector, conn: None }
    }

    #[cfg(test)]
    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    pub async fn append(&mut self, record: &StoredRecord) -> Result<u64, StoreError> {
        let conn = match self.live_connection().await {
            Ok(conn) => conn,
            Err(err) => {
                tracing::error!(identity = %record.identity, error = %err, "dropping record, store unavailable");
                return Err(err);
            }
        };
        match conn.insert(record).await {
            Ok(rows) => {
                tracing::debug!(identity = %record.identity, rows, "stored record");
                Ok(rows)
            }
            Err(err) => {
                tracing::warn!(identity = %record.identity, error = %err, "insert failed");
                Err(err)
            }
        }
    }

    async fn live_connection(&mut self) -> Result<&mut C::Conn, StoreError> {
        let alive = match self.conn.as_mut() {
            Some(conn) => match conn.ping().await {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(error = %err, "store liveness check failed");
                    false
                }
            },
            None => false,
        };

        if !alive {
            self.conn = None;
            tracing::info!(store = %self.connector.describe(), "reconnecting to store");
            let conn = self.connector.connect().await?;
            self.conn = Some(conn);
        }

        self.conn
            .as_mut()
            .ok_or_else(|| StoreError::Unavailable("no connection".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{Identity, DEFAULT_METADATA};

    fn create_test_record(identity: i32) -> StoredRecord {
        StoredRecord {
            identity: Identity(identity),
            timestamp: "2023-01-01 10:00:00.000000Z".into(),
            latitude: 35.5,
            longitude: 139.5,
            altitude: 10.0,
            speed: 5.0,
            heading: 0.0,
            signal_strength: -60.0,
            metadata: DEFAULT_METADATA.into(),
        }
    }

    #[tokio::test]
    async fn test_append_adds_one_row() {
        let store = MemoryStore::new();
        let mut writer = PersistenceWriter::connect(store.connector()).await.unwrap();

        assert_eq!(writer.append(&create_test_record(30012)).await.unwrap(), 1);
        assert_eq!(store.row_count(), 1);
        assert_eq!(store.rows()[0].identity, Identity(30012));
        assert_eq!(store.connects(), 1);
    }

    #[tokio::test]
    async fn test_reconnects_once_after_failed_ping() {
        let store = MemoryStore::new();
        let mut writer = PersistenceWriter::connect(store.connector()).await.unwrap();

        store.drop_connections();
        assert_eq!(writer.append(&create_test_record(1)).await.unwrap(), 1);
        assert_eq!(store.connects(), 2);
        assert_eq!(store.row_count(), 1);
    }

    #[tokio::test]
    async fn test_refused_reconnect_abandons_write() {
        let store = MemoryStore::new();
        let mut writer = PersistenceWriter::connect(store.connector()).await.unwrap();

        store.drop_connections();
        store.set_refuse_connections(true);
        let err = writer.append(&create_test_record(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.row_count(), 0);
        // one attempt, not a loop
        assert_eq!(store.connect_attempts(), 2);
        assert!(!writer.is_connected());

        store.set_refuse_connections(false);
        assert_eq!(writer.append(&create_test_record(1)).await.unwrap(), 1);
        assert_eq!(store.row_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_insert_is_not_retried() {
        let store = MemoryStore::new();
        let mut writer = PersistenceWriter::connect(store.connector()).await.unwrap();

        store.set_fail_inserts(true);
        assert!(matches!(
            writer.append(&create_test_record(1)).await,
            Err(StoreError::Insert(_))
        ));
        assert_eq!(store.insert_attempts(), 1);
        assert_eq!(store.row_count(), 0);
        assert!(writer.is_connected());
    }

    #[tokio::test]
    async fn test_initial_connect_failure_is_an_error() {
        let store = MemoryStore::new();
        store.set_refuse_connections(true);
        assert!(PersistenceWriter::connect(store.connector()).await.is_err());
    }

    #[tokio::test]
    async fn test_lazy_writer_connects_on_first_append() {
        let store = MemoryStore::new();
        let mut writer = PersistenceWriter::lazy(store.connector());
        assert!(!writer.is_connected());
        writer.append(&create_test_record(1)).await.unwrap();
        assert!(writer.is_connected());
        assert_eq!(store.connects(), 1);
    }
}
