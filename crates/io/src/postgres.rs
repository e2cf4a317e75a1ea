//! PostgreSQL (TimescaleDB) backend for the location history table.

use model::StoredRecord;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;

use crate::{Connector, StoreConnection, StoreError};

pub const DEFAULT_TABLE: &str = "lh";

/// Connection parameters for the row store.
#[derive(Clone, Serialize, Deserialize)]
pub struct PgConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Target table, default "lh".
    pub table: String,
}

impl Default for PgConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            database: "postgres".into(),
            user: "postgres".into(),
            password: String::new(),
            table: DEFAULT_TABLE.into(),
        }
    }
}

impl std::fmt::Debug for PgConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl PgConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password)
    }

    /// postgres:// address with the password masked.
    pub fn redacted_url(&self) -> String {
        format!(
            "postgres://{}:***@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

/// One-row insert into `table`. The timestamp is bound as text and cast by the server.
pub fn insert_sql(table: &str) -> String {
    format!(
        "insert into {table}(sid, time, lat, lon, alt, spd, dir_s, rssi, opt) \
         values($1, $2::timestamp, $3, $4, $5, $6, $7, $8, $9)"
    )
}

#[derive(Debug, Clone)]
pub struct PgConnector {
    cfg: PgConfig,
    insert_sql: String,
}

impl PgConnector {
    pub fn new(cfg: PgConfig) -> Self {
        let insert_sql = insert_sql(&cfg.table);
        Self { cfg, insert_sql }
    }

    pub fn config(&self) -> &PgConfig {
        &self.cfg
    }
}

/// A single dedicated connection; no pool, so liveness is explicit.
pub struct PgStore {
    conn: PgConnection,
    insert_sql: String,
}

impl PgStore {
    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.conn
    }
}

#[async_trait::async_trait]
impl Connector for PgConnector {
    type Conn = PgStore;

    async fn connect(&self) -> Result<PgStore, StoreError> {
        let conn = PgConnection::connect_with(&self.cfg.connect_options())
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", self.cfg.redacted_url())))?;
        Ok(PgStore { conn, insert_sql: self.insert_sql.clone() })
    }

    fn describe(&self) -> String {
        self.cfg.redacted_url()
    }
}

#[async_trait::async_trait]
impl StoreConnection for PgStore {
    async fn ping(&mut self) -> Result<(), StoreError> {
        self.conn
            .ping()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn insert(&mut self, record: &StoredRecord) -> Result<u64, StoreError> {
        let done = sqlx::query(&self.insert_sql)
            .bind(record.identity.get())
            .bind(&record.timestamp)
            .bind(record.latitude)
            .bind(record.longitude)
            .bind(record.altitude)
            .bind(record.speed)
            .bind(record.heading)
            .bind(record.signal_strength)
            .bind(&record.metadata)
            .execute(&mut self.conn)
            .await
            .map_err(|e| StoreError::Insert(e.to_string()))?;
        Ok(done.rows_affected())
    }
}
