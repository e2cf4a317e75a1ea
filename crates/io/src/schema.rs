//! One-time table setup: hypertable partitioning and chunk tiering.
//!
//! Run before the pipeline starts. Any failure here aborts startup, except
//! the lookup of an existing tiering job, which is only logged.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnection;

/// Partitioning and tiering parameters for the location history table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub table: String,
    /// Hypertable chunk width, as a SQL interval.
    pub chunk_interval: String,
    /// Tablespace recent chunks live in.
    pub fast_tablespace: String,
    /// Tablespace old chunks are moved to.
    pub slow_tablespace: String,
    /// Chunk age before it is moved.
    pub move_lag: String,
    /// How often the move job runs.
    pub job_interval: String,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            table: crate::postgres::DEFAULT_TABLE.into(),
            chunk_interval: "15 mins".into(),
            fast_tablespace: "fast_space".into(),
            slow_tablespace: "slow_space".into(),
            move_lag: "1 hour".into(),
            job_interval: "5m".into(),
        }
    }
}

const MOVE_JOB_PROC: &str = "move_old_chunks";

impl SchemaConfig {
    /// Statements applied in order; each must succeed.
    pub fn statements(&self) -> Vec<(&'static str, String)> {
        let t = &self.table;
        vec![
            (
                "create table",
                format!(
                    "create table if not exists {t}(sid INT not null, time TIMESTAMP not null, \
                     lat DOUBLE PRECISION NOT NULL DEFAULT 0, lon DOUBLE PRECISION NOT NULL DEFAULT 0, \
                     alt DOUBLE PRECISION NOT NULL DEFAULT 0, spd DOUBLE PRECISION NOT NULL DEFAULT 0, \
                     acc DOUBLE PRECISION NOT NULL DEFAULT 0, dir_s DOUBLE PRECISION NOT NULL DEFAULT 0, \
                     dir_a DOUBLE PRECISION NOT NULL DEFAULT 0, rssi DOUBLE PRECISION NOT NULL DEFAULT 0, \
                     opt VARCHAR(4096) NOT NULL DEFAULT '')"
                ),
            ),
            (
                "create_hypertable",
                format!(
                    "SELECT create_hypertable('{t}', 'time', migrate_data => true, if_not_exists => true, \
                     chunk_time_interval => INTERVAL '{}')",
                    self.chunk_interval
                ),
            ),
            (
                "attach_tablespace",
                format!(
                    "SELECT attach_tablespace('{}', '{t}', if_not_attached => true)",
                    self.fast_tablespace
                ),
            ),
            ("cluster", format!("CLUSTER {t} USING {t}_time_idx")),
        ]
    }

    pub fn job_count_sql(&self) -> String {
        format!(
            "select count(*) from timescaledb_information.jobs where proc_name like '{MOVE_JOB_PROC}' \
             and config?'hypertable' and config->>'hypertable' like '{}'",
            self.table
        )
    }

    pub fn add_job_sql(&self) -> String {
        format!(
            "SELECT add_job('{MOVE_JOB_PROC}', '{}', config => '{{\"hypertable\":\"{}\",\"lag\":\"{}\",\"tablespace\":\"{}\"}}')",
            self.job_interval, self.table, self.move_lag, self.slow_tablespace
        )
    }
}

/// Applies the table setup over an open connection.
pub async fn setup(conn: &mut PgConnection, cfg: &SchemaConfig) -> Result<()> {
    tracing::info!(table = %cfg.table, "setting up schema");

    for (step, sql) in cfg.statements() {
        sqlx::query(&sql)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("{step} on {}", cfg.table))?;
        tracing::debug!(step, "schema step applied");
    }

    let count = sqlx::query_scalar::<_, i64>(&cfg.job_count_sql())
        .fetch_one(&mut *conn)
        .await;
    match count {
        Ok(0) => {
            sqlx::query(&cfg.add_job_sql())
                .execute(&mut *conn)
                .await
                .context("add_job move_old_chunks")?;
            tracing::info!(interval = %cfg.job_interval, "added chunk move job");
        }
        Ok(n) => tracing::debug!(jobs = n, "chunk move job already present"),
        Err(err) => tracing::warn!(error = %err, "could not look up chunk move jobs, skipping"),
    }

    tracing::info!(table = %cfg.table, "schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_ordered() {
        let cfg = SchemaConfig::default();
        let steps: Vec<_> = cfg.statements().into_iter().map(|(s, _)| s).collect();
        assert_eq!(steps, ["create table", "create_hypertable", "attach_tablespace", "cluster"]);
    }

    #[test]
    fn test_hypertable_uses_chunk_interval() {
        let cfg = SchemaConfig::default();
        let (_, sql) = &cfg.statements()[1];
        assert!(sql.contains("create_hypertable('lh', 'time'"));
        assert!(sql.contains("INTERVAL '15 mins'"));
    }

    #[test]
    fn test_custom_table_name() {
        let cfg = SchemaConfig { table: "lh_test".into(), ..SchemaConfig::default() };
        for (_, sql) in cfg.statements() {
            assert!(sql.contains("lh_test"), "{sql}");
        }
        assert!(cfg.job_count_sql().ends_with("like 'lh_test'"));
    }

    #[test]
    fn test_add_job_config_json() {
        let sql = SchemaConfig::default().add_job_sql();
        assert_eq!(
            sql,
            r#"SELECT add_job('move_old_chunks', '5m', config => '{"hypertable":"lh","lag":"1 hour","tablespace":"slow_space"}')"#
        );
    }
}
