use clap::{Parser, Subcommand, ValueEnum};
use iox::schema::SchemaConfig;
use iox::PgConfig;

/// Enriches vehicle and sensor telemetry and appends it to the location history store.
#[derive(Parser, Debug)]
#[command(name = "fleetlog-dbstore", about)]
pub struct Cli {
    /// Channel to accept records on.
    #[arg(long, default_value_t = 15)]
    pub channel: u32,

    /// Where raw records come from.
    #[arg(long, value_enum, default_value_t = SourceKind::Stdin)]
    pub source: SourceKind,

    /// Listen address for the udp source.
    #[arg(long, default_value = "0.0.0.0:9980")]
    pub udp_bind: String,

    /// Storage backend.
    #[arg(long, value_enum, default_value_t = StoreKind::Postgres)]
    pub store: StoreKind,

    #[arg(long, env = "POSTGRES_HOST", default_value = "localhost")]
    pub db_host: String,

    #[arg(long, env = "POSTGRES_PORT", default_value_t = 5432)]
    pub db_port: u16,

    #[arg(long, env = "POSTGRES_DB", default_value = "postgres")]
    pub db_name: String,

    #[arg(long, env = "POSTGRES_USER", default_value = "postgres")]
    pub db_user: String,

    #[arg(long, env = "POSTGRES_PASSWORD", default_value = "", hide_env_values = true)]
    pub db_password: String,

    /// Location history table.
    #[arg(long, default_value = iox::postgres::DEFAULT_TABLE)]
    pub table: String,

    /// Create the table, hypertable and chunk tiering job before starting.
    #[arg(long)]
    pub setup_schema: bool,

    /// Logging verbosity level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print version information and exit.
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    Stdin,
    Udp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Postgres,
    /// Keep rows in memory and log them; nothing is persisted.
    Memory,
}

impl Cli {
    pub fn pg_config(&self) -> PgConfig {
        PgConfig {
            host: self.db_host.clone(),
            port: self.db_port,
            database: self.db_name.clone(),
            user: self.db_user.clone(),
            password: self.db_password.clone(),
            table: self.table.clone(),
        }
    }

    pub fn schema_config(&self) -> SchemaConfig {
        SchemaConfig { table: self.table.clone(), ..SchemaConfig::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "fleetlog-dbstore",
            "--channel",
            "3",
            "--source",
            "udp",
            "--db-host",
            "tsdb",
            "--db-password",
            "pw",
            "--table",
            "lh2",
            "--setup-schema",
        ])
        .unwrap();
        assert_eq!(cli.channel, 3);
        assert_eq!(cli.source, SourceKind::Udp);
        assert!(cli.setup_schema);

        let pg = cli.pg_config();
        assert_eq!(pg.host, "tsdb");
        assert_eq!(pg.password, "pw");
        assert_eq!(pg.table, "lh2");
        assert_eq!(cli.schema_config().table, "lh2");
        assert_eq!(cli.schema_config().chunk_interval, "15 mins");
    }

    #[test]
    fn test_store_kind() {
        let cli = Cli::try_parse_from(["fleetlog-dbstore", "--store", "memory"]).unwrap();
        assert_eq!(cli.store, StoreKind::Memory);
        assert_eq!(cli.source, SourceKind::Stdin);
    }
}
