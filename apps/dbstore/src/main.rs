use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::runtime::Handle;
use tracing_subscriber::{fmt, EnvFilter};

use dbstore::config::{Cli, Command, SourceKind, StoreKind};
use dbstore::{run_source, spawn_worker, Pipeline};
use fleetlog_ingest_core::channel;
use fleetlog_ingest_lines::{StdinSource, UdpConfig, UdpSource};
use iox::{Connector, MemoryStore, PersistenceWriter, PgConnector};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Version) = &cli.command {
        println!(
            "fleetlog-dbstore {} ({}/{})",
            VERSION,
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        return Ok(());
    }

    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;
    fmt().with_env_filter(filter).with_target(true).init();

    tracing::info!(version = VERSION, channel = cli.channel, source = ?cli.source, "starting fleetlog-dbstore");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    let res = rt.block_on(run(cli));
    // a blocked stdin read would otherwise hold the runtime open
    rt.shutdown_timeout(Duration::from_secs(1));
    res
}

async fn run(cli: Cli) -> Result<()> {
    match cli.store {
        StoreKind::Postgres => {
            let connector = PgConnector::new(cli.pg_config());
            if cli.setup_schema {
                let mut conn = connector
                    .connect()
                    .await
                    .context("connecting for schema setup")?;
                iox::schema::setup(conn.connection(), &cli.schema_config())
                    .await
                    .context("schema setup")?;
            }
            let writer = PersistenceWriter::connect(connector)
                .await
                .context("connecting to store")?;
            serve(&cli, writer).await
        }
        StoreKind::Memory => {
            if cli.setup_schema {
                tracing::warn!("--setup-schema has no effect with the memory store");
            }
            let store = MemoryStore::new();
            let writer = PersistenceWriter::connect(store.connector()).await?;
            serve(&cli, writer).await?;
            tracing::info!(rows = store.row_count(), "memory store discarded");
            Ok(())
        }
    }
}

async fn serve<C: Connector + 'static>(cli: &Cli, writer: PersistenceWriter<C>) -> Result<()> {
    let pipeline = Pipeline::new(cli.channel, writer);
    let (tx, rx) = channel();

    let mut source = match cli.source {
        SourceKind::Stdin => run_source(StdinSource::new(cli.channel), tx),
        SourceKind::Udp => run_source(
            UdpSource::new(UdpConfig { bind_addr: cli.udp_bind.clone(), channel: cli.channel }),
            tx,
        ),
    };
    let worker = spawn_worker(pipeline, rx, Handle::current()).context("spawning worker thread")?;

    tokio::select! {
        res = shutdown_signal() => res?,
        res = &mut source => {
            res.context("record source task")?
                .context("record source failed")?;
            tracing::info!("input ended");
        }
    }

    // dropping the source closes the channel; the worker finishes what is queued
    source.abort();
    let stats = tokio::task::spawn_blocking(move || worker.join())
        .await
        .context("joining worker")?
        .map_err(|_| anyhow::anyhow!("worker thread panicked"))?;

    tracing::info!(
        received = stats.received,
        stored = stats.stored,
        dropped = stats.dropped,
        store_failed = stats.store_failed,
        "fleetlog-dbstore stopped"
    );
    Ok(())
}

async fn shutdown_signal() -> Result<()> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("registering SIGTERM handler")?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("waiting for SIGINT")?;
            tracing::info!("received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
    Ok(())
}
