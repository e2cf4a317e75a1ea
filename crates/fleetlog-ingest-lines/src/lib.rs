//! Line-oriented record sources: standard input and UDP datagrams.

use std::io;
use std::net::SocketAddr;

use anyhow::Context;
use fleetlog_ingest_core::*;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;

/// Reads one record per line from standard input until EOF.
pub struct StdinSource {
    channel: u32,
}

impl StdinSource {
    pub fn new(channel: u32) -> Self { Self { channel } }
}

#[async_trait::async_trait]
impl RecordSource for StdinSource {
    async fn run(&self, tx: SupplyTx) -> Result<(), IngestError> {
        let stdin = BufReader::new(tokio::io::stdin());
        let n = forward_lines(stdin, self.channel, &tx).await?;
        tracing::info!(lines = n, "stdin closed");
        Ok(())
    }

    fn name(&self) -> &str { "stdin" }
}

/// Forwards every non-blank line as a plain-data message; returns how many were sent.
///
/// Lines that are not UTF-8 are skipped, the rest of the input still flows.
pub async fn forward_lines<R>(mut reader: R, channel: u32, tx: &SupplyTx) -> Result<usize, IngestError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut sent = 0usize;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let Some(line) = decode_payload(&buf) else { continue };
        if tx.send(Supply::plain(channel, line)).is_err() {
            tracing::debug!("receiver gone, stopping line reader");
            break;
        }
        sent += 1;
    }
    Ok(sent)
}

#[derive(Clone, Debug)]
pub struct UdpConfig {
    pub bind_addr: String,       // e.g. "0.0.0.0:9980"
    pub channel: u32,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:9980".into(), channel: 15 }
    }
}

/// One record per datagram.
pub struct UdpSource {
    cfg: UdpConfig
}

impl UdpSource {
    pub fn new(cfg: UdpConfig) -> Self { Self { cfg } }
}

#[async_trait::async_trait]
impl RecordSource for UdpSource {
    async fn run(&self, tx: SupplyTx) -> Result<(), IngestError> {
        let socket = UdpSocket::bind(&self.cfg.bind_addr).await
            .with_context(|| format!("bind {}", self.cfg.bind_addr))?;
        tracing::info!(addr = %self.cfg.bind_addr, "listening for datagrams");
        let mut buf = vec![0u8; 65_536];
        loop {
            let received = socket.recv_from(&mut buf).await;
            let Some(payload) = accept_datagram(received, &buf) else { continue };
            if tx.send(Supply::plain(self.cfg.channel, payload)).is_err() {
                return Ok(());
            }
        }
    }

    fn name(&self) -> &str { "udp" }
}

/// Receive errors are logged and the socket keeps serving.
fn accept_datagram(received: io::Result<(usize, SocketAddr)>, buf: &[u8]) -> Option<String> {
    match received {
        Ok((len, peer)) => {
            let payload = decode_payload(&buf[..len]);
            if payload.is_none() {
                tracing::debug!(%peer, len, "ignoring empty datagram");
            }
            payload
        }
        Err(err) => {
            tracing::warn!(error = %err, "udp receive failed");
            None
        }
    }
}

fn decode_payload(buf: &[u8]) -> Option<String> {
    let text = match std::str::from_utf8(buf) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(len = buf.len(), error = %err, "skipping non-utf8 input");
            return None;
        }
    };
    let text = text.trim_end_matches(['\r', '\n']);
    if text.trim().is_empty() { None } else { Some(text.to_string()) }
}
