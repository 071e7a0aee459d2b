//! Listens for transmissions, reassembles the stream, and writes it to
//! standard output. Races the next datagram against an idle-timeout
//! timer with `tokio::select!`, the same pattern this workspace's
//! `PeriodicTimer` uses for its own timeout race, and drains the window
//! best-effort on Ctrl-C.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::UdpSocket;
use tokio::time::Instant;

use pydiode_proto::assembler::{BlockAssembler, Completion};
use pydiode_proto::config::SessionConfig;
use pydiode_proto::packet::HEADER_LEN;

use crate::cli::ReceiveArgs;
use crate::outcome::Outcome;

pub async fn run(args: ReceiveArgs) -> Result<Outcome> {
    let cfg = SessionConfig::new(args.chunk_bytes, args.k, args.r).context("invalid session configuration")?;
    let mut assembler = BlockAssembler::new(cfg, args.window_blocks).context("invalid receiver configuration")?;

    let bind_addr: SocketAddr = format!("{}:{}", args.listen_ip, args.port).parse().context("invalid listen address")?;
    let socket = UdpSocket::bind(bind_addr).await.with_context(|| format!("binding UDP socket on {bind_addr}"))?;
    log::info!("listening on {bind_addr} (k={} r={} chunk_bytes={})", cfg.k, cfg.r, cfg.chunk_bytes);

    let idle_timeout = Duration::from_secs(args.idle_timeout_secs);
    let mut stdout = BufWriter::new(tokio::io::stdout());
    // Generous slack over the largest legitimate datagram so oversized
    // garbage still gets read fully (and then rejected as malformed)
    // rather than silently truncated by the kernel.
    let mut buf = vec![0u8; cfg.chunk_bytes + HEADER_LEN + 64];

    let outcome = loop {
        let deadline = Instant::now() + idle_timeout;
        tokio::select! {
            biased;

            _ = tokio::signal::ctrl_c() => {
                log::warn!("interrupted, draining in-flight window and closing");
                let (bytes, completion) = assembler.on_idle_timeout();
                stdout.write_all(&bytes).await?;
                break completion_to_outcome(completion);
            }

            res = socket.recv_from(&mut buf) => {
                let (n, _peer) = res.context("fatal socket receive error")?;
                let bytes = assembler.ingest(&buf[..n]);
                stdout.write_all(&bytes).await?;
            }

            _ = tokio::time::sleep_until(deadline) => {
                log::debug!("idle timeout fired after {idle_timeout:?} of silence");
                let (bytes, completion) = assembler.on_idle_timeout();
                stdout.write_all(&bytes).await?;
                break completion_to_outcome(completion);
            }
        }
    };

    stdout.flush().await?;
    let stats = assembler.stats;
    log::info!(
        "receiver done ({}): whole={} fec_recovered={} lost={} malformed_dropped={} duplicate_dropped={}",
        outcome_label(outcome),
        stats.blocks_whole,
        stats.blocks_fec_recovered,
        stats.blocks_lost,
        stats.malformed_dropped,
        stats.duplicate_dropped,
    );
    Ok(outcome)
}

fn completion_to_outcome(completion: Completion) -> Outcome {
    match completion {
        Completion::Complete => Outcome::Clean,
        Completion::Incomplete => Outcome::Incomplete,
    }
}

fn outcome_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Clean => "complete",
        Outcome::Incomplete => "incomplete",
    }
}
