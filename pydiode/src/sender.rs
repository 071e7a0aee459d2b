//! Reads standard input, chunks and FEC-encodes it, and transmits it
//! across the diode at a paced rate. The sender is stateless across
//! blocks other than the running `block_id` counter and never listens
//! for anything back.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tokio::time::sleep;

use pydiode_proto::chunk::StreamChunker;
use pydiode_proto::config::SessionConfig;
use pydiode_proto::encode::encode_block;
use pydiode_proto::rs::RsCodec;

use crate::cli::SendArgs;
use crate::outcome::Outcome;
use crate::pacing::Pacer;

pub async fn run(args: SendArgs) -> Result<Outcome> {
    let cfg = SessionConfig::new(args.chunk_bytes, args.k, args.r).context("invalid session configuration")?;
    let codec = RsCodec::new(cfg.k, cfg.r).context("failed to build FEC generator matrix")?;

    let local_addr: SocketAddr = format!("{}:0", args.source_ip).parse().context("invalid --source-ip")?;
    let dst_addr: SocketAddr = format!("{}:{}", args.dst_ip, args.port).parse().context("invalid destination address")?;

    let socket = UdpSocket::bind(local_addr).await.with_context(|| format!("binding UDP socket on {local_addr}"))?;
    log::info!(
        "sending to {dst_addr} (k={} r={} chunk_bytes={} rate={}bps)",
        cfg.k,
        cfg.r,
        cfg.chunk_bytes,
        args.rate_bps
    );

    let stdin = std::io::stdin();
    let mut chunker = StreamChunker::new(stdin.lock(), cfg);
    let mut pacer = Pacer::new(args.rate_bps);

    let mut blocks_sent = 0u64;
    loop {
        let Some(block) = chunker.next_block().context("reading input stream")? else {
            break;
        };
        let last_block = block.last_block;
        let block_id = block.block_id;
        let packets = encode_block(&block, &codec);
        let rounds = if last_block { args.redundant_final.max(1) } else { 1 };

        for round in 0..rounds {
            for packet in &packets {
                let bytes = packet.to_bytes();
                send_with_retry(&socket, dst_addr, &bytes).await?;
                pacer.pace(bytes.len()).await;
            }
            if rounds > 1 {
                log::debug!("terminal block {block_id} redundancy round {}/{rounds} sent", round + 1);
            }
        }

        blocks_sent += 1;
        if last_block {
            break;
        }
    }

    log::info!("sender done: {blocks_sent} block(s) transmitted");
    Ok(Outcome::Clean)
}

/// Retries transient socket errors with exponential backoff; a send
/// failure that persists is fatal (`IOFatal`), since the sender has no
/// way to know whether any data got through.
async fn send_with_retry(socket: &UdpSocket, dst: SocketAddr, bytes: &[u8]) -> Result<()> {
    let mut backoff = Duration::from_millis(5);
    for attempt in 0..5 {
        match socket.send_to(bytes, dst).await {
            Ok(_) => return Ok(()),
            Err(e) if attempt < 4 => {
                log::warn!("send_to failed ({e}), retrying in {backoff:?}");
                sleep(backoff).await;
                backoff *= 2;
            }
            Err(e) => return Err(e).context("fatal socket send error"),
        }
    }
    unreachable!("loop always returns on its last iteration")
}
