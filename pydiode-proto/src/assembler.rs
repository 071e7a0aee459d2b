//! Receiver-side reassembly: per-block buffering, FEC reconstruction,
//! and in-order emission within a sliding window of in-flight blocks.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::config::{read_length_trailer, write_length_trailer, SessionConfig, LENGTH_TRAILER_BYTES};
use crate::error::{Error, Result};
use crate::packet::Packet;
use crate::rs::RsCodec;

#[derive(Debug, Default, Clone, Copy)]
pub struct AssemblerStats {
    pub malformed_dropped: u64,
    pub duplicate_dropped: u64,
    pub blocks_whole: u64,
    pub blocks_fec_recovered: u64,
    pub blocks_lost: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Complete,
    Incomplete,
}

struct PartialBlock {
    k: usize,
    last_block: bool,
    chunk_bytes: usize,
    data: Vec<Option<Vec<u8>>>,
    parity: Vec<Option<Vec<u8>>>,
    received: usize,
}

impl PartialBlock {
    fn new(k: usize, r: usize, last_block: bool, chunk_bytes: usize) -> Self {
        PartialBlock {
            k,
            last_block,
            chunk_bytes,
            data: vec![None; k],
            parity: vec![None; r],
            received: 0,
        }
    }

    /// Stores a packet's payload in its slot. Returns `true` if this was
    /// new information (not a duplicate or out-of-range index).
    fn insert(&mut self, packet: &Packet) -> bool {
        if self.k == 0 {
            // Empty-stream terminator: nothing to store.
            return true;
        }
        let idx = packet.header.chunk_index as usize;
        if packet.header.is_parity() {
            if idx < self.k || idx >= self.k + self.parity.len() {
                return false;
            }
            let slot = idx - self.k;
            if self.parity[slot].is_some() {
                return false;
            }
            self.parity[slot] = Some(pad(&packet.payload, self.chunk_bytes));
        } else {
            if idx >= self.k || self.data[idx].is_some() {
                return false;
            }
            let mut buf = pad(&packet.payload, self.chunk_bytes);
            // The packet only carries the chunk's real content; stamp its
            // own length into the trailer so a directly-received chunk
            // reads back exactly the way a FEC-reconstructed one would.
            let capacity = self.chunk_bytes.saturating_sub(LENGTH_TRAILER_BYTES) as u16;
            let len = packet.header.payload_len.min(capacity);
            write_length_trailer(&mut buf, len);
            self.data[idx] = Some(buf);
        }
        self.received += 1;
        true
    }

    fn reconstructable(&self) -> bool {
        self.received >= self.k
    }

    /// Reconstructs the `k` data chunks and each one's effective output
    /// length. The length is read back from the trailer embedded in the
    /// chunk's own last bytes (see `config::write_length_trailer`), which
    /// is correct whether the chunk was received directly or rebuilt via
    /// FEC from other chunks in the block.
    fn reconstruct(&self, codec: &RsCodec) -> Result<(Vec<Vec<u8>>, Vec<u16>)> {
        if self.k == 0 {
            return Ok((Vec::new(), Vec::new()));
        }

        let data_bufs: Vec<Vec<u8>> = if self.data.iter().all(Option::is_some) {
            self.data.iter().map(|slot| slot.clone().unwrap()).collect()
        } else {
            let mut available: Vec<(usize, &[u8])> = Vec::with_capacity(self.received);
            for (i, slot) in self.data.iter().enumerate() {
                if let Some(buf) = slot {
                    available.push((i, buf.as_slice()));
                }
            }
            for (i, slot) in self.parity.iter().enumerate() {
                if let Some(buf) = slot {
                    available.push((self.k + i, buf.as_slice()));
                }
            }
            codec.decode(&available)?
        };

        let lens = data_bufs.iter().map(|buf| read_length_trailer(buf)).collect();
        Ok((data_bufs, lens))
    }

    fn is_whole(&self) -> bool {
        self.data.iter().all(Option::is_some)
    }
}

fn pad(payload: &Bytes, chunk_bytes: usize) -> Vec<u8> {
    let mut buf = vec![0u8; chunk_bytes];
    buf[..payload.len()].copy_from_slice(payload);
    buf
}

/// Writes a reconstructed block's data chunks to the output, honoring
/// the terminal-block truncation rule: stop forwarding as soon as a
/// chunk shorter than its usable capacity is hit (the rest are padding).
fn emit_bytes(last_block: bool, data: &[Vec<u8>], lens: &[u16]) -> Vec<u8> {
    let mut out = Vec::new();
    for (buf, &len) in data.iter().zip(lens.iter()) {
        let capacity = buf.len().saturating_sub(LENGTH_TRAILER_BYTES);
        let len = (len as usize).min(capacity);
        out.extend_from_slice(&buf[..len]);
        if last_block && len < capacity {
            break;
        }
    }
    out
}

/// Buffers in-flight blocks within a sliding window, resolves them via
/// direct receipt or FEC decode, and emits completed blocks' payload in
/// order. Blocks that fall out of the window unresolved, or remain
/// unresolved when the idle timeout fires, are declared lost.
pub struct BlockAssembler {
    cfg: SessionConfig,
    window_blocks: usize,
    codec: RsCodec,
    blocks: BTreeMap<u32, PartialBlock>,
    next_emit: u32,
    last_block_id: Option<u32>,
    incomplete: bool,
    pub stats: AssemblerStats,
}

impl BlockAssembler {
    pub fn new(cfg: SessionConfig, window_blocks: usize) -> Result<Self> {
        if window_blocks == 0 {
            return Err(Error::ConfigInvalidWindow(window_blocks));
        }
        let codec = RsCodec::new(cfg.k, cfg.r)?;
        Ok(BlockAssembler {
            cfg,
            window_blocks,
            codec,
            blocks: BTreeMap::new(),
            next_emit: 0,
            last_block_id: None,
            incomplete: false,
            stats: AssemblerStats::default(),
        })
    }

    /// Parses and ingests one datagram, returning any output bytes now
    /// ready to be written in order. Malformed packets are silently
    /// dropped (and counted).
    pub fn ingest(&mut self, bytes: &[u8]) -> Vec<u8> {
        let packet = match Packet::parse(bytes, &self.cfg) {
            Ok(p) => p,
            Err(e) => {
                log::trace!("dropping malformed packet: {e}");
                self.stats.malformed_dropped += 1;
                return Vec::new();
            }
        };
        self.ingest_packet(packet)
    }

    fn ingest_packet(&mut self, packet: Packet) -> Vec<u8> {
        let header = packet.header;
        if header.is_last_block() {
            self.last_block_id = Some(self.last_block_id.map_or(header.block_id, |id| id.min(header.block_id)));
        }
        if header.block_id < self.next_emit {
            self.stats.duplicate_dropped += 1;
            return Vec::new();
        }

        let block = self.blocks.entry(header.block_id).or_insert_with(|| {
            PartialBlock::new(header.k as usize, header.r as usize, header.is_last_block(), self.cfg.chunk_bytes)
        });
        if !block.insert(&packet) {
            self.stats.duplicate_dropped += 1;
        }

        self.drain_window(header.block_id)
    }

    /// Resolves the head-of-line block repeatedly: emit it if it's
    /// reconstructable, or declare it lost if the window has moved past
    /// it, until the head is neither.
    fn drain_window(&mut self, newest_id: u32) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            if let Some(block) = self.blocks.get(&self.next_emit) {
                if block.reconstructable() {
                    out.extend(self.resolve_next());
                    continue;
                }
            }
            if newest_id.saturating_sub(self.next_emit) as usize >= self.window_blocks {
                self.blocks.remove(&self.next_emit);
                log::warn!("declaring block {} lost: window advanced past it", self.next_emit);
                self.stats.blocks_lost += 1;
                self.incomplete = true;
                self.next_emit += 1;
                continue;
            }
            break;
        }
        out
    }

    fn resolve_next(&mut self) -> Vec<u8> {
        let block = self.blocks.remove(&self.next_emit).expect("caller checked presence");
        self.next_emit += 1;
        match block.reconstruct(&self.codec) {
            Ok((data, lens)) => {
                if block.k > 0 {
                    if block.is_whole() {
                        self.stats.blocks_whole += 1;
                    } else {
                        self.stats.blocks_fec_recovered += 1;
                    }
                }
                emit_bytes(block.last_block, &data, &lens)
            }
            Err(e) => {
                log::warn!("block unrecoverable: {e}");
                self.stats.blocks_lost += 1;
                self.incomplete = true;
                Vec::new()
            }
        }
    }

    /// Called when no packet has arrived within the idle timeout. Forces
    /// resolution (or loss) of every block up to the observed terminal
    /// block, and reports whether the stream is complete.
    pub fn on_idle_timeout(&mut self) -> (Vec<u8>, Completion) {
        let Some(last) = self.last_block_id else {
            return (Vec::new(), Completion::Incomplete);
        };

        let mut out = Vec::new();
        while self.next_emit <= last {
            let ready = self.blocks.get(&self.next_emit).is_some_and(PartialBlock::reconstructable);
            if ready {
                out.extend(self.resolve_next());
                continue;
            }
            self.blocks.remove(&self.next_emit);
            log::warn!("declaring block {} lost: idle timeout", self.next_emit);
            self.stats.blocks_lost += 1;
            self.incomplete = true;
            self.next_emit += 1;
        }

        let completion = if self.incomplete { Completion::Incomplete } else { Completion::Complete };
        (out, completion)
    }
}
