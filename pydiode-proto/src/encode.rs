//! Turns a sender-side `Block` into the ordered sequence of wire packets
//! (data chunks followed by parity chunks) for a single transmission
//! round.

use bytes::Bytes;

use crate::chunk::Block;
use crate::packet::{Header, Packet, FLAG_LAST_BLOCK, FLAG_PARITY};
use crate::rs::RsCodec;

pub fn encode_block(block: &Block, codec: &RsCodec) -> Vec<Packet> {
    if block.k == 0 {
        // Empty-stream terminator: one header-only packet, no parity.
        let header = Header::new(FLAG_LAST_BLOCK, 0, 0, 0, block.block_id, 0);
        return vec![Packet { header, payload: Bytes::new() }];
    }

    let mut flags = 0u8;
    if block.last_block {
        flags |= FLAG_LAST_BLOCK;
    }

    let mut packets = Vec::with_capacity(block.k + block.r);
    for (i, (chunk, &len)) in block.data.iter().zip(block.payload_lens.iter()).enumerate() {
        let header = Header::new(flags, block.k as u8, block.r as u8, i as u8, block.block_id, len);
        packets.push(Packet { header, payload: Bytes::copy_from_slice(&chunk[..len as usize]) });
    }

    if block.r > 0 {
        let parity = codec.encode_parity(&block.data);
        for (j, chunk) in parity.into_iter().enumerate() {
            let idx = block.k + j;
            let len = chunk.len() as u16;
            let header = Header::new(flags | FLAG_PARITY, block.k as u8, block.r as u8, idx as u8, block.block_id, len);
            packets.push(Packet { header, payload: Bytes::from(chunk) });
        }
    }

    packets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::StreamChunker;
    use crate::config::SessionConfig;
    use std::io::Cursor;

    #[test]
    fn empty_stream_encodes_to_one_packet() {
        let cfg = SessionConfig::new(16, 4, 2).unwrap();
        let codec = RsCodec::new(cfg.k, cfg.r).unwrap();
        let mut chunker = StreamChunker::new(Cursor::new(Vec::new()), cfg);
        let block = chunker.next_block().unwrap().unwrap();
        let packets = encode_block(&block, &codec);
        assert_eq!(packets.len(), 1);
        assert!(packets[0].header.is_last_block());
        assert_eq!(packets[0].header.k, 0);
        assert_eq!(packets[0].payload.len(), 0);
    }

    #[test]
    fn full_block_encodes_k_plus_r_packets() {
        let cfg = SessionConfig::new(16, 4, 2).unwrap();
        let codec = RsCodec::new(cfg.k, cfg.r).unwrap();
        let mut chunker = StreamChunker::new(Cursor::new(vec![7u8; 64]), cfg);
        let block = chunker.next_block().unwrap().unwrap();
        let packets = encode_block(&block, &codec);
        assert_eq!(packets.len(), 6);
        assert_eq!(packets.iter().filter(|p| p.header.is_parity()).count(), 2);
    }
}
