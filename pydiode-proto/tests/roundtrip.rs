//! In-process loopback tests: drive the sender-side chunker/encoder and
//! the receiver-side assembler directly against `Vec<u8>` datagrams,
//! exercising the scenarios from the specification's testable properties
//! (empty input, short input, exact-fit input, tolerable loss, excess
//! loss, reordering/duplication, and loss of the short terminal chunk).

use pydiode_proto::assembler::{BlockAssembler, Completion};
use pydiode_proto::chunk::StreamChunker;
use pydiode_proto::config::SessionConfig;
use pydiode_proto::encode::encode_block;
use pydiode_proto::rs::RsCodec;

use std::io::Cursor;

fn run_loopback(input: &[u8], cfg: SessionConfig, drop: impl Fn(usize) -> bool) -> (Vec<u8>, Completion, u64) {
    let codec = RsCodec::new(cfg.k, cfg.r).unwrap();
    let mut assembler = BlockAssembler::new(cfg, 64).unwrap();
    let mut chunker = StreamChunker::new(Cursor::new(input.to_vec()), cfg);

    let mut out = Vec::new();
    let mut seq = 0usize;
    while let Some(block) = chunker.next_block().unwrap() {
        for packet in encode_block(&block, &codec) {
            if !drop(seq) {
                out.extend(assembler.ingest(&packet.to_bytes()));
            }
            seq += 1;
        }
    }
    let (tail, completion) = assembler.on_idle_timeout();
    out.extend(tail);
    (out, completion, assembler.stats.blocks_lost)
}

#[test]
fn empty_input_round_trips_to_nothing() {
    let cfg = SessionConfig::new(1024, 64, 32).unwrap();
    let (out, completion, lost) = run_loopback(&[], cfg, |_| false);
    assert!(out.is_empty());
    assert_eq!(completion, Completion::Complete);
    assert_eq!(lost, 0);
}

#[test]
fn single_short_chunk_round_trips() {
    let cfg = SessionConfig::new(1024, 4, 2).unwrap();
    let input = b"hello";
    let (out, completion, lost) = run_loopback(input, cfg, |_| false);
    assert_eq!(out, input);
    assert_eq!(completion, Completion::Complete);
    assert_eq!(lost, 0);
}

#[test]
fn exact_fit_full_block_round_trips() {
    let cfg = SessionConfig::new(1026, 4, 2).unwrap(); // capacity 1024
    let input = vec![0xAB; 4096];
    let (out, completion, lost) = run_loopback(&input, cfg, |_| false);
    assert_eq!(out, input);
    assert_eq!(completion, Completion::Complete);
    assert_eq!(lost, 0);
}

#[test]
fn loss_at_the_redundancy_limit_still_recovers() {
    let cfg = SessionConfig::new(1026, 4, 2).unwrap();
    let input: Vec<u8> = (0..4096u32).map(|i| i as u8).collect();
    // One block of 6 packets (4 data + 2 parity); drop exactly r=2.
    let (out, completion, lost) = run_loopback(&input, cfg, |i| i == 0 || i == 5);
    assert_eq!(out, input);
    assert_eq!(completion, Completion::Complete);
    assert_eq!(lost, 0);
}

#[test]
fn loss_beyond_the_redundancy_limit_is_incomplete() {
    let cfg = SessionConfig::new(1026, 4, 2).unwrap();
    let input: Vec<u8> = (0..4096u32).map(|i| i as u8).collect();
    let (_out, completion, lost) = run_loopback(&input, cfg, |i| i == 0 || i == 2 || i == 5);
    assert_eq!(completion, Completion::Incomplete);
    assert_eq!(lost, 1);
}

#[test]
fn multi_block_stream_with_loss_in_one_block_only_affects_that_block() {
    let cfg = SessionConfig::new(258, 4, 2).unwrap(); // capacity 256
    let input: Vec<u8> = (0..(256 * 4 * 3)).map(|i| (i % 251) as u8).collect();
    // 3 full blocks, 6 packets each (18 total); drop 3 packets from the
    // middle block only, beyond its own tolerance.
    let (_out, completion, lost) = run_loopback(&input, cfg, |i| (6..9).contains(&i));
    assert_eq!(completion, Completion::Incomplete);
    assert_eq!(lost, 1);
}

#[test]
fn reordered_and_duplicated_datagrams_still_round_trip() {
    let cfg = SessionConfig::new(514, 4, 2).unwrap(); // capacity 512
    let codec = RsCodec::new(cfg.k, cfg.r).unwrap();
    let mut assembler = BlockAssembler::new(cfg, 64).unwrap();

    let input: Vec<u8> = (0..2048u32).map(|i| i as u8).collect();
    let mut chunker = StreamChunker::new(Cursor::new(input.clone()), cfg);
    let mut all_bytes = Vec::new();
    while let Some(block) = chunker.next_block().unwrap() {
        for packet in encode_block(&block, &codec) {
            all_bytes.push(packet.to_bytes());
        }
    }

    // Reverse order within the block and duplicate the first packet.
    all_bytes.reverse();
    let dup = all_bytes[0].clone();
    all_bytes.push(dup);

    let mut out = Vec::new();
    for bytes in &all_bytes {
        out.extend(assembler.ingest(bytes));
    }
    let (tail, completion) = assembler.on_idle_timeout();
    out.extend(tail);

    assert_eq!(out, input);
    assert_eq!(completion, Completion::Complete);
    assert_eq!(assembler.stats.duplicate_dropped, 1);
}

#[test]
fn loss_of_the_short_terminal_chunk_is_still_recovered_exactly() {
    let cfg = SessionConfig::new(1026, 4, 2).unwrap(); // capacity 1024
    // Not a multiple of k*capacity: the terminal block's last chunk
    // carries a genuinely short length (5 bytes).
    let input: Vec<u8> = (0..4101u32).map(|i| i as u8).collect();
    // Block 0: 4 full chunks (seq 0..3) + 2 parity (seq 4..5).
    // Block 1: chunk 0 carries the remaining 5 bytes (seq 6), the rest
    // are padding; drop exactly seq 6, the short chunk's own packet.
    let (out, completion, lost) = run_loopback(&input, cfg, |i| i == 6);
    assert_eq!(out, input);
    assert_eq!(completion, Completion::Complete);
    assert_eq!(lost, 0);
}
