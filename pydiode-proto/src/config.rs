use std::time::Duration;

use crate::error::{Error, Result};

/// Maximum octets in a single chunk's payload. Chosen so that
/// `HEADER_LEN + MAX_CHUNK_BYTES` stays well clear of typical UDP/IP
/// fragmentation thresholds even on jumbo-frame links.
pub const MAX_CHUNK_BYTES: usize = 60_000;

/// `chunk_index` is one octet, so `k + r` can never exceed this.
pub const MAX_N: usize = 255;

/// Octets reserved at the tail of every chunk's fixed-size buffer to
/// carry that chunk's own real content length. Writing it there, rather
/// than trusting only the wire header, means the length survives FEC
/// reconstruction even when the packet that would have reported it
/// directly is among the lost ones.
pub const LENGTH_TRAILER_BYTES: usize = 2;

pub const DEFAULT_CHUNK_BYTES: usize = 1024;
pub const DEFAULT_K: usize = 64;
pub const DEFAULT_R: usize = 32;
pub const DEFAULT_WINDOW_BLOCKS: usize = 64;
pub const DEFAULT_REDUNDANT_FINAL: usize = 3;
pub const DEFAULT_RATE_BPS: u64 = 10_000_000;
pub const DEFAULT_PORT: u16 = 1234;
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(2);

/// The subset of configuration that must match bit-for-bit between
/// sender and receiver for the wire format to line up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub chunk_bytes: usize,
    pub k: usize,
    pub r: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            k: DEFAULT_K,
            r: DEFAULT_R,
        }
    }
}

impl SessionConfig {
    pub fn new(chunk_bytes: usize, k: usize, r: usize) -> Result<Self> {
        let cfg = SessionConfig { chunk_bytes, k, r };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Total code length (data + parity chunks) per block.
    pub fn n(&self) -> usize {
        self.k + self.r
    }

    /// Octets of real content a chunk can hold once the length trailer
    /// is carved out of its fixed-size buffer.
    pub fn chunk_capacity(&self) -> usize {
        self.chunk_bytes - LENGTH_TRAILER_BYTES
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_bytes <= LENGTH_TRAILER_BYTES || self.chunk_bytes > MAX_CHUNK_BYTES {
            return Err(Error::ConfigInvalidChunkBytes(self.chunk_bytes, LENGTH_TRAILER_BYTES + 1, MAX_CHUNK_BYTES));
        }
        if self.k == 0 {
            return Err(Error::ConfigInvalidK(self.k));
        }
        if self.n() > MAX_N {
            return Err(Error::ConfigInvalidR(self.k, self.r, MAX_N));
        }
        Ok(())
    }
}

/// Writes `len` into the last [`LENGTH_TRAILER_BYTES`] octets of `buf`.
/// `buf` must be at least that long (every chunk buffer is, by
/// construction, exactly `chunk_bytes` long).
pub(crate) fn write_length_trailer(buf: &mut [u8], len: u16) {
    let at = buf.len() - LENGTH_TRAILER_BYTES;
    buf[at..].copy_from_slice(&len.to_be_bytes());
}

/// Reads back the length written by [`write_length_trailer`].
pub(crate) fn read_length_trailer(buf: &[u8]) -> u16 {
    let at = buf.len() - LENGTH_TRAILER_BYTES;
    u16::from_be_bytes([buf[at], buf[at + 1]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SessionConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_k() {
        assert!(matches!(
            SessionConfig::new(1024, 0, 4),
            Err(Error::ConfigInvalidK(0))
        ));
    }

    #[test]
    fn rejects_oversized_chunk() {
        assert!(SessionConfig::new(MAX_CHUNK_BYTES + 1, 4, 2).is_err());
    }

    #[test]
    fn rejects_chunk_too_small_for_length_trailer() {
        assert!(SessionConfig::new(LENGTH_TRAILER_BYTES, 4, 2).is_err());
    }

    #[test]
    fn rejects_n_over_255() {
        assert!(SessionConfig::new(1024, 200, 100).is_err());
    }

    #[test]
    fn length_trailer_round_trips() {
        let mut buf = vec![0xFFu8; 16];
        write_length_trailer(&mut buf, 1234);
        assert_eq!(read_length_trailer(&buf), 1234);
    }
}
