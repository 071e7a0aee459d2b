//! Reed-Solomon forward error correction over GF(2^8), via the same
//! `reed-solomon-erasure` engine the wider FEC-over-UDP ecosystem reaches
//! for when it needs erasure coding for lossy packet transport.

use reed_solomon_erasure::galois_8::ReedSolomon;

use crate::error::{Error, Result};

/// Encodes/decodes one block's `k` data chunks plus `r` parity chunks.
/// `k == 0` is the empty-stream sentinel. `r == 0` disables redundancy:
/// `encode_parity` then produces nothing, and `decode` can never
/// reconstruct anything missing (there's no mechanism to); callers only
/// reach for it once a data chunk has actually gone missing.
pub struct RsCodec {
    k: usize,
    r: usize,
    rs: Option<ReedSolomon>,
}

impl RsCodec {
    pub fn new(k: usize, r: usize) -> Result<Self> {
        if k == 0 || r == 0 {
            return Ok(RsCodec { k, r, rs: None });
        }
        let rs = ReedSolomon::new(k, r).map_err(|_| Error::FecGeneratorSingular(k, r))?;
        Ok(RsCodec { k, r, rs: Some(rs) })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn r(&self) -> usize {
        self.r
    }

    /// Computes the `r` parity chunks for `k` equal-length data chunks.
    pub fn encode_parity(&self, data: &[Vec<u8>]) -> Vec<Vec<u8>> {
        debug_assert_eq!(data.len(), self.k);
        let Some(rs) = &self.rs else {
            return Vec::new();
        };
        let chunk_len = data.first().map(Vec::len).unwrap_or(0);

        let mut shards: Vec<Vec<u8>> = data.to_vec();
        shards.extend((0..self.r).map(|_| vec![0u8; chunk_len]));
        rs.encode(&mut shards).expect("shard layout matches this codec's own k/r dimensions");
        shards.split_off(self.k)
    }

    /// Recovers all `k` original data chunks from any `k` of the `k + r`
    /// coded chunks, identified by their wire chunk index (data chunks
    /// are `0..k`, parity chunks are `k..k+r`).
    pub fn decode(&self, available: &[(usize, &[u8])]) -> Result<Vec<Vec<u8>>> {
        if available.len() < self.k {
            return Err(Error::FecNotEnoughChunks(available.len(), self.k));
        }
        let Some(rs) = &self.rs else {
            return Err(Error::FecNotEnoughChunks(available.len(), self.k));
        };

        let n = self.k + self.r;
        let mut shards: Vec<Option<Vec<u8>>> = vec![None; n];
        for &(idx, bytes) in available {
            if idx < n {
                shards[idx] = Some(bytes.to_vec());
            }
        }

        rs.reconstruct(&mut shards).map_err(|_| Error::FecDecodeSingular)?;
        Ok(shards.into_iter().take(self.k).map(|s| s.expect("reconstructed by codec")).collect())
    }
}
