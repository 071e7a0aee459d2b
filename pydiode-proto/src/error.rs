use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("chunk_bytes must be {1}..={2} (got {0})")]
    ConfigInvalidChunkBytes(usize, usize, usize),
    #[error("k must be at least 1 (got {0})")]
    ConfigInvalidK(usize),
    #[error("k+r must be at most {2} (got k={0}, r={1})")]
    ConfigInvalidR(usize, usize, usize),
    #[error("window_blocks must be at least 1 (got {0})")]
    ConfigInvalidWindow(usize),

    #[error("packet too short: {0} bytes, need at least {1}")]
    MalformedPacketTooShort(usize, usize),
    #[error("unknown magic {0:#06x}")]
    MalformedPacketMagic(u16),
    #[error("k/r mismatch: packet carries k={0} r={1}, session expects k={2} r={3}")]
    MalformedPacketKr(u8, u8, u8, u8),
    #[error("payload_len {0} exceeds chunk_bytes {1}")]
    MalformedPacketPayloadLen(u16, u16),

    #[error("failed to construct Reed-Solomon codec for k={0} r={1}")]
    FecGeneratorSingular(usize, usize),
    #[error("not enough chunks to decode: have {0}, need {1}")]
    FecNotEnoughChunks(usize, usize),
    #[error("FEC decode failed: could not reconstruct the missing chunks")]
    FecDecodeSingular,

    #[error("stream incomplete: terminal block never observed or unrecoverable loss occurred")]
    IncompleteStream,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
