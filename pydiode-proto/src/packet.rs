//! The 12-byte wire header and the packet it frames. Marshal/unmarshal
//! follow this workspace's `bytes::{Buf, BufMut}` convention for fixed
//! binary layouts (see the RTP header in the `rtp` crate this repository
//! grounds on).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::config::SessionConfig;
use crate::error::{Error, Result};

pub const MAGIC: u16 = 0x7054;
pub const HEADER_LEN: usize = 12;

pub const FLAG_LAST_BLOCK: u8 = 0b0000_0001;
pub const FLAG_PARITY: u8 = 0b0000_0010;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub flags: u8,
    pub k: u8,
    pub r: u8,
    pub chunk_index: u8,
    pub block_id: u32,
    pub payload_len: u16,
}

impl Header {
    #[allow(clippy::too_many_arguments)]
    pub fn new(flags: u8, k: u8, r: u8, chunk_index: u8, block_id: u32, payload_len: u16) -> Self {
        Header { flags, k, r, chunk_index, block_id, payload_len }
    }

    pub fn is_last_block(&self) -> bool {
        self.flags & FLAG_LAST_BLOCK != 0
    }

    pub fn is_parity(&self) -> bool {
        self.flags & FLAG_PARITY != 0
    }

    pub fn marshal_to(&self, buf: &mut BytesMut) {
        buf.put_u16(MAGIC);
        buf.put_u8(self.flags);
        buf.put_u8(self.k);
        buf.put_u8(self.r);
        buf.put_u8(self.chunk_index);
        buf.put_u32(self.block_id);
        buf.put_u16(self.payload_len);
    }

    pub fn unmarshal(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < HEADER_LEN {
            return Err(Error::MalformedPacketTooShort(buf.remaining(), HEADER_LEN));
        }
        let magic = buf.get_u16();
        if magic != MAGIC {
            return Err(Error::MalformedPacketMagic(magic));
        }
        let flags = buf.get_u8();
        let k = buf.get_u8();
        let r = buf.get_u8();
        let chunk_index = buf.get_u8();
        let block_id = buf.get_u32();
        let payload_len = buf.get_u16();
        Ok(Header { flags, k, r, chunk_index, block_id, payload_len })
    }
}

#[derive(Debug, Clone)]
pub struct Packet {
    pub header: Header,
    pub payload: Bytes,
}

impl Packet {
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        self.header.marshal_to(&mut buf);
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }

    /// Parses and validates a datagram against the session's negotiated
    /// `chunk_bytes`/`k`/`r`. The all-zero `k == 0 && r == 0` header marks
    /// the empty-stream terminator (§4.1) and is exempt from the k/r match
    /// check, since it precedes any real session block.
    pub fn parse(mut bytes: &[u8], session: &SessionConfig) -> Result<Self> {
        let header = Header::unmarshal(&mut bytes)?;
        let is_terminator = header.k == 0 && header.r == 0;
        if !is_terminator && (header.k as usize != session.k || header.r as usize != session.r) {
            return Err(Error::MalformedPacketKr(header.k, header.r, session.k as u8, session.r as u8));
        }
        if header.payload_len as usize > session.chunk_bytes {
            return Err(Error::MalformedPacketPayloadLen(header.payload_len, session.chunk_bytes as u16));
        }
        if bytes.remaining() != header.payload_len as usize {
            return Err(Error::MalformedPacketTooShort(bytes.remaining(), header.payload_len as usize));
        }
        Ok(Packet { header, payload: Bytes::copy_from_slice(bytes) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = Header::new(FLAG_LAST_BLOCK | FLAG_PARITY, 64, 32, 17, 0xDEADBEEF, 900);
        let mut buf = BytesMut::new();
        header.marshal_to(&mut buf);
        assert_eq!(buf.len(), HEADER_LEN);

        let mut slice = &buf[..];
        let parsed = Header::unmarshal(&mut slice).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn rejects_short_buffer() {
        let mut slice = &[0u8; 4][..];
        assert!(matches!(Header::unmarshal(&mut slice), Err(Error::MalformedPacketTooShort(4, HEADER_LEN))));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = BytesMut::new();
        buf.put_u16(0xBAAD);
        buf.put_bytes(0, HEADER_LEN - 2);
        let mut slice = &buf[..];
        assert!(matches!(Header::unmarshal(&mut slice), Err(Error::MalformedPacketMagic(0xBAAD))));
    }

    #[test]
    fn parse_rejects_kr_mismatch() {
        let session = SessionConfig::new(1024, 4, 2).unwrap();
        let header = Header::new(0, 5, 2, 0, 0, 0);
        let mut buf = BytesMut::new();
        header.marshal_to(&mut buf);
        assert!(matches!(Packet::parse(&buf, &session), Err(Error::MalformedPacketKr(5, 2, 4, 2))));
    }

    #[test]
    fn parse_accepts_empty_stream_terminator_regardless_of_session_kr() {
        let session = SessionConfig::new(1024, 64, 32).unwrap();
        let header = Header::new(FLAG_LAST_BLOCK, 0, 0, 0, 0, 0);
        let mut buf = BytesMut::new();
        header.marshal_to(&mut buf);
        let packet = Packet::parse(&buf, &session).unwrap();
        assert!(packet.header.is_last_block());
        assert_eq!(packet.payload.len(), 0);
    }

    #[test]
    fn parse_round_trips_payload() {
        let session = SessionConfig::new(1024, 4, 2).unwrap();
        let header = Header::new(0, 4, 2, 1, 7, 3);
        let packet = Packet { header, payload: Bytes::from_static(&[1, 2, 3]) };
        let bytes = packet.to_bytes();
        let parsed = Packet::parse(&bytes, &session).unwrap();
        assert_eq!(parsed.header, header);
        assert_eq!(parsed.payload, Bytes::from_static(&[1, 2, 3]));
    }
}
