//! Body section headers: sender UUID and member batch headers.
//!
//! Batch headers always use the 16-bit array form so their size does not
//! depend on the count. They render whatever count they are given; the packet
//! assembler keeps it equal to the number of records that follow.

use crate::keys::BodyKey;
use crate::primitive::UUID_LEN;
use bytes::{BufMut, BytesMut};
use uuid::Uuid;

/// Encoded sender UUID entry size in bytes
pub const SRC_UUID_BIN_SIZE: usize = 3 + UUID_LEN;

/// Encoded batch header size in bytes
pub const BATCH_HEADER_BIN_SIZE: usize = 4;

const MP_BIN8: u8 = 0xc4;
const MP_ARRAY16: u8 = 0xdc;

/// Encoded sender UUID entry of the body map
#[derive(Debug, Clone)]
pub struct SrcUuidBin {
    buf: [u8; SRC_UUID_BIN_SIZE],
}

impl SrcUuidBin {
    /// Encode the sender UUID
    pub fn new(uuid: &Uuid) -> Self {
        let mut buf = [0u8; SRC_UUID_BIN_SIZE];
        buf[0] = BodyKey::SrcUuid as u8;
        buf[1] = MP_BIN8;
        buf[2] = UUID_LEN as u8;
        buf[3..].copy_from_slice(uuid.as_bytes());
        Self { buf }
    }

    /// Encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append the encoded entry to `buf`
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.buf);
    }
}

fn batch_header(key: BodyKey, batch_size: u16) -> [u8; BATCH_HEADER_BIN_SIZE] {
    let [hi, lo] = batch_size.to_be_bytes();
    [key as u8, MP_ARRAY16, hi, lo]
}

/// Header of an anti-entropy batch
#[derive(Debug, Clone)]
pub struct AntiEntropyHeaderBin {
    buf: [u8; BATCH_HEADER_BIN_SIZE],
}

impl AntiEntropyHeaderBin {
    /// Header announcing `batch_size` member records
    pub fn new(batch_size: u16) -> Self {
        Self {
            buf: batch_header(BodyKey::AntiEntropy, batch_size),
        }
    }

    /// Encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append the encoded header to `buf`
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.buf);
    }
}

/// Header of a dissemination batch
#[derive(Debug, Clone)]
pub struct DisseminationHeaderBin {
    buf: [u8; BATCH_HEADER_BIN_SIZE],
}

impl DisseminationHeaderBin {
    /// Header announcing `batch_size` event records
    pub fn new(batch_size: u16) -> Self {
        Self {
            buf: batch_header(BodyKey::Dissemination, batch_size),
        }
    }

    /// Encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append the encoded header to `buf`
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::Cursor;
    use crate::primitive::{decode_array, decode_uuid};

    #[test]
    fn test_src_uuid_bin() {
        let uuid = Uuid::from_bytes([0xab; 16]);
        let bin = SrcUuidBin::new(&uuid);
        assert_eq!(bin.as_bytes()[0], BodyKey::SrcUuid as u8);
        let mut cur = Cursor::new(&bin.as_bytes()[1..]);
        assert_eq!(decode_uuid(&mut cur, "p", "source uuid").unwrap(), uuid);
    }

    #[test]
    fn test_batch_headers() {
        assert_eq!(AntiEntropyHeaderBin::new(0x0102).as_bytes(), &[0x01, 0xdc, 0x01, 0x02]);
        assert_eq!(DisseminationHeaderBin::new(3).as_bytes(), &[0x03, 0xdc, 0x00, 0x03]);

        // A zero-length array decodes even with nothing after it.
        let bin = AntiEntropyHeaderBin::new(0);
        let mut cur = Cursor::new(&bin.as_bytes()[1..]);
        assert_eq!(decode_array(&mut cur, "p", "root").unwrap(), 0);
    }
}
