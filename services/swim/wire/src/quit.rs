//! Quit section: the sender leaves the cluster.

use crate::cursor::Cursor;
use crate::error::SwimError;
use crate::keys::{BodyKey, QUIT_INCARNATION};
use crate::primitive::{decode_map, decode_uint};
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

/// Encoded section size in bytes, body key included
pub const QUIT_BIN_SIZE: usize = 12;

const MP_FIXMAP_1: u8 = 0x81;
const MP_UINT64: u8 = 0xcf;

/// Decoded quit notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuitDef {
    /// Incarnation the sender had when it left
    pub incarnation: u64,
}

impl QuitDef {
    /// Decode the quit map. It holds exactly one entry, the incarnation.
    pub fn decode(cur: &mut Cursor<'_>, prefix: &str) -> Result<Self, SwimError> {
        let size = decode_map(cur, prefix, "root")?;
        if size != 1 {
            return Err(SwimError::structure(prefix, "map of size 1 is expected"));
        }
        let key = decode_uint(cur, prefix, "a key")?;
        if key != u64::from(QUIT_INCARNATION) {
            return Err(SwimError::structure(prefix, "a key should be incarnation"));
        }
        let incarnation = decode_uint(cur, prefix, "incarnation")?;
        Ok(Self { incarnation })
    }
}

/// Encoded quit section, body key included
#[derive(Debug, Clone)]
pub struct QuitBin {
    buf: [u8; QUIT_BIN_SIZE],
}

impl QuitBin {
    /// Encode a quit notice
    pub fn new(incarnation: u64) -> Self {
        let mut buf = [0u8; QUIT_BIN_SIZE];
        buf[0] = BodyKey::Quit as u8;
        buf[1] = MP_FIXMAP_1;
        buf[2] = QUIT_INCARNATION;
        buf[3] = MP_UINT64;
        buf[4..12].copy_from_slice(&incarnation.to_be_bytes());
        Self { buf }
    }

    /// Encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append the encoded section to `buf`
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: &str = "invalid quit message:";

    #[test]
    fn test_quit_roundtrip() {
        let bin = QuitBin::new(17);
        assert_eq!(&bin.as_bytes()[..4], &[0x04, 0x81, 0x00, 0xcf]);
        let mut cur = Cursor::new(&bin.as_bytes()[1..]);
        assert_eq!(QuitDef::decode(&mut cur, P).unwrap().incarnation, 17);
        assert!(cur.is_empty());
    }

    #[test]
    fn test_quit_shape() {
        let mut buf = Vec::new();
        rmp::encode::write_map_len(&mut buf, 2).unwrap();
        buf.extend_from_slice(&[0, 0, 0, 0]);
        let err = QuitDef::decode(&mut Cursor::new(&buf), P).unwrap_err();
        assert_eq!(err.to_string(), format!("{} map of size 1 is expected", P));

        let buf = [0x81, 0x01, 0x05];
        let err = QuitDef::decode(&mut Cursor::new(&buf), P).unwrap_err();
        assert_eq!(err.to_string(), format!("{} a key should be incarnation", P));
    }
}
