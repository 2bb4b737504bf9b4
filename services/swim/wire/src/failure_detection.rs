//! Failure detection section: ping and ack.

use crate::cursor::Cursor;
use crate::error::SwimError;
use crate::keys::{BodyKey, FdKey};
use crate::primitive::{decode_map, decode_uint};
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Encoded section size in bytes, body key included
pub const FD_HEADER_BIN_SIZE: usize = 14;

const MP_FIXMAP_2: u8 = 0x82;
const MP_UINT64: u8 = 0xcf;

/// Failure detection message type
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FdMsgType {
    /// Probe
    Ping = 0,
    /// Reply to a probe
    Ack = 1,
}

impl TryFrom<u64> for FdMsgType {
    type Error = u64;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FdMsgType::Ping),
            1 => Ok(FdMsgType::Ack),
            _ => Err(value),
        }
    }
}

impl fmt::Display for FdMsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FdMsgType::Ping => f.write_str("ping"),
            FdMsgType::Ack => f.write_str("ack"),
        }
    }
}

/// Decoded failure detection header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetectionDef {
    /// Ping or ack
    pub msg_type: FdMsgType,
    /// Sender incarnation
    pub incarnation: u64,
}

impl FailureDetectionDef {
    /// Decode the failure detection map.
    ///
    /// The map must hold exactly two entries, one message type and one
    /// incarnation. A key given twice is rejected.
    pub fn decode(cur: &mut Cursor<'_>, prefix: &str) -> Result<Self, SwimError> {
        let size = decode_map(cur, prefix, "root")?;
        if size != 2 {
            return Err(SwimError::structure(
                prefix,
                "root map should have two keys - message type and incarnation",
            ));
        }

        let mut msg_type = None;
        let mut incarnation = None;
        for _ in 0..size {
            let key = decode_uint(cur, prefix, "a key")?;
            match FdKey::try_from(key) {
                Ok(FdKey::MsgType) => {
                    if msg_type.is_some() {
                        return Err(SwimError::structure(prefix, "duplicate key"));
                    }
                    let value = decode_uint(cur, prefix, "message type")?;
                    let value = FdMsgType::try_from(value)
                        .map_err(|_| SwimError::out_of_range(prefix, "unknown message type"))?;
                    msg_type = Some(value);
                }
                Ok(FdKey::Incarnation) => {
                    if incarnation.is_some() {
                        return Err(SwimError::structure(prefix, "duplicate key"));
                    }
                    incarnation = Some(decode_uint(cur, prefix, "incarnation")?);
                }
                Err(_) => return Err(SwimError::structure(prefix, "unexpected key")),
            }
        }

        // Two entries with no duplicates means both keys were seen.
        match (msg_type, incarnation) {
            (Some(msg_type), Some(incarnation)) => Ok(Self {
                msg_type,
                incarnation,
            }),
            _ => Err(SwimError::missing(prefix, "message type should be specified")),
        }
    }
}

/// Encoded failure detection section, body key included
#[derive(Debug, Clone)]
pub struct FailureDetectionBin {
    buf: [u8; FD_HEADER_BIN_SIZE],
}

impl FailureDetectionBin {
    /// Encode a ping or ack carrying the sender incarnation
    pub fn new(msg_type: FdMsgType, incarnation: u64) -> Self {
        let mut buf = [0u8; FD_HEADER_BIN_SIZE];
        buf[0] = BodyKey::FailureDetection as u8;
        buf[1] = MP_FIXMAP_2;
        buf[2] = FdKey::MsgType as u8;
        buf[3] = msg_type as u8;
        buf[4] = FdKey::Incarnation as u8;
        buf[5] = MP_UINT64;
        buf[6..14].copy_from_slice(&incarnation.to_be_bytes());
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
