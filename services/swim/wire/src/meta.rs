//! Meta header: protocol version and sender address.
//!
//! Every packet starts with this map, outside the body map.

use crate::cursor::Cursor;
use crate::error::SwimError;
use crate::keys::MetaKey;
use crate::primitive::{decode_ip, decode_map, decode_port, decode_uint};
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddrV4};

/// Encoded meta header size in bytes
pub const META_HEADER_BIN_SIZE: usize = 17;

const META_PREFIX: &str = "invalid meta section:";

const MP_FIXMAP_3: u8 = 0x83;
const MP_UINT16: u8 = 0xcd;
const MP_UINT32: u8 = 0xce;

/// Protocol version stamped into outgoing meta headers.
///
/// Packs the crate version as `major << 16 | minor << 8 | patch`.
pub fn protocol_version() -> u32 {
    let part = |s: &str| s.parse::<u32>().unwrap_or(0) & 0xff;
    (part(env!("CARGO_PKG_VERSION_MAJOR")) << 16)
        | (part(env!("CARGO_PKG_VERSION_MINOR")) << 8)
        | part(env!("CARGO_PKG_VERSION_PATCH"))
}

/// Decoded meta header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaDef {
    /// Sender protocol version
    pub version: u32,
    /// Sender UDP address
    pub src: SocketAddrV4,
}

impl MetaDef {
    /// Decode the meta map. Version and source address are mandatory.
    pub fn decode(cur: &mut Cursor<'_>) -> Result<Self, SwimError> {
        let prefix = META_PREFIX;
        let size = decode_map(cur, prefix, "root")?;
        let mut version = 0u32;
        let mut ip = Ipv4Addr::UNSPECIFIED;
        let mut port = 0u16;

        for _ in 0..size {
            let key = decode_uint(cur, prefix, "a key")?;
            match MetaKey::try_from(key) {
                Ok(MetaKey::Version) => {
                    let value = decode_uint(cur, prefix, "version")?;
                    version = u32::try_from(value)
                        .map_err(|_| SwimError::out_of_range(prefix, "invalid version, too big"))?;
                }
                Ok(MetaKey::SrcAddress) => ip = decode_ip(cur, prefix, "source address")?,
                Ok(MetaKey::SrcPort) => port = decode_port(cur, prefix, "source port")?,
                Err(_) => return Err(SwimError::structure(prefix, "unknown key")),
            }
        }

        if version == 0 {
            return Err(SwimError::missing(prefix, "version is mandatory"));
        }
        if port == 0 || ip.is_unspecified() {
            return Err(SwimError::missing(prefix, "source address is mandatory"));
        }

        Ok(Self {
            version,
            src: SocketAddrV4::new(ip, port),
        })
    }
}

/// Encoded meta header
#[derive(Debug, Clone)]
pub struct MetaHeaderBin {
    buf: [u8; META_HEADER_BIN_SIZE],
}

impl MetaHeaderBin {
    /// Encode a meta header for `src` with an explicit version
    pub fn new(src: SocketAddrV4, version: u32) -> Self {
        let mut buf = [0u8; META_HEADER_BIN_SIZE];
        buf[0] = MP_FIXMAP_3;
        buf[1] = MetaKey::Version as u8;
        buf[2] = MP_UINT32;
        buf[3..7].copy_from_slice(&version.to_be_bytes());
        buf[7] = MetaKey::SrcAddress as u8;
        buf[8] = MP_UINT32;
        buf[9..13].copy_from_slice(&u32::from(*src.ip()).to_be_bytes());
        buf[13] = MetaKey::SrcPort as u8;
        buf[14] = MP_UINT16;
        buf[15..17].copy_from_slice(&src.port().to_be_bytes());
        Self { buf }
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
