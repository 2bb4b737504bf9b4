//! Member records: the passport shared by anti-entropy and dissemination.
//!
//! A member is encoded as a 5-entry map. The encoder always emits the same
//! 42-byte layout; the decoder accepts any key order and any uint width.
//!
//! ```text
//! 0x85
//!   0 status              (fixint)
//!   1 0xce u32 ip         (big-endian)
//!   2 0xcd u16 port       (big-endian)
//!   3 0xc4 16 uuid[16]
//!   4 0xcf u64 incarnation
//! ```

use crate::cursor::Cursor;
use crate::error::SwimError;
use crate::keys::MemberKey;
use crate::primitive::{decode_ip, decode_map, decode_port, decode_uint, decode_uuid, UUID_LEN};
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::str::FromStr;
use uuid::Uuid;

/// Passport size in bytes
pub const PASSPORT_BIN_SIZE: usize = 41;

/// Encoded member size in bytes
pub const MEMBER_BIN_SIZE: usize = 1 + PASSPORT_BIN_SIZE;

const MP_FIXMAP_5: u8 = 0x85;
const MP_UINT16: u8 = 0xcd;
const MP_UINT32: u8 = 0xce;
const MP_UINT64: u8 = 0xcf;
const MP_BIN8: u8 = 0xc4;

// Passport field offsets
const K_STATUS: usize = 0;
const V_STATUS: usize = 1;
const K_ADDR: usize = 2;
const M_ADDR: usize = 3;
const V_ADDR: usize = 4;
const K_PORT: usize = 8;
const M_PORT: usize = 9;
const V_PORT: usize = 10;
const K_UUID: usize = 12;
const M_UUID: usize = 13;
const M_UUID_LEN: usize = 14;
const V_UUID: usize = 15;
const K_INCARNATION: usize = 31;
const M_INCARNATION: usize = 32;
const V_INCARNATION: usize = 33;

/// Member status as seen by the sender
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    /// Member responds to pings
    Alive = 0,
    /// Member failed to respond in time
    Dead = 1,
    /// Member left the cluster voluntarily
    Left = 2,
}

impl MemberStatus {
    /// Lowercase name of the status
    pub fn as_str(self) -> &'static str {
        match self {
            MemberStatus::Alive => "alive",
            MemberStatus::Dead => "dead",
            MemberStatus::Left => "left",
        }
    }
}

impl TryFrom<u64> for MemberStatus {
    type Error = u64;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MemberStatus::Alive),
            1 => Ok(MemberStatus::Dead),
            2 => Ok(MemberStatus::Left),
            _ => Err(value),
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alive" => Ok(MemberStatus::Alive),
            "dead" => Ok(MemberStatus::Dead),
            "left" => Ok(MemberStatus::Left),
            other => Err(format!("unknown member status '{}'", other)),
        }
    }
}

/// Decoded member descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDef {
    /// Member status
    pub status: MemberStatus,
    /// Member UDP address
    pub addr: SocketAddrV4,
    /// Member UUID
    pub uuid: Uuid,
    /// Member incarnation
    pub incarnation: u64,
}

impl MemberDef {
    /// Create an alive member with incarnation 0
    pub fn new(addr: SocketAddrV4, uuid: Uuid) -> Self {
        Self {
            status: MemberStatus::Alive,
            addr,
            uuid,
            incarnation: 0,
        }
    }

    /// Decode one member map.
    ///
    /// Address and UUID are mandatory; status defaults to alive and
    /// incarnation to 0.
    pub fn decode(cur: &mut Cursor<'_>, prefix: &str) -> Result<Self, SwimError> {
        let size = decode_map(cur, prefix, "member")?;
        let mut status = MemberStatus::Alive;
        let mut ip = Ipv4Addr::UNSPECIFIED;
        let mut port = 0u16;
        let mut uuid = Uuid::nil();
        let mut incarnation = 0u64;

        for _ in 0..size {
            let key = decode_uint(cur, prefix, "member key")?;
            let key = MemberKey::try_from(key)
                .map_err(|_| SwimError::structure(prefix, "unknown member key"))?;
            match key {
                MemberKey::Status => {
                    let value = decode_uint(cur, prefix, "member status")?;
                    status = MemberStatus::try_from(value)
                        .map_err(|_| SwimError::out_of_range(prefix, "unknown member status"))?;
                }
                MemberKey::Address => ip = decode_ip(cur, prefix, "member address")?,
                MemberKey::Port => port = decode_port(cur, prefix, "member port")?,
                MemberKey::Uuid => uuid = decode_uuid(cur, prefix, "member uuid")?,
                MemberKey::Incarnation => {
                    incarnation = decode_uint(cur, prefix, "member incarnation")?
                }
            }
        }

        if port == 0 || ip.is_unspecified() {
            return Err(SwimError::missing(prefix, "member address is mandatory"));
        }
        if uuid.is_nil() {
            return Err(SwimError::missing(prefix, "member uuid is mandatory"));
        }

        Ok(Self {
            status,
            addr: SocketAddrV4::new(ip, port),
            uuid,
            incarnation,
        })
    }
}

/// Write the constant keys and markers of a passport
fn passport_bin_create(passport: &mut [u8]) {
    passport[K_STATUS] = MemberKey::Status as u8;
    passport[K_ADDR] = MemberKey::Address as u8;
    passport[M_ADDR] = MP_UINT32;
    passport[K_PORT] = MemberKey::Port as u8;
    passport[M_PORT] = MP_UINT16;
    passport[K_UUID] = MemberKey::Uuid as u8;
    passport[M_UUID] = MP_BIN8;
    passport[M_UUID_LEN] = UUID_LEN as u8;
    passport[K_INCARNATION] = MemberKey::Incarnation as u8;
    passport[M_INCARNATION] = MP_UINT64;
}

/// Overwrite the variable fields of a passport
fn passport_bin_fill(passport: &mut [u8], def: &MemberDef) {
    passport[V_STATUS] = def.status as u8;
    passport[V_ADDR..V_ADDR + 4].copy_from_slice(&u32::from(*def.addr.ip()).to_be_bytes());
    passport[V_PORT..V_PORT + 2].copy_from_slice(&def.addr.port().to_be_bytes());
    passport[V_UUID..V_UUID + UUID_LEN].copy_from_slice(def.uuid.as_bytes());
    passport[V_INCARNATION..V_INCARNATION + 8].copy_from_slice(&def.incarnation.to_be_bytes());
}

/// Reusable encoding template for one member record.
///
/// `new` writes the map header and all keys and markers once; `fill` only
/// rewrites status, address, UUID and incarnation, so one template can encode
/// a whole batch.
#[derive(Debug, Clone)]
pub struct MemberBin {
    buf: [u8; MEMBER_BIN_SIZE],
}

impl MemberBin {
    /// Create a template with an empty passport
    pub fn new() -> Self {
        let mut buf = [0u8; MEMBER_BIN_SIZE];
        buf[0] = MP_FIXMAP_5;
        passport_bin_create(&mut buf[1..]);
        Self { buf }
    }

    /// Store the fields of `def`
    pub fn fill(&mut self, def: &MemberDef) {
        passport_bin_fill(&mut self.buf[1..], def);
    }

    /// Encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append the encoded record to `buf`
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.buf);
    }
}

impl Default for MemberBin {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const P: &str = "invalid anti-entropy message:";

    fn sample() -> MemberDef {
        let mut raw = [0u8; 16];
        raw[0] = 1;
        MemberDef {
            status: MemberStatus::Alive,
            addr: SocketAddrV4::new(Ipv4Addr::new(192, 0, 2, 1), 7777),
            uuid: Uuid::from_bytes(raw),
            incarnation: 42,
        }
    }

    fn encode(def: &MemberDef) -> Vec<u8> {
        let mut bin = MemberBin::new();
        bin.fill(def);
        bin.as_bytes().to_vec()
    }

    #[test]
    fn test_member_roundtrip() {
        let def = sample();
        let bytes = encode(&def);
        assert_eq!(bytes.len(), MEMBER_BIN_SIZE);

        let mut cur = Cursor::new(&bytes);
        let decoded = MemberDef::decode(&mut cur, P).unwrap();
        assert!(cur.is_empty());
        assert_eq!(decoded.status, MemberStatus::Alive);
        assert_eq!(decoded.addr, SocketAddrV4::new(Ipv4Addr::new(192, 0, 2, 1), 7777));
        assert_eq!(decoded.uuid, def.uuid);
        assert_eq!(decoded.incarnation, 42);
    }

    #[test]
    fn test_member_bin_layout() {
        let bytes = encode(&sample());
        assert_eq!(&bytes[..8], &[0x85, 0x00, 0x00, 0x01, 0xce, 192, 0, 2]);
        assert_eq!(&bytes[8..13], &[1, 0x02, 0xcd, 0x1e, 0x61]);
        assert_eq!(&bytes[13..16], &[0x03, 0xc4, 16]);
        assert_eq!(bytes[16], 1);
        assert_eq!(&bytes[32..35], &[0x04, 0xcf, 0x00]);
        assert_eq!(bytes[41], 42);
    }

    #[test]
    fn test_template_reuse_across_batch() {
        let mut bin = MemberBin::new();
        for status in [MemberStatus::Dead, MemberStatus::Left, MemberStatus::Alive] {
            let mut def = sample();
            def.status = status;
            def.incarnation = u64::MAX;
            bin.fill(&def);
            let decoded = MemberDef::decode(&mut Cursor::new(bin.as_bytes()), P).unwrap();
            assert_eq!(decoded, def);
        }
    }

    #[test]
    fn test_any_key_order_and_default_incarnation() {
        let mut buf = Vec::new();
        rmp::encode::write_map_len(&mut buf, 3).unwrap();
        rmp::encode::write_uint(&mut buf, MemberKey::Uuid as u64).unwrap();
        rmp::encode::write_bin(&mut buf, &[9u8; 16]).unwrap();
        rmp::encode::write_uint(&mut buf, MemberKey::Port as u64).unwrap();
        rmp::encode::write_uint(&mut buf, 3301).unwrap();
        rmp::encode::write_uint(&mut buf, MemberKey::Address as u64).unwrap();
        rmp::encode::write_uint(&mut buf, 0x7f000001).unwrap();

        let def = MemberDef::decode(&mut Cursor::new(&buf), P).unwrap();
        assert_eq!(def.status, MemberStatus::Alive);
        assert_eq!(def.addr, SocketAddrV4::new(Ipv4Addr::LOCALHOST, 3301));
        assert_eq!(def.uuid, Uuid::from_bytes([9u8; 16]));
        assert_eq!(def.incarnation, 0);
    }

    #[test]
    fn test_missing_address() {
        let mut buf = Vec::new();
        rmp::encode::write_map_len(&mut buf, 1).unwrap();
        rmp::encode::write_uint(&mut buf, MemberKey::Uuid as u64).unwrap();
        rmp::encode::write_bin(&mut buf, &[9u8; 16]).unwrap();
        let err = MemberDef::decode(&mut Cursor::new(&buf), P).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Missing);
        assert_eq!(
            err.to_string(),
            "invalid anti-entropy message: member address is mandatory"
        );
    }

    #[test]
    fn test_missing_uuid() {
        let mut buf = Vec::new();
        rmp::encode::write_map_len(&mut buf, 2).unwrap();
        rmp::encode::write_uint(&mut buf, MemberKey::Address as u64).unwrap();
        rmp::encode::write_uint(&mut buf, 0x7f000001).unwrap();
        rmp::encode::write_uint(&mut buf, MemberKey::Port as u64).unwrap();
        rmp::encode::write_uint(&mut buf, 3301).unwrap();
        let err = MemberDef::decode(&mut Cursor::new(&buf), P).unwrap_err();
        assert!(err.to_string().ends_with("member uuid is mandatory"));
    }

    #[test]
    fn test_unknown_key_and_status() {
        let mut buf = Vec::new();
        rmp::encode::write_map_len(&mut buf, 1).unwrap();
        rmp::encode::write_uint(&mut buf, 5).unwrap();
        rmp::encode::write_uint(&mut buf, 0).unwrap();
        let err = MemberDef::decode(&mut Cursor::new(&buf), P).unwrap_err();
        assert_eq!(err.to_string(), format!("{} unknown member key", P));

        let mut buf = Vec::new();
        rmp::encode::write_map_len(&mut buf, 1).unwrap();
        rmp::encode::write_uint(&mut buf, MemberKey::Status as u64).unwrap();
        rmp::encode::write_uint(&mut buf, 3).unwrap();
        let err = MemberDef::decode(&mut Cursor::new(&buf), P).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        assert_eq!(err.to_string(), format!("{} unknown member status", P));
    }

    #[test]
    fn test_port_out_of_range() {
        let mut buf = Vec::new();
        rmp::encode::write_map_len(&mut buf, 1).unwrap();
        rmp::encode::write_uint(&mut buf, MemberKey::Port as u64).unwrap();
        rmp::encode::write_uint(&mut buf, 70000).unwrap();
        let err = MemberDef::decode(&mut Cursor::new(&buf), P).unwrap_err();
        assert_eq!(err.to_string(), format!("{} member port is an invalid port", P));
    }

    #[test]
    fn test_every_truncation_fails() {
        let bytes = encode(&sample());
        for len in 0..bytes.len() {
            let mut cur = Cursor::new(&bytes[..len]);
            assert!(MemberDef::decode(&mut cur, P).is_err(), "prefix {} decoded", len);
            assert!(cur.position() <= len);
        }
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(MemberStatus::Left.to_string(), "left");
        assert_eq!("dead".parse::<MemberStatus>().unwrap(), MemberStatus::Dead);
        assert!("suspect".parse::<MemberStatus>().is_err());
    }
}
