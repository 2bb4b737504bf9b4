//! Packet assembly and decoding.
//!
//! A packet is the meta header followed by the body map. The body map always
//! carries the sender UUID and any of the optional sections, in key order:
//!
//! ```text
//! meta header (map of 3)
//! body map (fixmap of N)
//!   0 SrcUuid            bin 16
//!   1 AntiEntropy        array16 of members     (optional)
//!   2 FailureDetection   map of 2               (optional)
//!   3 Dissemination      array16 of members     (optional)
//!   4 Quit               map of 1               (optional)
//! ```

use crate::cursor::Cursor;
use crate::error::{ErrorKind, SwimError};
use crate::failure_detection::{
    FailureDetectionBin, FailureDetectionDef, FdMsgType, FD_HEADER_BIN_SIZE,
};
use crate::keys::BodyKey;
use crate::member::{MemberBin, MemberDef, MEMBER_BIN_SIZE};
use crate::meta::{protocol_version, MetaDef, MetaHeaderBin, META_HEADER_BIN_SIZE};
use crate::primitive::{decode_array, decode_map, decode_uint, decode_uuid};
use crate::quit::{QuitBin, QuitDef, QUIT_BIN_SIZE};
use crate::section::{
    AntiEntropyHeaderBin, DisseminationHeaderBin, SrcUuidBin, BATCH_HEADER_BIN_SIZE,
    SRC_UUID_BIN_SIZE,
};
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::net::SocketAddrV4;
use tracing::{debug, trace};
use uuid::Uuid;

/// Default packet budget: one UDP payload on a 1500-byte MTU link
pub const MAX_PACKET_SIZE: usize = 1472;

const BODY_PREFIX: &str = "invalid message:";
const ANTI_ENTROPY_PREFIX: &str = "invalid anti-entropy message:";
const FAILURE_DETECTION_PREFIX: &str = "invalid failure detection message:";
const DISSEMINATION_PREFIX: &str = "invalid dissemination message:";
const QUIT_PREFIX: &str = "invalid quit message:";

const MP_FIXMAP: u8 = 0x80;

/// Body map header size in bytes (fixmap, at most 5 entries)
const BODY_HEADER_SIZE: usize = 1;

/// Fully decoded packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Meta header
    pub meta: MetaDef,
    /// Sender UUID
    pub src_uuid: Uuid,
    /// Ping or ack, if present
    pub failure_detection: Option<FailureDetectionDef>,
    /// Anti-entropy members
    pub anti_entropy: Vec<MemberDef>,
    /// Dissemination events
    pub dissemination: Vec<MemberDef>,
    /// Quit notice, if present
    pub quit: Option<QuitDef>,
}

impl Packet {
    /// Decode a whole packet.
    ///
    /// Stops at the first malformed field. Bytes after the body map are
    /// ignored.
    pub fn decode(buf: &[u8]) -> Result<Self, SwimError> {
        Self::decode_sections(buf).map_err(|e| {
            debug!(len = buf.len(), error = %e, "rejected packet");
            e
        })
    }

    fn decode_sections(buf: &[u8]) -> Result<Self, SwimError> {
        let mut cur = Cursor::new(buf);
        let meta = MetaDef::decode(&mut cur)?;

        let size = decode_map(&mut cur, BODY_PREFIX, "root")?;
        let mut src_uuid = Uuid::nil();
        let mut failure_detection = None;
        let mut anti_entropy = Vec::new();
        let mut dissemination = Vec::new();
        let mut quit = None;

        for _ in 0..size {
            let key = decode_uint(&mut cur, BODY_PREFIX, "a key")?;
            match BodyKey::try_from(key) {
                Ok(BodyKey::SrcUuid) => {
                    src_uuid = decode_uuid(&mut cur, BODY_PREFIX, "source uuid")?;
                }
                Ok(BodyKey::AntiEntropy) => {
                    anti_entropy = decode_members(&mut cur, ANTI_ENTROPY_PREFIX)?;
                }
                Ok(BodyKey::FailureDetection) => {
                    failure_detection = Some(FailureDetectionDef::decode(
                        &mut cur,
                        FAILURE_DETECTION_PREFIX,
                    )?);
                }
                Ok(BodyKey::Dissemination) => {
                    dissemination = decode_members(&mut cur, DISSEMINATION_PREFIX)?;
                }
                Ok(BodyKey::Quit) => {
                    quit = Some(QuitDef::decode(&mut cur, QUIT_PREFIX)?);
                }
                Err(_) => return Err(SwimError::structure(BODY_PREFIX, "unexpected key")),
            }
        }

        if src_uuid.is_nil() {
            return Err(SwimError::missing(BODY_PREFIX, "source uuid is mandatory"));
        }
        if !cur.is_empty() {
            trace!(trailing = cur.remaining(), "ignoring bytes after packet body");
        }

        Ok(Self {
            meta,
            src_uuid,
            failure_detection,
            anti_entropy,
            dissemination,
            quit,
        })
    }
}

/// Decode an array of member records
fn decode_members(cur: &mut Cursor<'_>, prefix: &str) -> Result<Vec<MemberDef>, SwimError> {
    // The array header check bounds `size` by the bytes left.
    let size = decode_array(cur, prefix, "root")?;
    let mut members = Vec::with_capacity(size as usize);
    for _ in 0..size {
        members.push(MemberDef::decode(cur, prefix)?);
    }
    Ok(members)
}

/// Encode as many members as fit in `budget` bytes behind a batch header.
///
/// Returns the header plus records, and the number of records encoded, or
/// `None` when not even one record fits.
fn encode_batch(
    members: &[MemberDef],
    budget: usize,
    header: impl FnOnce(u16) -> Vec<u8>,
) -> Option<(Bytes, usize)> {
    let room = budget.saturating_sub(BATCH_HEADER_BIN_SIZE) / MEMBER_BIN_SIZE;
    let count = members.len().min(room).min(u16::MAX as usize);
    if count == 0 {
        return None;
    }

    let mut buf = BytesMut::with_capacity(BATCH_HEADER_BIN_SIZE + count * MEMBER_BIN_SIZE);
    buf.put_slice(&header(count as u16));
    let mut bin = MemberBin::new();
    for member in &members[..count] {
        bin.fill(member);
        bin.encode(&mut buf);
    }
    Some((buf.freeze(), count))
}

/// Builder for outgoing packets
#[derive(Debug, Clone)]
pub struct PacketBuilder {
    src: SocketAddrV4,
    src_uuid: Uuid,
    version: u32,
    max_size: usize,
    anti_entropy: Option<Bytes>,
    failure_detection: Option<FailureDetectionBin>,
    dissemination: Option<Bytes>,
    quit: Option<QuitBin>,
}

impl PacketBuilder {
    /// Create a builder for packets sent from `src` by the member `src_uuid`
    pub fn new(src: SocketAddrV4, src_uuid: Uuid) -> Self {
        Self {
            src,
            src_uuid,
            version: protocol_version(),
            max_size: MAX_PACKET_SIZE,
            anti_entropy: None,
            failure_detection: None,
            dissemination: None,
            quit: None,
        }
    }

    /// Override the protocol version stamped into the meta header
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Set the packet size budget
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Add a ping or ack section, replacing any previous one
    pub fn failure_detection(&mut self, msg_type: FdMsgType, incarnation: u64) -> &mut Self {
        self.failure_detection = Some(FailureDetectionBin::new(msg_type, incarnation));
        self
    }

    /// Add a quit section, replacing any previous one
    pub fn quit(&mut self, incarnation: u64) -> &mut Self {
        self.quit = Some(QuitBin::new(incarnation));
        self
    }

    /// Add an anti-entropy batch with as many of `members` as fit.
    ///
    /// Replaces any previous batch. Returns the number of members encoded;
    /// zero means no section was added.
    pub fn anti_entropy(&mut self, members: &[MemberDef]) -> usize {
        self.anti_entropy = None;
        let budget = self.max_size.saturating_sub(self.encoded_len());
        let batch = encode_batch(members, budget, |n| {
            AntiEntropyHeaderBin::new(n).as_bytes().to_vec()
        });
        let count = batch.as_ref().map_or(0, |(_, count)| *count);
        if count < members.len() {
            debug!(total = members.len(), encoded = count, "anti-entropy batch clipped");
        }
        self.anti_entropy = batch.map(|(bytes, _)| bytes);
        count
    }

    /// Add a dissemination batch with as many of `events` as fit.
    ///
    /// Replaces any previous batch. Returns the number of events encoded;
    /// zero means no section was added.
    pub fn dissemination(&mut self, events: &[MemberDef]) -> usize {
        self.dissemination = None;
        let budget = self.max_size.saturating_sub(self.encoded_len());
        let batch = encode_batch(events, budget, |n| {
            DisseminationHeaderBin::new(n).as_bytes().to_vec()
        });
        let count = batch.as_ref().map_or(0, |(_, count)| *count);
        if count < events.len() {
            debug!(total = events.len(), encoded = count, "dissemination batch clipped");
        }
        self.dissemination = batch.map(|(bytes, _)| bytes);
        count
    }

    /// Size of the packet as currently assembled
    pub fn encoded_len(&self) -> usize {
        META_HEADER_BIN_SIZE
            + BODY_HEADER_SIZE
            + SRC_UUID_BIN_SIZE
            + self.anti_entropy.as_ref().map_or(0, Bytes::len)
            + self.failure_detection.as_ref().map_or(0, |_| FD_HEADER_BIN_SIZE)
            + self.dissemination.as_ref().map_or(0, Bytes::len)
            + self.quit.as_ref().map_or(0, |_| QUIT_BIN_SIZE)
    }

    /// Number of entries in the body map
    fn body_size(&self) -> u8 {
        1 + u8::from(self.anti_entropy.is_some())
            + u8::from(self.failure_detection.is_some())
            + u8::from(self.dissemination.is_some())
            + u8::from(self.quit.is_some())
    }

    /// Render the packet
    pub fn build(&self) -> Result<Bytes, SwimError> {
        let total = self.encoded_len();
        if total > self.max_size {
            return Err(SwimError::new(
                ErrorKind::OutOfRange,
                format!("packet of {} bytes exceeds limit of {}", total, self.max_size),
            ));
        }

        let mut buf = BytesMut::with_capacity(total);
        MetaHeaderBin::new(self.src, self.version).encode(&mut buf);
        buf.put_u8(MP_FIXMAP | self.body_size());
        SrcUuidBin::new(&self.src_uuid).encode(&mut buf);
        if let Some(ref batch) = self.anti_entropy {
            buf.put_slice(batch);
        }
        if let Some(ref fd) = self.failure_detection {
            fd.encode(&mut buf);
        }
        if let Some(ref batch) = self.dissemination {
            buf.put_slice(batch);
        }
        if let Some(ref quit) = self.quit {
            quit.encode(&mut buf);
        }

        Ok(buf.freeze())
    }
}
