//! MessagePack wire codec for SWIM cluster membership.
//!
//! This crate encodes and decodes the packets SWIM nodes exchange: the meta
//! header, failure detection pings and acks, anti-entropy and dissemination
//! member batches, and quit notices. It does no I/O; transport and the
//! membership state machine live with the caller.
//!
//! ## Features
//!
//! - **Strict Decoding**: Type marker, then bounds, then consumption; the first
//!   malformed field aborts the whole decode
//! - **Bounded Reads**: Declared sizes are checked against the bytes left
//!   before any iteration or allocation
//! - **Fixed Templates**: Encoders write fixed layouts with explicit
//!   big-endian fields, reusable across a batch
//! - **Budgeted Assembly**: Member batches are clipped to the packet size
//!
//! ## Wire Format
//!
//! ```text
//! +----------------------+----------------------------+
//! | meta map (17B)       | version, source ip, port   |
//! +----------------------+----------------------------+
//! | body map header (1B) | fixmap of N sections       |
//! +----------------------+----------------------------+
//! | src uuid (19B)       | key 0, bin 16              |
//! +----------------------+----------------------------+
//! | anti-entropy (opt)   | key 1, array16 of members  |
//! +----------------------+----------------------------+
//! | failure det. (opt)   | key 2, map of 2            |
//! +----------------------+----------------------------+
//! | dissemination (opt)  | key 3, array16 of members  |
//! +----------------------+----------------------------+
//! | quit (opt)           | key 4, map of 1            |
//! +----------------------+----------------------------+
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cursor;
pub mod error;
pub mod failure_detection;
pub mod keys;
pub mod member;
pub mod meta;
pub mod packet;
pub mod primitive;
pub mod quit;
pub mod section;

// Re-export main types
pub use cursor::Cursor;
pub use error::{ErrorKind, SwimError};
pub use failure_detection::{
    FailureDetectionBin, FailureDetectionDef, FdMsgType, FD_HEADER_BIN_SIZE,
};
pub use keys::{BodyKey, FdKey, MemberKey, MetaKey, QUIT_INCARNATION};
pub use member::{MemberBin, MemberDef, MemberStatus, MEMBER_BIN_SIZE, PASSPORT_BIN_SIZE};
pub use meta::{protocol_version, MetaDef, MetaHeaderBin, META_HEADER_BIN_SIZE};
pub use packet::{Packet, PacketBuilder, MAX_PACKET_SIZE};
pub use primitive::{
    decode_array, decode_ip, decode_map, decode_port, decode_uint, decode_uuid, UUID_LEN,
};
pub use quit::{QuitBin, QuitDef, QUIT_BIN_SIZE};
pub use section::{
    AntiEntropyHeaderBin, DisseminationHeaderBin, SrcUuidBin, BATCH_HEADER_BIN_SIZE,
    SRC_UUID_BIN_SIZE,
};
