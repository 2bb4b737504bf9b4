//! Type-checked MessagePack readers.
//!
//! Each reader checks the type marker first, then the declared size against the
//! remaining bytes, and only then consumes input. On failure the cursor is left
//! where it was.

use crate::cursor::Cursor;
use crate::error::{ErrorKind, SwimError};
use rmp::decode::{self, ValueReadError};
use rmp::Marker;
use std::io;
use std::net::Ipv4Addr;
use uuid::Uuid;

/// Length of a binary UUID on the wire
pub const UUID_LEN: usize = 16;

/// Smallest encoding of one map entry: a fixint key and a fixint value
const MIN_MAP_ENTRY_LEN: u64 = 2;

/// Smallest encoding of one array element
const MIN_ARRAY_ITEM_LEN: u64 = 1;

/// Read a map header and return its entry count
pub fn decode_map(cur: &mut Cursor<'_>, prefix: &str, field: &str) -> Result<u32, SwimError> {
    const WHAT: &str = "a map";
    let (size, probe) = read_header(cur, prefix, field, WHAT, decode::read_map_len)?;
    if u64::from(size) * MIN_MAP_ENTRY_LEN > probe.remaining() as u64 {
        return Err(SwimError::truncated(prefix, field, WHAT));
    }
    *cur = probe;
    Ok(size)
}

/// Read an array header and return its element count
pub fn decode_array(cur: &mut Cursor<'_>, prefix: &str, field: &str) -> Result<u32, SwimError> {
    const WHAT: &str = "an array";
    let (size, probe) = read_header(cur, prefix, field, WHAT, decode::read_array_len)?;
    if u64::from(size) * MIN_ARRAY_ITEM_LEN > probe.remaining() as u64 {
        return Err(SwimError::truncated(prefix, field, WHAT));
    }
    *cur = probe;
    Ok(size)
}

/// Read an unsigned integer of any width
pub fn decode_uint(cur: &mut Cursor<'_>, prefix: &str, field: &str) -> Result<u64, SwimError> {
    const WHAT: &str = "a uint";
    let (marker, mut probe) = next_marker(cur, prefix, field, WHAT)?;
    let value = match marker {
        Marker::FixPos(n) => Some(u64::from(n)),
        Marker::U8 => probe.read_u8().map(u64::from),
        Marker::U16 => probe.read_u16().map(u64::from),
        Marker::U32 => probe.read_u32().map(u64::from),
        Marker::U64 => probe.read_u64(),
        _ => return Err(SwimError::type_mismatch(prefix, field, WHAT)),
    }
    .ok_or_else(|| SwimError::truncated(prefix, field, WHAT))?;
    *cur = probe;
    Ok(value)
}

/// Read a 16-byte binary UUID
pub fn decode_uuid(cur: &mut Cursor<'_>, prefix: &str, field: &str) -> Result<Uuid, SwimError> {
    const WHAT: &str = "bin";
    let (len, mut probe) = read_header(cur, prefix, field, WHAT, decode::read_bin_len)?;

    if len as usize != UUID_LEN {
        return Err(SwimError::new(
            ErrorKind::OutOfRange,
            format!("{} {} is invalid", prefix, field),
        ));
    }
    let bytes = probe.take(UUID_LEN).ok_or_else(|| {
        SwimError::new(
            ErrorKind::Truncated,
            format!("{} {} is invalid", prefix, field),
        )
    })?;
    let mut raw = [0u8; UUID_LEN];
    raw.copy_from_slice(bytes);
    *cur = probe;
    Ok(Uuid::from_bytes(raw))
}

/// Read an IPv4 address stored as a host-order uint
pub fn decode_ip(cur: &mut Cursor<'_>, prefix: &str, field: &str) -> Result<Ipv4Addr, SwimError> {
    let mut probe = *cur;
    let ip = decode_uint(&mut probe, prefix, field)?;
    let ip = u32::try_from(ip).map_err(|_| {
        SwimError::out_of_range(prefix, &format!("{} is an invalid IP address", field))
    })?;
    *cur = probe;
    Ok(Ipv4Addr::from(ip))
}

/// Read a port number
pub fn decode_port(cur: &mut Cursor<'_>, prefix: &str, field: &str) -> Result<u16, SwimError> {
    let mut probe = *cur;
    let port = decode_uint(&mut probe, prefix, field)?;
    let port = u16::try_from(port)
        .map_err(|_| SwimError::out_of_range(prefix, &format!("{} is an invalid port", field)))?;
    *cur = probe;
    Ok(port)
}

/// Run an rmp length reader over the unread tail and hand back a probe past the
/// header. A wrong marker is a type mismatch; running out of bytes is truncation.
fn read_header<'a>(
    cur: &Cursor<'a>,
    prefix: &str,
    field: &str,
    what: &str,
    read: fn(&mut &'a [u8]) -> Result<u32, ValueReadError<io::Error>>,
) -> Result<(u32, Cursor<'a>), SwimError> {
    let mut rd = cur.rest();
    let len = read(&mut rd).map_err(|e| match e {
        ValueReadError::TypeMismatch(_) => SwimError::type_mismatch(prefix, field, what),
        ValueReadError::InvalidMarkerRead(_) | ValueReadError::InvalidDataRead(_) => {
            SwimError::truncated(prefix, field, what)
        }
    })?;
    let mut probe = *cur;
    probe.advance(cur.remaining() - rd.len());
    Ok((len, probe))
}

/// Read the type marker and hand back a probe positioned after it
fn next_marker<'a>(
    cur: &Cursor<'a>,
    prefix: &str,
    field: &str,
    what: &str,
) -> Result<(Marker, Cursor<'a>), SwimError> {
    let mut probe = *cur;
    let byte = probe
        .read_u8()
        .ok_or_else(|| SwimError::truncated(prefix, field, what))?;
    Ok((Marker::from_u8(byte), probe))
}
