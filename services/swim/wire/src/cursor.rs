//! Bounded read cursor over an inbound packet.
//!
//! The cursor never reads past the end of the slice it was created with: every
//! read checks the remaining length first and returns `None` on shortfall
//! without moving.

use bytes::Buf;

/// Read position over a borrowed byte buffer
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor at the start of `buf`
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current read offset
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Offset one past the last readable byte
    pub fn end(&self) -> usize {
        self.buf.len()
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether the cursor has reached the end
    pub fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }

    /// Unread tail of the buffer
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Skip `len` bytes already validated by the caller
    pub(crate) fn advance(&mut self, len: usize) {
        self.pos = (self.pos + len).min(self.buf.len());
    }

    pub(crate) fn read_u8(&mut self) -> Option<u8> {
        let mut rest = self.rest();
        if rest.remaining() < 1 {
            return None;
        }
        let v = rest.get_u8();
        self.pos += 1;
        Some(v)
    }

    pub(crate) fn read_u16(&mut self) -> Option<u16> {
        let mut rest = self.rest();
        if rest.remaining() < 2 {
            return None;
        }
        let v = rest.get_u16();
        self.pos += 2;
        Some(v)
    }

    pub(crate) fn read_u32(&mut self) -> Option<u32> {
        let mut rest = self.rest();
        if rest.remaining() < 4 {
            return None;
        }
        let v = rest.get_u32();
        self.pos += 4;
        Some(v)
    }

    pub(crate) fn read_u64(&mut self) -> Option<u64> {
        let mut rest = self.rest();
        if rest.remaining() < 8 {
            return None;
        }
        let v = rest.get_u64();
        self.pos += 8;
        Some(v)
    }

    /// Consume exactly `len` bytes
    pub(crate) fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.remaining() < len {
            return None;
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_are_big_endian() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let mut cur = Cursor::new(&data);
        assert_eq!(cur.read_u8(), Some(0x01));
        assert_eq!(cur.read_u16(), Some(0x0203));
        assert_eq!(cur.read_u32(), Some(0x04050607));
        assert!(cur.is_empty());
    }

    #[test]
    fn test_short_read_does_not_move() {
        let data = [0xAA, 0xBB, 0xCC];
        let mut cur = Cursor::new(&data);
        assert_eq!(cur.read_u32(), None);
        assert_eq!(cur.position(), 0);
        assert_eq!(cur.read_u64(), None);
        assert_eq!(cur.take(4), None);
        assert_eq!(cur.take(3), Some(&data[..]));
        assert_eq!(cur.position(), cur.end());
        assert_eq!(cur.read_u8(), None);
    }

    #[test]
    fn test_advance_stops_at_end() {
        let data = [0x01, 0x02, 0x03];
        let mut cur = Cursor::new(&data);
        cur.advance(2);
        assert_eq!(cur.rest(), &data[2..]);
        cur.advance(5);
        assert!(cur.is_empty());
    }
}
