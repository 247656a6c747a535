//! Bounds-checked little-endian reader over a PTP payload.

use bytes::Buf;

use super::errors::DecodeError;

/// Cursor over a PTP dataset or packet payload.
///
/// Every read checks the remaining length first, so malformed input produces a
/// [`DecodeError`] instead of a panic.
#[derive(Debug)]
pub struct PayloadReader<'a> {
    buf: &'a [u8],
}

impl<'a> PayloadReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Returns the unread bytes without consuming them.
    pub fn rest(&self) -> &'a [u8] {
        self.buf
    }

    fn ensure(&self, needed: usize, context: &'static str) -> Result<(), DecodeError> {
        if self.buf.remaining() < needed {
            return Err(DecodeError::UnexpectedEnd {
                context,
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        self.ensure(1, "u8")?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        self.ensure(2, "u16")?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        self.ensure(4, "u32")?;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        self.ensure(8, "u64")?;
        Ok(self.buf.get_u64_le())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        self.ensure(len, "bytes")?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    /// Reads a PTP string: a one-byte character count that includes the null
    /// terminator, followed by that many UTF-16LE code units.
    ///
    /// A count of zero is the empty string with nothing after it.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let count = usize::from(self.read_u8()?);
        if count == 0 {
            return Ok(String::new());
        }
        self.ensure(count * 2, "string")?;
        let units: Vec<u16> = (0..count - 1).map(|_| self.buf.get_u16_le()).collect();
        // Terminator. Some devices put garbage here; it's consumed either way.
        self.buf.advance(2);
        Ok(String::from_utf16_lossy(&units))
    }

    /// Reads a PTP array of u16 elements (u32 count, then the elements).
    pub fn read_u16_array(&mut self) -> Result<Vec<u16>, DecodeError> {
        let count = self.read_u32()? as usize;
        self.ensure(count.saturating_mul(2), "u16 array")?;
        Ok((0..count).map(|_| self.buf.get_u16_le()).collect())
    }

    /// Reads a PTP array of u32 elements, as used for storage IDs and object handles.
    pub fn read_u32_array(&mut self) -> Result<Vec<u32>, DecodeError> {
        let count = self.read_u32()? as usize;
        self.ensure(count.saturating_mul(4), "u32 array")?;
        Ok((0..count).map(|_| self.buf.get_u32_le()).collect())
    }

    /// Reads a null-terminated UTF-16LE string with no length prefix, as found in
    /// the PTP/IP init packets. Consumes the terminator if present.
    pub fn read_null_terminated_utf16(&mut self) -> String {
        let mut units = Vec::new();
        while self.buf.remaining() >= 2 {
            let unit = self.buf.get_u16_le();
            if unit == 0 {
                break;
            }
            units.push(unit);
        }
        String::from_utf16_lossy(&units)
    }
}
