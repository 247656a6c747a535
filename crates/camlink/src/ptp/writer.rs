//! Little-endian writer for PTP payloads.

use bytes::{BufMut, BytesMut};

use super::errors::DecodeError;

/// Largest string a PTP one-byte count can describe, excluding the terminator.
pub const MAX_STRING_UNITS: usize = 254;

/// Builds PTP payloads field by field.
#[derive(Debug, Default)]
pub struct PayloadWriter {
    buf: BytesMut,
}

impl PayloadWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u8(&mut self, value: u8) -> &mut Self {
        self.buf.put_u8(value);
        self
    }

    pub fn put_u16(&mut self, value: u16) -> &mut Self {
        self.buf.put_u16_le(value);
        self
    }

    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buf.put_u32_le(value);
        self
    }

    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.buf.put_u64_le(value);
        self
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.put_slice(bytes);
        self
    }

    /// Writes a PTP string. The empty string is a single zero byte.
    pub fn put_string(&mut self, value: &str) -> Result<&mut Self, DecodeError> {
        let units: Vec<u16> = value.encode_utf16().collect();
        if units.is_empty() {
            self.buf.put_u8(0);
            return Ok(self);
        }
        if units.len() > MAX_STRING_UNITS {
            return Err(DecodeError::StringTooLong { units: units.len() });
        }
        // Count includes the terminator; the bound check above keeps it within u8.
        self.buf.put_u8((units.len() + 1) as u8);
        for unit in units {
            self.buf.put_u16_le(unit);
        }
        self.buf.put_u16_le(0);
        Ok(self)
    }

    /// Writes a null-terminated UTF-16LE string with no count prefix.
    pub fn put_null_terminated_utf16(&mut self, value: &str) -> &mut Self {
        for unit in value.encode_utf16() {
            self.buf.put_u16_le(unit);
        }
        self.buf.put_u16_le(0);
        self
    }

    pub fn put_u16_array(&mut self, values: &[u16]) -> &mut Self {
        self.buf.put_u32_le(values.len() as u32);
        for value in values {
            self.buf.put_u16_le(*value);
        }
        self
    }

    pub fn put_u32_array(&mut self, values: &[u32]) -> &mut Self {
        self.buf.put_u32_le(values.len() as u32);
        for value in values {
            self.buf.put_u32_le(*value);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}
