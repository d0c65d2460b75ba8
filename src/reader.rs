//! Little-endian integer extraction for BTHome field payloads.

use crate::schema::{IntType, Width};
use thiserror::Error;

/// Fewer bytes remain than the field width requires.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("truncated: needed {needed} bytes, {available} available")]
pub struct Truncated {
    pub needed: usize,
    pub available: usize,
}

/// Read an unsigned little-endian integer of `width` bytes from the start of `buf`.
///
/// Byte 0 is the least significant byte. Fails without producing a value when
/// `buf` is shorter than `width`.
pub fn read_unsigned(buf: &[u8], width: Width) -> Result<u32, Truncated> {
    let needed = width.bytes();
    let bytes = buf.get(..needed).ok_or(Truncated {
        needed,
        available: buf.len(),
    })?;
    Ok(bytes
        .iter()
        .rev()
        .fold(0u32, |acc, &byte| (acc << 8) | u32::from(byte)))
}

/// Read a two's-complement little-endian integer of `width` bytes.
pub fn read_signed(buf: &[u8], width: Width) -> Result<i32, Truncated> {
    let raw = read_unsigned(buf, width)?;
    let bits = width.bits();
    // At most 24 bits wide, so both fit in an i32.
    let value = raw as i32;
    if raw & (1 << (bits - 1)) != 0 {
        Ok(value - (1i32 << bits))
    } else {
        Ok(value)
    }
}

/// Forward-only cursor over a single borrowed payload.
///
/// Reads advance the offset only when they succeed, so a failed read leaves
/// the cursor pointing at the field that could not be read.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, pos: 0 }
    }

    /// Current offset from the start of the payload.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Take the next byte, or `None` at the end of the payload.
    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.buf.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    /// Read an integer of the given type, widened to `i32`.
    pub fn read(&mut self, int_type: IntType) -> Result<i32, Truncated> {
        let width = int_type.width();
        let value = if int_type.is_signed() {
            read_signed(self.remaining(), width)?
        } else {
            // Unsigned 24-bit values fit in i32.
            read_unsigned(self.remaining(), width)? as i32
        };
        self.pos += width.bytes();
        Ok(value)
    }
}
