//! Bit field extraction from MSB-first byte buffers
//!
//! RTCM3 packs every data field big-endian and without alignment, so a single
//! field may start in the middle of one byte and end in the middle of another.

use num_traits::{FromPrimitive, PrimInt};

use crate::error::BitError;

/// Widest field that can be extracted in one call
pub const MAX_BIT_WIDTH: usize = 128;

fn check_span(buf: &[u8], start: usize, len: usize) -> Result<(), BitError> {
    if len == 0 || len > MAX_BIT_WIDTH {
        return Err(BitError::InvalidWidth { len });
    }
    let available = buf.len() * 8;
    if start.checked_add(len).map_or(true, |end| end > available) {
        return Err(BitError::OutOfRange {
            start,
            len,
            available,
        });
    }
    Ok(())
}

/// Extracts `len` bits starting at bit `start`, MSB first.
pub fn get_unsigned(buf: &[u8], start: usize, len: usize) -> Result<u128, BitError> {
    check_span(buf, start, len)?;

    let end = start + len;
    let mut acc: u128 = 0;
    let mut pos = start;
    while pos < end {
        let bit_in_byte = pos % 8;
        let take = core::cmp::min(8 - bit_in_byte, end - pos);
        let shift = 8 - bit_in_byte - take;
        let bits = (buf[pos / 8] >> shift) & (((1u16 << take) - 1) as u8);
        acc = (acc << take) | u128::from(bits);
        pos += take;
    }
    Ok(acc)
}

/// Same as [get_unsigned], then sign-extends using bit `len - 1`.
pub fn get_signed(buf: &[u8], start: usize, len: usize) -> Result<i128, BitError> {
    let raw = get_unsigned(buf, start, len)?;
    let shift = (MAX_BIT_WIDTH - len) as u32;
    Ok(((raw << shift) as i128) >> shift)
}

/// Reverses the order of the low `len` bits of `value`.
///
/// Masks travel with the lowest index first, so after MSB-first extraction
/// bit `len - 1` refers to element #0. Reversal puts element #i at bit i.
pub fn reverse_bits(value: u128, len: usize) -> Result<u128, BitError> {
    if len == 0 || len > MAX_BIT_WIDTH {
        return Err(BitError::InvalidWidth { len });
    }
    let shift = (MAX_BIT_WIDTH - len) as u32;
    Ok((value << shift).reverse_bits())
}

/// Sequential reader over a frame, tracking the current bit offset.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(buf: &'a [u8], offset: usize) -> Self {
        Self { buf, offset }
    }

    /// Current position, in bits from the start of the buffer
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bits left before the end of the buffer
    pub fn remaining(&self) -> usize {
        (self.buf.len() * 8).saturating_sub(self.offset)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), BitError> {
        if len > self.remaining() {
            return Err(BitError::OutOfRange {
                start: self.offset,
                len,
                available: self.buf.len() * 8,
            });
        }
        self.offset += len;
        Ok(())
    }

    pub fn read_raw(&mut self, len: usize) -> Result<u128, BitError> {
        let value = get_unsigned(self.buf, self.offset, len)?;
        self.offset += len;
        Ok(value)
    }

    /// Reads an unsigned field into `T`, failing if it does not fit.
    pub fn read_u<T: PrimInt + FromPrimitive>(&mut self, len: usize) -> Result<T, BitError> {
        let value = get_unsigned(self.buf, self.offset, len)?;
        let value = T::from_u128(value).ok_or(BitError::Overflow { len })?;
        self.offset += len;
        Ok(value)
    }

    /// Reads a two's complement field into `T`, failing if it does not fit.
    pub fn read_i<T: PrimInt + FromPrimitive>(&mut self, len: usize) -> Result<T, BitError> {
        let value = get_signed(self.buf, self.offset, len)?;
        let value = T::from_i128(value).ok_or(BitError::Overflow { len })?;
        self.offset += len;
        Ok(value)
    }

    pub fn read_bool(&mut self) -> Result<bool, BitError> {
        Ok(self.read_raw(1)? != 0)
    }

    /// Reads a mask of `len` bits and bit-reverses it, see [reverse_bits].
    pub fn read_mask(&mut self, len: usize) -> Result<u64, BitError> {
        let raw = self.read_raw(len)?;
        let mask = reverse_bits(raw, len)?;
        u64::try_from(mask).map_err(|_| BitError::Overflow { len })
    }
}
