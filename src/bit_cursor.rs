use crate::error::InflateError;

/// Least-significant-bit-first reader over a borrowed byte buffer.
///
/// Bits are pulled into the accumulator one byte at a time and only as far as a `peek` needs
/// them, so whatever sits in the accumulator is always the contiguous run of input bytes just
/// behind `offset`. The accumulator never holds more than 32 bits, which is why a single peek
/// is capped at 25: with 24 bits or fewer buffered one more byte always fits.
pub struct BitCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
    bit_buffer: u32,
    bit_count: u32,
}

impl<'a> BitCursor<'a> {
    pub const MAX_PEEK_BITS: u32 = 25;

    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            bit_buffer: 0,
            bit_count: 0,
        }
    }

    /// Returns the next `count` bits without consuming them.
    ///
    /// Past the end of the input the missing bits read as zero; consuming them is what fails.
    pub fn peek(&mut self, count: u32) -> u32 {
        debug_assert!(count <= Self::MAX_PEEK_BITS);
        while self.bit_count < count {
            let Some(&byte) = self.bytes.get(self.offset) else {
                break;
            };
            self.bit_buffer |= u32::from(byte) << self.bit_count;
            self.bit_count += 8;
            self.offset += 1;
        }
        self.bit_buffer & ((1u32 << count) - 1)
    }

    pub fn discard(&mut self, count: u32) -> Result<(), InflateError> {
        if count > self.bit_count {
            return Err(InflateError::TruncatedStream);
        }
        self.bit_buffer = self.bit_buffer.checked_shr(count).unwrap_or(0);
        self.bit_count -= count;
        Ok(())
    }

    pub fn take(&mut self, count: u32) -> Result<u32, InflateError> {
        let bits = self.peek(count);
        self.discard(count)?;
        Ok(bits)
    }

    pub fn align_to_byte(&mut self) {
        let partial = self.bit_count % 8;
        self.bit_buffer >>= partial;
        self.bit_count -= partial;
    }

    /// Hands out the next `n` whole bytes, bypassing the accumulator. Must be byte aligned.
    pub fn read_raw_bytes(&mut self, n: usize) -> Result<&'a [u8], InflateError> {
        debug_assert_eq!(self.bit_count % 8, 0, "raw read on a non byte-aligned cursor");
        // Buffered whole bytes are still the input bytes right behind `offset`: give them back
        self.offset -= (self.bit_count / 8) as usize;
        self.bit_buffer = 0;
        self.bit_count = 0;
        let bytes = self
            .bytes
            .get(self.offset..)
            .and_then(|rest| rest.get(..n))
            .ok_or(InflateError::TruncatedStream)?;
        self.offset += n;
        Ok(bytes)
    }

    /// Bits that can still be consumed, buffered or not.
    pub fn bits_remaining(&self) -> usize {
        self.bit_count as usize + (self.bytes.len() - self.offset) * 8
    }

    /// Input bytes used so far; a partially consumed byte counts as used.
    pub fn bytes_consumed(&self) -> usize {
        self.offset - (self.bit_count / 8) as usize
    }
}
