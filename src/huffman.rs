use tracing::trace;

use crate::{bit_cursor::BitCursor, error::InflateError};

pub const MAX_CODE_LENGTH: usize = 15;

#[derive(Debug, Clone, Copy, Default)]
struct Entry {
    symbol: u16,
    // 0 marks a slot no code resolves to
    code_length: u8,
}

/// Canonical Huffman decoding table for one alphabet.
///
/// The table has `2^max_code_length` slots indexed by the next `max_code_length` input bits as
/// they come off the stream (i.e. with the code bit-reversed), so every slot whose low
/// `code_length` bits spell a code holds that code's symbol and decoding is a single lookup.
#[derive(Debug)]
pub struct HuffmanTable {
    max_code_length: u32,
    entries: Vec<Entry>,
}

impl HuffmanTable {
    /// Builds the table from per-symbol code lengths, where 0 means the symbol is unused.
    ///
    /// Over-subscribed codes are rejected. Incomplete codes are only allowed when they hold at
    /// most a single one-bit code, which is how encoders describe a lone distance code.
    pub fn new(code_lengths: &[u8]) -> Result<Self, InflateError> {
        Self::build(code_lengths, true)
    }

    /// Like [`HuffmanTable::new`], but every code must be complete. Used for the code length
    /// alphabet of dynamic blocks.
    pub fn new_complete(code_lengths: &[u8]) -> Result<Self, InflateError> {
        Self::build(code_lengths, false)
    }

    fn build(code_lengths: &[u8], allow_lone_code: bool) -> Result<Self, InflateError> {
        let mut counts = [0u16; MAX_CODE_LENGTH + 1];
        for &length in code_lengths {
            let length = usize::from(length);
            if length > MAX_CODE_LENGTH {
                return Err(InflateError::InvalidCodeLengths("code longer than 15 bits"));
            }
            counts[length] += 1;
        }
        counts[0] = 0;

        let max_code_length = (1..=MAX_CODE_LENGTH)
            .rev()
            .find(|&length| counts[length] != 0)
            .unwrap_or(0);

        // Kraft sum: how many codes of the current length are still unassigned
        let mut left = 1i32;
        for &count in &counts[1..] {
            left = (left << 1) - i32::from(count);
            if left < 0 {
                return Err(InflateError::InvalidCodeLengths("over-subscribed code"));
            }
        }
        let used: u16 = counts.iter().sum();
        let lone_code = used == 0 || (used == 1 && max_code_length == 1);
        if left > 0 && !(allow_lone_code && lone_code) {
            return Err(InflateError::InvalidCodeLengths("incomplete code"));
        }

        let mut next_code = [0u32; MAX_CODE_LENGTH + 1];
        let mut code = 0u32;
        for length in 1..=MAX_CODE_LENGTH {
            code = (code + u32::from(counts[length - 1])) << 1;
            next_code[length] = code;
        }

        let mut entries = vec![Entry::default(); 1 << max_code_length];
        for (symbol, &length) in code_lengths.iter().enumerate() {
            if length == 0 {
                continue;
            }
            let code = next_code[usize::from(length)];
            next_code[usize::from(length)] += 1;

            let entry = Entry {
                symbol: symbol as u16,
                code_length: length,
            };
            let reversed = reverse_bits(code, u32::from(length)) as usize;
            // Every setting of the bits past the code maps to the same entry
            let stride = 1usize << length;
            for index in (reversed..entries.len()).step_by(stride) {
                entries[index] = entry;
            }
        }

        trace!(
            symbols = code_lengths.len(),
            used,
            max_code_length,
            "built huffman table"
        );
        Ok(Self {
            max_code_length: max_code_length as u32,
            entries,
        })
    }

    /// Decodes one symbol, consuming exactly the bits of its code.
    pub fn decode(&self, cursor: &mut BitCursor<'_>) -> Result<u16, InflateError> {
        let index = cursor.peek(self.max_code_length) as usize;
        let entry = self.entries[index];
        if entry.code_length == 0 {
            // Zero padding past the end of input can land on an unused slot
            if cursor.bits_remaining() < self.max_code_length as usize {
                return Err(InflateError::TruncatedStream);
            }
            return Err(InflateError::InvalidSymbol(index as u16));
        }
        cursor.discard(u32::from(entry.code_length))?;
        Ok(entry.symbol)
    }

    pub fn max_code_length(&self) -> u32 {
        self.max_code_length
    }
}

#[inline]
fn reverse_bits(code: u32, length: u32) -> u32 {
    code.reverse_bits() >> (u32::BITS - length)
}
