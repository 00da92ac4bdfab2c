//! DEFLATE block decoding (RFC 1951), with an optional zlib header in front (RFC 1950).

use tracing::debug;

use crate::{bit_cursor::BitCursor, error::InflateError, huffman::HuffmanTable};

const END_OF_BLOCK: u16 = 256;
const MAX_LITERAL_LENGTH_CODES: usize = 286;
const MAX_DISTANCE_CODES: usize = 30;

/// Order in which the code length code lengths are sent in a dynamic block header
const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// (base length, extra bits) for length symbols 257..=285
#[rustfmt::skip]
const LENGTHS: [(u16, u8); 29] = [
    (3, 0), (4, 0), (5, 0), (6, 0), (7, 0), (8, 0), (9, 0), (10, 0), (11, 1), (13, 1), (15, 1),
    (17, 1), (19, 2), (23, 2), (27, 2), (31, 2), (35, 3), (43, 3), (51, 3), (59, 3), (67, 4),
    (83, 4), (99, 4), (115, 4), (131, 5), (163, 5), (195, 5), (227, 5), (258, 0),
];

/// (base distance, extra bits) for distance symbols 0..=29
#[rustfmt::skip]
const DISTANCES: [(u16, u8); 30] = [
    (1, 0), (2, 0), (3, 0), (4, 0), (5, 1), (7, 1), (9, 2), (13, 2), (17, 3), (25, 3), (33, 4),
    (49, 4), (65, 5), (97, 5), (129, 6), (193, 6), (257, 7), (385, 7), (513, 8), (769, 8),
    (1025, 9), (1537, 9), (2049, 10), (3073, 10), (4097, 11), (6145, 11), (8193, 12),
    (12289, 12), (16385, 13), (24577, 13),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// 2-byte zlib header followed by the DEFLATE blocks. The Adler-32 trailer is left alone.
    Zlib,
    /// Bare DEFLATE blocks
    Raw,
}

/// Outcome of a successful [`inflate`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inflated {
    /// Bytes written to the output buffer
    pub written: usize,
    /// Input bytes taken up by the header and the blocks
    pub consumed: usize,
}

#[derive(Debug)]
enum BlockType {
    Stored,
    FixedHuffman,
    DynamicHuffman,
}

impl TryFrom<u32> for BlockType {
    type Error = InflateError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            0 => Ok(Self::Stored),
            1 => Ok(Self::FixedHuffman),
            2 => Ok(Self::DynamicHuffman),
            _ => Err(InflateError::InvalidBlockType),
        }
    }
}

/// Decompresses a zlib-wrapped stream into `output`, returning how many bytes were written.
pub fn decompress(input: &[u8], output: &mut [u8]) -> Result<usize, InflateError> {
    inflate(input, output, Format::Zlib).map(|inflated| inflated.written)
}

/// Decompresses a bare DEFLATE stream into `output`, returning how many bytes were written.
pub fn decompress_raw(input: &[u8], output: &mut [u8]) -> Result<usize, InflateError> {
    inflate(input, output, Format::Raw).map(|inflated| inflated.written)
}

/// Runs the whole block stream in `input` to completion, writing into `output`.
///
/// `output` must be big enough for the entire result: nothing is allocated here, and running out
/// of room is an error. On error the contents of `output` are unspecified.
pub fn inflate(input: &[u8], output: &mut [u8], format: Format) -> Result<Inflated, InflateError> {
    let mut cursor = BitCursor::new(input);
    if format == Format::Zlib {
        check_zlib_header(&mut cursor)?;
    }
    let mut output = Output::new(output);
    let mut fixed_tables: Option<BlockTables> = None;

    loop {
        let is_final = cursor.take(1)? == 1;
        let block_type = BlockType::try_from(cursor.take(2)?)?;
        debug!(?block_type, is_final, position = output.position, "block header");

        match block_type {
            BlockType::Stored => inflate_stored(&mut cursor, &mut output)?,
            BlockType::FixedHuffman => {
                let tables = match fixed_tables.take() {
                    Some(tables) => tables,
                    None => BlockTables::fixed()?,
                };
                inflate_symbols(&mut cursor, &mut output, &tables)?;
                fixed_tables = Some(tables);
            }
            BlockType::DynamicHuffman => {
                let tables = BlockTables::read_dynamic(&mut cursor)?;
                inflate_symbols(&mut cursor, &mut output, &tables)?;
            }
        }

        if is_final {
            break;
        }
    }

    Ok(Inflated {
        written: output.position,
        consumed: cursor.bytes_consumed(),
    })
}

fn check_zlib_header(cursor: &mut BitCursor<'_>) -> Result<(), InflateError> {
    let header = cursor.read_raw_bytes(2)?;
    let (cmf, flg) = (header[0], header[1]);
    if u16::from_be_bytes([cmf, flg]) % 31 != 0 {
        return Err(InflateError::InvalidHeader("FCHECK does not match CMF and FLG"));
    }
    if cmf & 0xf != 8 {
        return Err(InflateError::InvalidHeader("compression method is not DEFLATE"));
    }
    if cmf >> 4 > 7 {
        return Err(InflateError::InvalidHeader("window size over 32K"));
    }
    if flg & 0x20 != 0 {
        return Err(InflateError::InvalidHeader("preset dictionaries are not supported"));
    }
    Ok(())
}

fn inflate_stored(cursor: &mut BitCursor<'_>, output: &mut Output<'_>) -> Result<(), InflateError> {
    cursor.align_to_byte();
    let len = cursor.take(16)? as u16;
    let nlen = cursor.take(16)? as u16;
    if len != !nlen {
        return Err(InflateError::LengthMismatch { len, nlen });
    }
    debug!(len, "stored block");
    output.extend_from_slice(cursor.read_raw_bytes(usize::from(len))?)
}

/// Literal/length and distance tables for one Huffman block
struct BlockTables {
    literal_length: HuffmanTable,
    distance: HuffmanTable,
}

impl BlockTables {
    fn fixed() -> Result<Self, InflateError> {
        let mut literal_length = [8u8; 288];
        literal_length[144..256].fill(9);
        literal_length[256..280].fill(7);
        Ok(Self {
            literal_length: HuffmanTable::new(&literal_length)?,
            distance: HuffmanTable::new(&[5; 32])?,
        })
    }

    fn read_dynamic(cursor: &mut BitCursor<'_>) -> Result<Self, InflateError> {
        let hlit = cursor.take(5)? as usize + 257;
        let hdist = cursor.take(5)? as usize + 1;
        let hclen = cursor.take(4)? as usize + 4;
        if hlit > MAX_LITERAL_LENGTH_CODES || hdist > MAX_DISTANCE_CODES {
            return Err(InflateError::InvalidCodeLengths("too many length or distance codes"));
        }

        let mut code_length_lengths = [0u8; CODE_LENGTH_ORDER.len()];
        for &symbol in &CODE_LENGTH_ORDER[..hclen] {
            code_length_lengths[symbol] = cursor.take(3)? as u8;
        }
        let code_lengths_table = HuffmanTable::new_complete(&code_length_lengths)?;

        let total = hlit + hdist;
        let mut lengths = [0u8; MAX_LITERAL_LENGTH_CODES + MAX_DISTANCE_CODES];
        let mut filled = 0;
        while filled < total {
            let (length, repeat) = match code_lengths_table.decode(cursor)? {
                symbol @ 0..=15 => (symbol as u8, 1),
                16 => {
                    let Some(previous) = filled.checked_sub(1).map(|last| lengths[last]) else {
                        return Err(InflateError::InvalidCodeLengths(
                            "repeat with no previous length",
                        ));
                    };
                    (previous, cursor.take(2)? as usize + 3)
                }
                17 => (0, cursor.take(3)? as usize + 3),
                18 => (0, cursor.take(7)? as usize + 11),
                symbol => return Err(InflateError::InvalidSymbol(symbol)),
            };
            if filled + repeat > total {
                return Err(InflateError::InvalidCodeLengths(
                    "code lengths overrun the alphabets",
                ));
            }
            lengths[filled..filled + repeat].fill(length);
            filled += repeat;
        }

        if lengths[usize::from(END_OF_BLOCK)] == 0 {
            return Err(InflateError::InvalidCodeLengths("missing end-of-block code"));
        }
        let tables = Self {
            literal_length: HuffmanTable::new(&lengths[..hlit])?,
            distance: HuffmanTable::new(&lengths[hlit..total])?,
        };
        debug!(
            hlit,
            hdist,
            hclen,
            literal_length_bits = tables.literal_length.max_code_length(),
            distance_bits = tables.distance.max_code_length(),
            "dynamic block tables"
        );
        Ok(tables)
    }
}

fn inflate_symbols(
    cursor: &mut BitCursor<'_>,
    output: &mut Output<'_>,
    tables: &BlockTables,
) -> Result<(), InflateError> {
    loop {
        match tables.literal_length.decode(cursor)? {
            literal @ 0..=255 => output.push(literal as u8)?,
            END_OF_BLOCK => return Ok(()),
            symbol @ 257..=285 => {
                let (base, extra_bits) = LENGTHS[usize::from(symbol - 257)];
                let length = usize::from(base) + cursor.take(u32::from(extra_bits))? as usize;

                let symbol = tables.distance.decode(cursor)?;
                let &(base, extra_bits) = DISTANCES
                    .get(usize::from(symbol))
                    .ok_or(InflateError::InvalidSymbol(symbol))?;
                let distance = usize::from(base) + cursor.take(u32::from(extra_bits))? as usize;

                output.copy_back_reference(length, distance)?;
            }
            symbol => return Err(InflateError::InvalidSymbol(symbol)),
        }
    }
}

/// Caller-supplied output buffer, written strictly front to back.
struct Output<'a> {
    bytes: &'a mut [u8],
    position: usize,
}

impl<'a> Output<'a> {
    fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    fn exhausted(&self) -> InflateError {
        InflateError::OutputBufferExhausted {
            capacity: self.bytes.len(),
        }
    }

    fn push(&mut self, byte: u8) -> Result<(), InflateError> {
        if self.position == self.bytes.len() {
            return Err(self.exhausted());
        }
        self.bytes[self.position] = byte;
        self.position += 1;
        Ok(())
    }

    fn extend_from_slice(&mut self, bytes: &[u8]) -> Result<(), InflateError> {
        let end = self.position + bytes.len();
        if end > self.bytes.len() {
            return Err(self.exhausted());
        }
        self.bytes[self.position..end].copy_from_slice(bytes);
        self.position = end;
        Ok(())
    }

    /// Copies `length` bytes starting `distance` bytes back. The regions may overlap, in which
    /// case bytes written by this copy are read back by it, so it goes one byte at a time.
    fn copy_back_reference(&mut self, length: usize, distance: usize) -> Result<(), InflateError> {
        if distance == 0 || distance > self.position {
            return Err(InflateError::InvalidBackReference {
                distance,
                available: self.position,
            });
        }
        if self.position + length > self.bytes.len() {
            return Err(self.exhausted());
        }
        let start = self.position - distance;
        for i in 0..length {
            self.bytes[self.position + i] = self.bytes[start + i];
        }
        self.position += length;
        Ok(())
    }
}
