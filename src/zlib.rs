use std::fmt::Display;

use anyhow::{bail, ensure, Context};
use tracing::{debug, warn};

use crate::{
    adler32::adler32,
    error::InflateError,
    inflate::{self, Format, Inflated},
};

const COMPRESSION_LEVEL_MASK: u8 = 0x3;
const DEFLATE_IDENTIFIER: u8 = 0x8;
const PRESET_DICTIONARY_FLAG: u8 = 1 << 5;
const CHECKSUM_SIZE: usize = 4;
const MIN_INITIAL_CAPACITY: usize = 64;

/// FLEVEL: what the compressor says it was aiming for. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionLevel {
    Fastest,
    Fast,
    Default,
    Maximum,
}

impl From<u8> for CompressionLevel {
    fn from(byte: u8) -> Self {
        match byte & COMPRESSION_LEVEL_MASK {
            0 => Self::Fastest,
            1 => Self::Fast,
            2 => Self::Default,
            3 => Self::Maximum,
            _ => unreachable!(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    #[allow(clippy::upper_case_acronyms)]
    DEFLATE(usize), // window size
}

impl Display for CompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self::DEFLATE(window_size) = self;
        write!(f, "DEFLATE with a window size of {window_size} bytes")
    }
}

impl TryFrom<u8> for CompressionMethod {
    type Error = anyhow::Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte & 0xf {
            DEFLATE_IDENTIFIER => {
                let window_bits = u32::from(byte >> 4);
                ensure!(window_bits <= 7, "window size too large: CINFO={window_bits}");
                Ok(Self::DEFLATE(2usize.pow(8 + window_bits)))
            }
            _ => bail!("invalid compression method: {byte}"),
        }
    }
}

/// Knobs for turning a stream into an owned buffer.
#[derive(Debug, Clone)]
pub struct InflateOptions {
    /// First guess at the output size; defaults to a multiple of the input size
    pub initial_capacity: Option<usize>,
    /// The output buffer is never grown past this
    pub max_output: usize,
    /// Check the Adler-32 trailer against the inflated bytes
    pub verify_checksum: bool,
}

impl Default for InflateOptions {
    fn default() -> Self {
        Self {
            initial_capacity: None,
            max_output: 1 << 30,
            verify_checksum: true,
        }
    }
}

// RFC 1950
#[derive(Debug)]
pub struct Stream<'a> {
    compression_method: CompressionMethod,
    preset_dictionary: Option<[u8; 4]>,
    flags_check_bits: u8,
    compression_level: CompressionLevel,
    bytes: &'a [u8],
}

impl Display for Stream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Compression method: {}", self.compression_method)?;
        writeln!(
            f,
            "Preset dictionary (FDICT): {}",
            self.preset_dictionary
                .map(|dict| { format!("{:#x}", u32::from_be_bytes(dict)) })
                .unwrap_or("not present".to_string())
        )?;
        writeln!(f, "Compression level: {:?}", self.compression_level)?;
        writeln!(f, "Check bits: 0b{:05b}", self.flags_check_bits)?;
        writeln!(f, "Stream length: {}", self.bytes.len())
    }
}

impl<'a> TryFrom<&'a [u8]> for Stream<'a> {
    type Error = anyhow::Error;

    fn try_from(bytes: &'a [u8]) -> Result<Self, Self::Error> {
        // At least enough bytes for CMF and FLG
        ensure!(bytes.len() >= 2, "not enough bytes for a zlib header");
        // FCHECK validation
        ensure!(
            u16::from_be_bytes([bytes[0], bytes[1]]) % 31 == 0,
            "corrupt stream: invalid CMF, FLG, or both"
        );
        let compression_method: CompressionMethod =
            bytes[0].try_into().context("decoding compression method")?;
        let flags_check_bits = bytes[1] & 0x1f;
        let compression_level: CompressionLevel = (bytes[1] >> 6).into();
        let preset_dictionary = if bytes[1] & PRESET_DICTIONARY_FLAG != 0 {
            // DICTID follows the header
            Some(
                bytes
                    .get(2..6)
                    .context("not enough bytes for the preset dictionary id")?
                    .try_into()?,
            )
        } else {
            None
        };
        Ok(Self {
            compression_method,
            preset_dictionary,
            flags_check_bits,
            compression_level,
            bytes,
        })
    }
}

/// An inflated stream and where it ended in the input.
#[derive(Debug)]
pub struct Decoded {
    bytes: Vec<u8>,
    serialization_len: usize,
}

impl Decoded {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// How many input bytes the compressed stream took up, trailer included when present
    pub fn serialization_len(&self) -> usize {
        self.serialization_len
    }
}

impl Stream<'_> {
    pub fn compression_method(&self) -> CompressionMethod {
        self.compression_method
    }

    pub fn compression_level(&self) -> CompressionLevel {
        self.compression_level
    }

    pub fn preset_dictionary(&self) -> Option<[u8; 4]> {
        self.preset_dictionary
    }

    pub fn inflate(&self, options: &InflateOptions) -> anyhow::Result<Decoded> {
        ensure!(
            self.preset_dictionary.is_none(),
            "streams compressed with a preset dictionary are not supported"
        );
        let (bytes, inflated) =
            inflate_growing(self.bytes, Format::Zlib, options).context("inflating zlib stream")?;

        let trailer = self
            .bytes
            .get(inflated.consumed..inflated.consumed + CHECKSUM_SIZE);
        if options.verify_checksum {
            let trailer = trailer.context("missing ADLER-32 trailer")?;
            let expected = u32::from_be_bytes(trailer.try_into()?);
            let actual = adler32(&bytes);
            ensure!(
                actual == expected,
                "checksum mismatch: trailer says {expected:#010x}, data hashes to {actual:#010x}"
            );
        } else {
            warn!("skipping ADLER-32 verification");
        }

        Ok(Decoded {
            bytes,
            serialization_len: inflated.consumed + trailer.map_or(0, <[u8]>::len),
        })
    }
}

/// Inflates a bare DEFLATE stream into an owned buffer.
pub fn inflate_raw_to_vec(bytes: &[u8], options: &InflateOptions) -> anyhow::Result<Decoded> {
    let (bytes, inflated) =
        inflate_growing(bytes, Format::Raw, options).context("inflating DEFLATE stream")?;
    Ok(Decoded {
        bytes,
        serialization_len: inflated.consumed,
    })
}

/// Runs the decompressor over a buffer that doubles (up to `max_output`) every time it turns out
/// to be too small. Each attempt starts from scratch.
fn inflate_growing(
    input: &[u8],
    format: Format,
    options: &InflateOptions,
) -> anyhow::Result<(Vec<u8>, Inflated)> {
    let mut capacity = options
        .initial_capacity
        .unwrap_or_else(|| input.len().saturating_mul(4).max(MIN_INITIAL_CAPACITY))
        .min(options.max_output);
    loop {
        let mut output = vec![0; capacity];
        match inflate::inflate(input, &mut output, format) {
            Ok(inflated) => {
                output.truncate(inflated.written);
                return Ok((output, inflated));
            }
            Err(InflateError::OutputBufferExhausted { .. }) if capacity < options.max_output => {
                capacity = capacity.saturating_mul(2).clamp(1, options.max_output);
                debug!(capacity, "output buffer too small, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
}
