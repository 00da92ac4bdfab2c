/// Everything that can go wrong while inflating a single stream.
///
/// None of these are recoverable: once one is returned the contents of the output buffer are
/// undefined and the stream should be treated as corrupt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InflateError {
    /// The zlib CMF/FLG pair failed the FCHECK test or asked for something we don't support
    /// (a method other than DEFLATE, a window over 32K, a preset dictionary).
    #[error("invalid zlib header: {0}")]
    InvalidHeader(&'static str),

    /// The input ran out before the final block was finished.
    #[error("truncated stream: input ended before the final block")]
    TruncatedStream,

    /// Stored block whose LEN is not the one's complement of NLEN.
    #[error("stored block length mismatch: LEN={len:#06x}, NLEN={nlen:#06x}")]
    LengthMismatch { len: u16, nlen: u16 },

    /// Reserved block type 3.
    #[error("invalid block type")]
    InvalidBlockType,

    /// A distance pointing before the start of the output.
    #[error("invalid back-reference: distance {distance} with only {available} bytes produced")]
    InvalidBackReference { distance: usize, available: usize },

    /// The caller's buffer is full but the block stream isn't.
    #[error("output buffer exhausted (capacity {capacity} bytes)")]
    OutputBufferExhausted { capacity: usize },

    /// A set of code lengths that doesn't describe a usable prefix code.
    #[error("invalid code lengths: {0}")]
    InvalidCodeLengths(&'static str),

    /// A code with no symbol behind it, or a symbol outside its alphabet.
    #[error("invalid symbol: {0}")]
    InvalidSymbol(u16),
}
