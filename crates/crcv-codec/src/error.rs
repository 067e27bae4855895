/// Errors raised while reading an encoded form back.
///
/// Encoding is total over `u32`, so every variant here belongs to the
/// decode side: turning oracle output (or fuzz input) back into bytes and
/// then into a value.
///
/// ```text
///   CodecError
///   ├── VarintTooLong   ← 5 bytes consumed and the continuation bit still set
///   ├── UnexpectedEof   ← input ended mid-varint
///   ├── Overflow        ← 5th byte carries bits above bit 31
///   └── Base64          ← text is not unpadded URL-safe base64
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Varint encoding exceeded 5 bytes without terminating.
    #[error("varint too long: exceeded 5-byte limit")]
    VarintTooLong,

    /// Input ended before a complete varint could be read.
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },

    /// The final byte of a 5-byte varint set bits that do not fit in a `u32`.
    #[error("varint overflows u32: final byte was {byte:#04X}")]
    Overflow { byte: u8 },

    /// The text form could not be decoded as unpadded URL-safe base64.
    #[error("invalid base64 text: {0}")]
    Base64(#[from] base64::DecodeError),
}
