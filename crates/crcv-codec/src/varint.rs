use crate::error::CodecError;

/// Maximum number of bytes a u32 varint can occupy.
/// ceil(32 / 7) = 5 bytes.
pub const MAX_VARINT_LEN: usize = 5;

/// Encode a `u32` value as an unsigned LEB128 varint into the provided buffer.
///
/// The continuation bit of each byte is decided by what is left of the
/// value after the byte's 7 bits are shifted out, never by the byte's
/// position. Multiples of 128 therefore still carry a continuation bit on
/// the low zero group, and no trailing zero groups are emitted.
///
/// # Returns
///
/// The number of bytes written (1–5).
///
/// # Wire format examples
///
/// | Value        | Encoded bytes                    | Length |
/// |--------------|----------------------------------|--------|
/// | 0            | `[0x00]`                         | 1      |
/// | 1            | `[0x01]`                         | 1      |
/// | 127          | `[0x7F]`                         | 1      |
/// | 128          | `[0x80, 0x01]`                   | 2      |
/// | 300          | `[0xAC, 0x02]`                   | 2      |
/// | 16383        | `[0xFF, 0x7F]`                   | 2      |
/// | 16384        | `[0x80, 0x80, 0x01]`             | 3      |
/// | `u32::MAX`   | `[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]` | 5      |
pub fn encode_varint(mut value: u32, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut i = 0;
    loop {
        // Take the lowest 7 bits
        #[allow(clippy::cast_possible_truncation)]
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        if value > 0 {
            // More bytes to come: set the continuation bit
            byte |= 0x80;
        }

        buf[i] = byte;
        i += 1;

        if value == 0 {
            break;
        }
    }
    i
}

/// Number of bytes [`encode_varint`] writes for `value`.
///
/// One byte per started 7-bit group, with zero counting as one group.
#[must_use]
pub fn encoded_len(value: u32) -> usize {
    let significant_bits = (u32::BITS - value.leading_zeros()) as usize;
    significant_bits.div_ceil(7).max(1)
}

/// Decode an unsigned LEB128 varint from the provided byte slice.
///
/// # Returns
///
/// `(decoded_value, bytes_consumed)` on success.
///
/// # Errors
///
/// - [`CodecError::VarintTooLong`] if the 5th byte still has its
///   continuation bit set.
/// - [`CodecError::Overflow`] if the 5th byte carries bits above bit 31.
/// - [`CodecError::UnexpectedEof`] if the slice ends mid-varint.
pub fn decode_varint(buf: &[u8]) -> Result<(u32, usize), CodecError> {
    let mut result: u32 = 0;
    let mut shift: u32 = 0;

    for (i, &byte) in buf.iter().enumerate() {
        if i == MAX_VARINT_LEN - 1 {
            if byte & 0x80 != 0 {
                return Err(CodecError::VarintTooLong);
            }
            // Only the low 4 bits of the last group fit in 32 bits
            if byte > 0x0F {
                return Err(CodecError::Overflow { byte });
            }
        }

        // Extract the 7 data bits and shift them into position
        let data = u32::from(byte & 0x7F);
        result |= data << shift;
        shift += 7;

        // If MSB is clear, this is the last byte
        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    // We ran out of input bytes while MSB was still set
    Err(CodecError::UnexpectedEof { offset: buf.len() })
}
