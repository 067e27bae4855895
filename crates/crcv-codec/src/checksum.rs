use crate::encoded::{EncodedForm, encode};

/// CRC-32/ISO-HDLC (the "IEEE" CRC: reflected polynomial `0xEDB88320`,
/// init and xorout `0xFFFFFFFF`) of `data`.
///
/// Total over all inputs; the empty slice yields `0`.
#[must_use]
pub fn checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Checksum `data` and varint-encode the result.
///
/// This is what a log pipeline stores next to a line: the CRC as a number
/// and its compact text form.
#[must_use]
pub fn checksum_and_encode(data: &[u8]) -> (u32, EncodedForm) {
    let crc = checksum(data);
    (crc, encode(crc))
}
