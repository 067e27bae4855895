#![no_main]

use crcv_codec::varint::{decode_varint, encode_varint, MAX_VARINT_LEN};
use libfuzzer_sys::fuzz_target;

// Fuzz target: decode_varint on arbitrary bytes.
//
// Never panics, never consumes more than 5 bytes, and whatever it accepts
// re-encodes to a prefix no longer than what it consumed.
fuzz_target!(|data: &[u8]| {
    if let Ok((value, consumed)) = decode_varint(data) {
        assert!((1..=MAX_VARINT_LEN).contains(&consumed));
        let mut buf = [0u8; MAX_VARINT_LEN];
        assert!(encode_varint(value, &mut buf) <= consumed);
    }
});
