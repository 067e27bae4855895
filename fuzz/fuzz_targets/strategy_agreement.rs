#![no_main]

use crcv_codec::varint::decode_varint;
use crcv_codec::{encode, EncodingStrategy};
use libfuzzer_sys::fuzz_target;

// Fuzz target: historical strategies against the reference.
//
// RemainingValue must equal the reference byte for byte. FixedWidth must
// still decode to the same value. PositionalLength may differ, but must
// never produce more bytes than the reference.
fuzz_target!(|value: u32| {
    let reference = encode(value);
    assert_eq!(
        EncodingStrategy::RemainingValue.encode_text(value),
        reference.text()
    );

    let fixed = EncodingStrategy::FixedWidth.encode_bytes(value);
    assert_eq!(fixed.len(), 5);
    assert_eq!(decode_varint(&fixed).unwrap().0, value);

    let positional = EncodingStrategy::PositionalLength.encode_bytes(value);
    assert!(positional.len() <= reference.bytes().len());
});
