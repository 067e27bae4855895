#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use crcv_codec::varint::decode_varint;
use crcv_codec::{encode, EncodedForm};
use libfuzzer_sys::fuzz_target;

// Fuzz target: encode -> text -> bytes -> decode roundtrip.
//
// Each value must survive its unpadded base64 text, and the varints of a
// whole sequence, laid end to end, must decode back in order.

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    values: Vec<u32>,
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let Ok(input) = FuzzInput::arbitrary(&mut u) else {
        return;
    };

    let mut stream = Vec::new();
    for &value in &input.values {
        let form = encode(value);
        assert!(!form.text().contains('='));
        let from_text = EncodedForm::from_text(form.text()).unwrap();
        assert_eq!(from_text, form.bytes());
        assert_eq!(form.value().unwrap(), value);
        stream.extend_from_slice(&from_text);
    }

    let mut rest = stream.as_slice();
    for &value in &input.values {
        let (decoded, consumed) = decode_varint(rest).unwrap();
        assert_eq!(decoded, value);
        rest = &rest[consumed..];
    }
    assert!(rest.is_empty());
});
