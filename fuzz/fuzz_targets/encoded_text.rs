#![no_main]

use crcv_codec::EncodedForm;
use libfuzzer_sys::fuzz_target;

// Fuzz target: oracle text parsing.
//
// Oracle answers are untrusted strings; decoding them must fail cleanly.
fuzz_target!(|text: &str| {
    let _ = EncodedForm::from_text(text);
});
