use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::error::CodecError;
use crate::varint::{MAX_VARINT_LEN, decode_varint, encode_varint};

/// The reference encoding of one `u32`: its varint bytes plus the
/// canonical text the oracle is expected to return for it.
///
/// ```text
///   value ──▶ encode_varint ──▶ bytes (1–5) ──▶ URL-safe base64, no '=' ──▶ text
/// ```
///
/// Both halves are computed once in [`encode`] and never change. The text
/// is a lossless transform of the bytes, so [`EncodedForm::from_text`]
/// recovers them exactly.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EncodedForm {
    buf: [u8; MAX_VARINT_LEN],
    len: usize,
    text: String,
}

/// Encode `value` with the reference varint rule and render it as
/// unpadded URL-safe base64.
///
/// Pure: the same value always yields the same form.
///
/// ```rust
/// let form = crcv_codec::encode(128);
/// assert_eq!(form.bytes(), &[0x80, 0x01]);
/// assert_eq!(form.text(), "gAE");
/// ```
#[must_use]
pub fn encode(value: u32) -> EncodedForm {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_varint(value, &mut buf);
    let text = URL_SAFE_NO_PAD.encode(&buf[..len]);
    EncodedForm { buf, len, text }
}

impl EncodedForm {
    /// The varint bytes, 1 to 5 of them.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// The unpadded URL-safe base64 rendering of [`bytes`](Self::bytes).
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Lower-case hex of the bytes, for diagnostics.
    #[must_use]
    pub fn hex(&self) -> String {
        hex::encode(self.bytes())
    }

    /// Decode the bytes back into the value they carry.
    ///
    /// # Errors
    ///
    /// Never fails for a form produced by [`encode`]; the `Result` is kept
    /// so the signature matches [`decode_varint`].
    pub fn value(&self) -> Result<u32, CodecError> {
        decode_varint(self.bytes()).map(|(value, _)| value)
    }

    /// Decode oracle-style text into raw bytes.
    ///
    /// No attempt is made to validate the bytes as a varint; callers that
    /// need the value run [`decode_varint`] on the result.
    ///
    /// # Errors
    ///
    /// [`CodecError::Base64`] if `text` is not unpadded URL-safe base64.
    /// Padded text is rejected rather than silently accepted.
    pub fn from_text(text: &str) -> Result<Vec<u8>, CodecError> {
        Ok(URL_SAFE_NO_PAD.decode(text)?)
    }
}

impl fmt::Display for EncodedForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
