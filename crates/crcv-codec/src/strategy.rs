use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::varint::{MAX_VARINT_LEN, encode_varint};

/// The continuation-bit rules that have shown up across drafts of this
/// encoder, kept side by side so tests can pin down which one is right.
///
/// ```text
/// ┌──────────────────┬──────────────────────────────────────────┬───────────────┐
/// │ Strategy         │ Rule                                     │ First differs │
/// ├──────────────────┼──────────────────────────────────────────┼───────────────┤
/// │ RemainingValue   │ continue while value >> 7i > 0x7F        │ (reference)   │
/// │ FixedWidth       │ same bit rule, always 5 bytes            │ 0             │
/// │ PositionalLength │ len = max(1, bits / 7), continue on      │ 128           │
/// │                  │ every byte but the last                  │               │
/// └──────────────────┴──────────────────────────────────────────┴───────────────┘
/// ```
///
/// Only [`RemainingValue`](Self::RemainingValue) produces the minimal
/// encoding. The other two are here to be caught.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncodingStrategy {
    /// Continuation decided by the value left after shifting; minimal length.
    RemainingValue,
    /// All five 7-bit groups emitted, trailing zero groups included.
    FixedWidth,
    /// Length counted from full 7-bit groups only, continuation by position.
    PositionalLength,
}

impl EncodingStrategy {
    pub const ALL: [Self; 3] = [Self::RemainingValue, Self::FixedWidth, Self::PositionalLength];

    /// Varint bytes for `value` under this rule.
    #[must_use]
    pub fn encode_bytes(self, value: u32) -> Vec<u8> {
        match self {
            Self::RemainingValue => {
                let mut buf = [0u8; MAX_VARINT_LEN];
                let len = encode_varint(value, &mut buf);
                buf[..len].to_vec()
            }
            Self::FixedWidth => (0..MAX_VARINT_LEN)
                .map(|i| {
                    let shifted = shift_group(value, i);
                    let continuation = if shifted > 0x7F { 0x80 } else { 0x00 };
                    low_group(shifted) | continuation
                })
                .collect(),
            Self::PositionalLength => {
                let significant_bits = (u32::BITS - value.leading_zeros()) as usize;
                let len = (significant_bits / 7).max(1);
                (0..len)
                    .map(|i| {
                        let continuation = if i + 1 < len { 0x80 } else { 0x00 };
                        low_group(shift_group(value, i)) | continuation
                    })
                    .collect()
            }
        }
    }

    /// Unpadded URL-safe base64 of [`encode_bytes`](Self::encode_bytes).
    #[must_use]
    pub fn encode_text(self, value: u32) -> String {
        URL_SAFE_NO_PAD.encode(self.encode_bytes(value))
    }

    /// Stable kebab-case name, used on the command line and in reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RemainingValue => "remaining-value",
            Self::FixedWidth => "fixed-width",
            Self::PositionalLength => "positional-length",
        }
    }
}

fn shift_group(value: u32, index: usize) -> u32 {
    // index < 5, so the shift is at most 28
    value >> (7 * index)
}

#[allow(clippy::cast_possible_truncation)]
fn low_group(shifted: u32) -> u8 {
    (shifted & 0x7F) as u8
}

impl fmt::Display for EncodingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EncodingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| format!("unknown encoding strategy '{s}'"))
    }
}
