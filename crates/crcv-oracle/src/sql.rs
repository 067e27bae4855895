//! SQL that makes ClickHouse compute the varint text of a `UInt32`.
//!
//! Both correct formulations map the value to its five 7-bit-shifted
//! views, keep view `i` only when `i = 0` or the view is non-zero, and set
//! the continuation bit on a kept byte when the view is above `0x7F`. That
//! is the minimal encoding, byte for byte.
//!
//! The fixed-width and positional-length queries are kept broken on
//! purpose so a live run can show the harness catching them.

use std::fmt;
use std::str::FromStr;

/// Name of the user-defined function created by [`CREATE_FUNCTION_SQL`].
pub const FUNCTION_NAME: &str = "varintEncode";

/// `CREATE OR REPLACE` keeps installation idempotent against a
/// long-lived server.
pub const CREATE_FUNCTION_SQL: &str = "\
CREATE OR REPLACE FUNCTION varintEncode AS (crc) -> arrayStringConcat(
    arrayMap(
        shifted -> char(bitOr(bitAnd(shifted, 0x7F), if(shifted > 0x7F, 0x80, 0x00))),
        arrayFilter(
            (shifted, i) -> i = 0 OR shifted > 0,
            arrayMap(i -> bitShiftRight(crc, 7 * i), range(0, 5)),
            range(0, 5))))";

const INLINE_QUERY: &str = "\
WITH toUInt32({value}) AS crc
SELECT base64URLEncode(arrayStringConcat(
    arrayMap(
        shifted -> char(bitOr(bitAnd(shifted, 0x7F), if(shifted > 0x7F, 0x80, 0x00))),
        arrayFilter(
            (shifted, i) -> i = 0 OR shifted > 0,
            arrayMap(i -> bitShiftRight(crc, 7 * i), range(0, 5)),
            range(0, 5)))))
FORMAT TabSeparatedRaw";

// All five groups, no filter: small values come back zero-padded.
const FIXED_WIDTH_QUERY: &str = "\
WITH toUInt32({value}) AS crc
SELECT base64URLEncode(arrayStringConcat(
    arrayMap(
        shifted -> char(bitOr(bitAnd(shifted, 0x7F), if(shifted > 0x7F, 0x80, 0x00))),
        arrayMap(i -> bitShiftRight(crc, 7 * i), range(0, 5)))))
FORMAT TabSeparatedRaw";

// Byte count from full 7-bit groups only; continuation by position.
const POSITIONAL_LENGTH_QUERY: &str = "\
WITH toUInt32({value}) AS crc,
     arrayCount(i -> bitShiftRight(crc, i) > 0, range(0, 32)) AS bits,
     greatest(1, intDiv(bits, 7)) AS len
SELECT base64URLEncode(arrayStringConcat(
    arrayMap(
        i -> char(bitOr(bitAnd(bitShiftRight(crc, 7 * i), 0x7F), if(i + 1 < len, 0x80, 0x00))),
        range(0, len))))
FORMAT TabSeparatedRaw";

const UDF_QUERY: &str = "SELECT base64URLEncode(varintEncode(toUInt32({value}))) FORMAT TabSeparatedRaw";

/// Liveness probe; authenticated, so bad credentials fail here.
pub const PROBE_SQL: &str = "SELECT 1 FORMAT TabSeparatedRaw";

/// Which SQL the oracle evaluates.
///
/// ```text
/// ┌───────────────────┬──────────────────┬────────────────────────────────┐
/// │ Formulation       │ Needs install    │ Notes                          │
/// ├───────────────────┼──────────────────┼────────────────────────────────┤
/// │ Udf               │ yes              │ calls varintEncode(...)        │
/// │ Inline            │ no               │ self-contained WITH query      │
/// │ FixedWidth        │ no               │ known-broken, diverges at 0    │
/// │ PositionalLength  │ no               │ known-broken, diverges at 128  │
/// └───────────────────┴──────────────────┴────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Formulation {
    Udf,
    #[default]
    Inline,
    FixedWidth,
    PositionalLength,
}

impl Formulation {
    pub const ALL: [Self; 4] = [
        Self::Udf,
        Self::Inline,
        Self::FixedWidth,
        Self::PositionalLength,
    ];

    /// `true` when [`CREATE_FUNCTION_SQL`] must run before querying.
    #[must_use]
    pub const fn requires_install(self) -> bool {
        matches!(self, Self::Udf)
    }

    /// The single statement that evaluates the encoding of `value`.
    ///
    /// The value is an integer literal, so no escaping is involved.
    #[must_use]
    pub fn query(self, value: u32) -> String {
        let template = match self {
            Self::Udf => UDF_QUERY,
            Self::Inline => INLINE_QUERY,
            Self::FixedWidth => FIXED_WIDTH_QUERY,
            Self::PositionalLength => POSITIONAL_LENGTH_QUERY,
        };
        template.replace("{value}", &value.to_string())
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Udf => "udf",
            Self::Inline => "inline",
            Self::FixedWidth => "fixed-width",
            Self::PositionalLength => "positional-length",
        }
    }
}

impl fmt::Display for Formulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Formulation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|formulation| formulation.name() == s)
            .ok_or_else(|| format!("unknown formulation '{s}', expected udf, inline, fixed-width or positional-length"))
    }
}
