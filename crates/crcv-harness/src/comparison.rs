use std::fmt;

use crcv_codec::varint::decode_varint;
use crcv_codec::{EncodedForm, encode};

use crate::corpus::{Candidate, Origin};

/// Reference and oracle text for one value.
///
/// The comparison is on raw bytes of the two strings: no trimming, no
/// padding or case normalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComparisonResult {
    pub value: u32,
    pub reference: String,
    pub oracle: String,
    pub matched: bool,
}

impl ComparisonResult {
    /// Encode `value` locally and compare it with what the oracle said.
    #[must_use]
    pub fn compare(value: u32, oracle: String) -> Self {
        let reference = encode(value).text().to_string();
        let matched = reference.as_bytes() == oracle.as_bytes();
        Self {
            value,
            reference,
            oracle,
            matched,
        }
    }
}

/// A value on which the reference encoder and the oracle disagree.
///
/// Carries everything needed to re-query the oracle by hand and to see
/// where the bytes part ways.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Divergence {
    pub sequence: u64,
    pub worker: usize,
    pub origin: Origin,
    pub value: u32,
    pub reference_text: String,
    pub oracle_text: String,
    /// Hex of the reference varint bytes.
    pub reference_hex: String,
    /// Hex of the oracle's bytes, when its text is valid base64.
    pub oracle_hex: Option<String>,
    /// The value the oracle's bytes decode to as a varint, when they do.
    pub oracle_decoded: Option<u32>,
    /// Why the oracle text or bytes could not be decoded.
    pub oracle_decode_error: Option<String>,
}

impl Divergence {
    #[must_use]
    pub fn new(candidate: Candidate, worker: usize, result: ComparisonResult) -> Self {
        let reference_hex = encode(result.value).hex();

        let (oracle_hex, oracle_decoded, oracle_decode_error) =
            match EncodedForm::from_text(&result.oracle) {
                Err(e) => (None, None, Some(e.to_string())),
                Ok(bytes) => {
                    let hex = Some(hex::encode(&bytes));
                    match decode_varint(&bytes) {
                        Ok((value, consumed)) if consumed == bytes.len() => (hex, Some(value), None),
                        Ok((value, consumed)) => (
                            hex,
                            Some(value),
                            Some(format!(
                                "{} trailing byte(s) after the varint",
                                bytes.len() - consumed
                            )),
                        ),
                        Err(e) => (hex, None, Some(e.to_string())),
                    }
                }
            };

        Self {
            sequence: candidate.sequence,
            worker,
            origin: candidate.origin,
            value: result.value,
            reference_text: result.reference,
            oracle_text: result.oracle,
            reference_hex,
            oracle_hex,
            oracle_decoded,
            oracle_decode_error,
        }
    }
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "value {} ({}, worker {}): reference {:?} [{}] != oracle {:?}",
            self.value, self.origin, self.worker, self.reference_text, self.reference_hex, self.oracle_text
        )?;
        if let Some(hex) = &self.oracle_hex {
            write!(f, " [{hex}]")?;
        }
        if let Some(decoded) = self.oracle_decoded {
            write!(f, " decoding to {decoded}")?;
        }
        if let Some(error) = &self.oracle_decode_error {
            write!(f, " ({error})")?;
        }
        Ok(())
    }
}

/// A value whose oracle query failed. Neither a pass nor a divergence.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Inconclusive {
    pub sequence: u64,
    pub worker: usize,
    pub origin: Origin,
    pub value: u32,
    pub error: String,
}

impl fmt::Display for Inconclusive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "value {} ({}, worker {}): {}",
            self.value, self.origin, self.worker, self.error
        )
    }
}

/// The result of checking one candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Match { sequence: u64 },
    Divergence(Divergence),
    Inconclusive(Inconclusive),
}

impl Outcome {
    pub(crate) fn sequence(&self) -> u64 {
        match self {
            Self::Match { sequence } => *sequence,
            Self::Divergence(d) => d.sequence,
            Self::Inconclusive(i) => i.sequence,
        }
    }
}
