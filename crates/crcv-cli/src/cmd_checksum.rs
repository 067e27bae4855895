/// Implementation of `crcv checksum`.
///
/// Prints the CRC-32/ISO-HDLC of the argument's UTF-8 bytes and the
/// encoded form the log pipeline stores, tab separated:
///
/// ```text
/// $ crcv checksum 123456789
/// 3421780262	pvLQ3ww
/// ```
use anyhow::Result;
use crcv_codec::checksum_and_encode;

use crate::ChecksumArgs;

/// Run the `crcv checksum` command.
///
/// # Errors
///
/// Never fails; the signature matches the other commands.
#[allow(clippy::unnecessary_wraps)]
pub fn run(args: &ChecksumArgs) -> Result<()> {
    println!("{}", render(&args.text));
    Ok(())
}

pub(crate) fn render(text: &str) -> String {
    let (crc, encoded) = checksum_and_encode(text.as_bytes());
    format!("{crc}\t{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_checksums_to_zero() {
        assert_eq!(render(""), "0\tAA");
    }

    #[test]
    fn check_value() {
        // CRC-32/ISO-HDLC check value
        assert_eq!(render("123456789"), "3421780262\tpvLQ3ww");
    }
}
