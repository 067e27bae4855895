/// Implementation of `crcv encode`.
///
/// One line per argument, in argument order:
///
/// ```text
/// $ crcv encode foo bar
/// <encoded> foo
/// <encoded> bar
/// ```
use anyhow::Result;
use crcv_codec::checksum_and_encode;

use crate::EncodeArgs;

/// Run the `crcv encode` command.
///
/// # Errors
///
/// Never fails; the signature matches the other commands.
#[allow(clippy::unnecessary_wraps)]
pub fn run(args: &EncodeArgs) -> Result<()> {
    for line in render(&args.texts) {
        println!("{line}");
    }
    Ok(())
}

fn render(texts: &[String]) -> Vec<String> {
    texts
        .iter()
        .map(|text| {
            let (_, encoded) = checksum_and_encode(text.as_bytes());
            format!("{encoded} {text}")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_line_per_argument_in_order() {
        let lines = render(&[String::new(), "123456789".to_string()]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "AA ");
        assert!(lines[1].ends_with(" 123456789"));
        assert!(lines[1].starts_with(crcv_codec::encode(0xCBF4_3926).text()));
    }
}
