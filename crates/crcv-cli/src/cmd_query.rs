/// Implementation of `crcv query`.
///
/// A single direct re-query of the oracle, for checking one value by hand
/// (typically one taken from a fuzz report's reproducing seeds).
///
/// ```text
/// $ crcv query 128
/// value      128
/// reference  gAE [8001]
/// oracle     gAE [8001]
/// ✓ match
/// ```
///
/// A mismatch prints `✗ mismatch` and exits with code 1.
use anyhow::{Context, Result, bail};
use crcv_codec::{EncodedForm, encode};
use crcv_harness::ComparisonResult;
use crcv_oracle::{ClickHouseOracle, Oracle};

use crate::{OracleArgs, QueryArgs};

/// Run the `crcv query` command.
///
/// # Errors
///
/// Returns an error if the oracle cannot be reached or prepared, if the
/// query fails, or if the oracle disagrees with the reference.
pub async fn run(args: &QueryArgs, oracle_args: &OracleArgs) -> Result<()> {
    let config = oracle_args.to_config()?;
    let mut oracle = ClickHouseOracle::connect(config)
        .await
        .context("cannot open oracle")?;

    let answer = async {
        oracle.install_encoder().await?;
        oracle.query(args.value).await
    }
    .await;
    oracle.close().await;
    let answer = answer.with_context(|| format!("oracle query for {} failed", args.value))?;

    let result = ComparisonResult::compare(args.value, answer);
    for line in render(&result) {
        println!("{line}");
    }
    if !result.matched {
        bail!("oracle disagrees with the reference for {}", args.value);
    }
    Ok(())
}

fn render(result: &ComparisonResult) -> Vec<String> {
    let oracle_hex = EncodedForm::from_text(&result.oracle)
        .map_or_else(|e| format!("not decodable: {e}"), hex::encode);
    vec![
        format!("value      {}", result.value),
        format!("reference  {} [{}]", result.reference, encode(result.value).hex()),
        format!("oracle     {} [{oracle_hex}]", result.oracle),
        if result.matched { "✓ match" } else { "✗ mismatch" }.to_string(),
    ]
}
