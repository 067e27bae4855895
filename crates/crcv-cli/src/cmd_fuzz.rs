/// Implementation of `crcv fuzz`.
///
/// Runs the differential harness against one of three oracle sources:
///
/// ```text
/// --fixture PATH   recorded answers, offline
/// --record PATH    live ClickHouse, answers saved to PATH afterwards
/// (neither)        live ClickHouse
/// ```
///
/// `--workers N` above 1 opens N connections (or N fixture replayers)
/// and runs them concurrently; recording needs a single worker.
///
/// The report goes to stdout, as text or as JSON with `--json`. The exit
/// code is 0 only for a passing verdict.
use std::future;
use std::path::Path;

use anyhow::{Context, Result, bail};
use crcv_harness::{
    DifferentialHarness, FailureMode, HarnessConfig, HarnessReport, Verdict, run_parallel,
};
use crcv_oracle::{
    ClickHouseOracle, Fixture, FixtureOracle, Oracle, OracleConfig, OracleError, RecordingOracle,
};
use tracing::info;

use crate::{FuzzArgs, OracleArgs};

/// Run the `crcv fuzz` command.
///
/// # Errors
///
/// Returns an error if the oracle cannot be opened, a fixture cannot be
/// read or written, the run aborts, or the verdict is not a pass.
pub async fn run(args: &FuzzArgs, oracle_args: &OracleArgs) -> Result<()> {
    let report = report(args, oracle_args).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }

    match report.verdict() {
        Verdict::Pass => Ok(()),
        Verdict::Fail => bail!(
            "{} divergence(s) found, first at value {}",
            report.divergences.len(),
            report.divergences.first().map_or(0, |d| d.value)
        ),
        Verdict::Inconclusive => bail!(
            "{} value(s) could not be checked",
            report.inconclusive.len()
        ),
    }
}

fn harness_config(args: &FuzzArgs) -> HarnessConfig {
    HarnessConfig {
        random_iterations: args.iterations,
        rng_seed: args.seed,
        failure_mode: if args.stop_on_first {
            FailureMode::StopOnFirst
        } else {
            FailureMode::CollectAll
        },
        minimize: !args.no_minimize,
        ..HarnessConfig::default()
    }
}

async fn report(args: &FuzzArgs, oracle_args: &OracleArgs) -> Result<HarnessReport> {
    let config = harness_config(args);

    if let Some(path) = &args.fixture {
        let fixture = Fixture::load(path)
            .with_context(|| format!("cannot read fixture {}", path.display()))?;
        info!(
            path = %path.display(),
            source = %fixture.source,
            entries = fixture.entries.len(),
            "replaying recorded oracle answers"
        );
        if args.workers > 1 {
            let factory = |_: usize| future::ready(Ok::<_, OracleError>(FixtureOracle::new(fixture.clone())));
            return Ok(run_parallel(factory, &config, args.workers).await?);
        }
        return run_sequential(FixtureOracle::new(fixture), config).await;
    }

    let oracle_config = oracle_args.to_config()?;
    if let Some(path) = &args.record {
        if args.workers > 1 {
            bail!("--record needs a single worker");
        }
        return run_recording(oracle_config, config, path).await;
    }

    if args.workers > 1 {
        let factory = |_: usize| {
            let config = oracle_config.clone();
            async move { ClickHouseOracle::connect(config).await.map_err(OracleError::from) }
        };
        return Ok(run_parallel(factory, &config, args.workers).await?);
    }

    let oracle = ClickHouseOracle::connect(oracle_config)
        .await
        .context("cannot open oracle")?;
    run_sequential(oracle, config).await
}

async fn run_sequential<O: Oracle>(oracle: O, config: HarnessConfig) -> Result<HarnessReport> {
    let mut harness = DifferentialHarness::new(oracle, config);
    let report = harness.run_configured().await;
    harness.close().await;
    Ok(report?)
}

/// Run against ClickHouse and save every answer, even from an aborted run.
async fn run_recording(
    oracle_config: OracleConfig,
    config: HarnessConfig,
    path: &Path,
) -> Result<HarnessReport> {
    let oracle = ClickHouseOracle::connect(oracle_config)
        .await
        .context("cannot open oracle")?;
    let mut harness = DifferentialHarness::new(RecordingOracle::new(oracle), config);
    let report = harness.run_configured().await;
    harness.close().await;

    let fixture = harness.into_oracle().fixture();
    fixture
        .save(path)
        .with_context(|| format!("cannot write fixture {}", path.display()))?;
    info!(path = %path.display(), entries = fixture.entries.len(), "recorded oracle answers");
    Ok(report?)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;
    use crcv_harness::SEED_VALUES;

    use super::*;
    use crate::{Cli, Commands};

    fn fuzz_args(argv: &[&str]) -> (FuzzArgs, OracleArgs) {
        let cli = Cli::try_parse_from(argv).unwrap();
        let Commands::Fuzz(args) = cli.command else {
            panic!("expected fuzz");
        };
        (args, cli.oracle)
    }

    fn write_fixture(name: &str, answer: impl Fn(u32) -> String) -> PathBuf {
        let path = std::env::temp_dir().join(format!("crcv-{name}-{}.json", std::process::id()));
        let fixture = Fixture {
            source: "test".to_string(),
            entries: SEED_VALUES.iter().map(|&v| (v, answer(v))).collect(),
        };
        fixture.save(&path).unwrap();
        path
    }

    #[test]
    fn flags_map_onto_harness_config() {
        let (args, _) = fuzz_args(&[
            "crcv",
            "fuzz",
            "--iterations",
            "5",
            "--seed",
            "9",
            "--stop-on-first",
            "--no-minimize",
        ]);
        let config = harness_config(&args);
        assert_eq!(config.random_iterations, 5);
        assert_eq!(config.rng_seed, 9);
        assert_eq!(config.failure_mode, FailureMode::StopOnFirst);
        assert!(!config.minimize);
        assert_eq!(config.seed_values, SEED_VALUES.to_vec());
    }

    #[tokio::test]
    async fn recorded_reference_answers_pass() {
        let path = write_fixture("pass", |v| crcv_codec::encode(v).text().to_string());
        let path_arg = path.to_string_lossy().into_owned();
        for workers in ["1", "3"] {
            let (args, oracle) = fuzz_args(&[
                "crcv",
                "fuzz",
                "--iterations",
                "0",
                "--workers",
                workers,
                "--fixture",
                &path_arg,
            ]);
            let report = report(&args, &oracle).await.unwrap();
            assert_eq!(report.verdict(), Verdict::Pass, "workers {workers}");
            assert_eq!(report.comparisons, 10);
        }
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn recorded_broken_answers_fail() {
        let path = write_fixture("fail", |v| {
            crcv_codec::EncodingStrategy::PositionalLength.encode_text(v)
        });
        let path_arg = path.to_string_lossy().into_owned();
        let (args, oracle) = fuzz_args(&[
            "crcv",
            "fuzz",
            "--iterations",
            "0",
            "--stop-on-first",
            "--fixture",
            &path_arg,
        ]);
        let report = report(&args, &oracle).await.unwrap();
        assert_eq!(report.first_divergence().map(|d| d.value), Some(128));
        assert!(run(&args, &oracle).await.is_err());
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn random_values_missing_from_fixture_are_inconclusive() {
        let path = write_fixture("missing", |v| crcv_codec::encode(v).text().to_string());
        let path_arg = path.to_string_lossy().into_owned();
        let (args, oracle) =
            fuzz_args(&["crcv", "fuzz", "--iterations", "3", "--fixture", &path_arg]);
        let report = report(&args, &oracle).await.unwrap();
        assert_eq!(report.verdict(), Verdict::Inconclusive);
        assert_eq!(report.inconclusive.len(), 3);
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn unreadable_fixture_is_an_error() {
        let (args, oracle) =
            fuzz_args(&["crcv", "fuzz", "--fixture", "/nonexistent/crcv-fixture.json"]);
        let err = report(&args, &oracle).await.unwrap_err();
        assert!(err.to_string().contains("cannot read fixture"));
    }
}
