/// CRC varint conformance tool: checksum and encode text the way the log
/// pipeline does, and check a ClickHouse-side encoder against the local
/// reference.
///
/// # Command overview
///
/// ```text
/// crcv <COMMAND> [OPTIONS]
///
/// Commands:
///   checksum   Print the CRC-32 of a string and its encoded form
///   encode     Print the encoded form of each argument's checksum
///   query      Ask the oracle for one value and compare it with the reference
///   fuzz       Run the differential harness over seeds and random values
///   help       Print help information
///
/// Oracle options (every command, also read from CRCV_* variables):
///   --endpoint URL           ClickHouse HTTP endpoint or DSN
///   --user NAME              user name
///   --password SECRET        password
///   --database NAME          target database
///   --formulation KIND       udf | inline | fixed-width | positional-length
///   --query-timeout-ms N     per-query bound
///   -v, --verbose            debug logging (repeat for trace)
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                           |
/// |------|---------------------------------------------------|
/// | 0    | Success, or every comparison passed               |
/// | 1    | Error, divergence, or values left unchecked       |
/// | 2    | Usage error (reported by clap)                    |
///
/// Logs and errors go to stderr so stdout can be piped cleanly.
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use crcv_oracle::{Formulation, OracleConfig};
use tracing_subscriber::EnvFilter;

mod cmd_checksum;
mod cmd_encode;
mod cmd_fuzz;
mod cmd_query;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// Differential checker for the CRC-32 varint encoding.
#[derive(Parser)]
#[command(name = "crcv", version, about = "CRC varint conformance checker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    oracle: OracleArgs,

    /// Log more (`-v` debug, `-vv` trace). `RUST_LOG` wins when set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Print `<crc32>\t<encoded>` for a string.
    Checksum(ChecksumArgs),
    /// Print `<encoded> <text>` for each argument.
    Encode(EncodeArgs),
    /// Query the oracle for a single value and compare.
    Query(QueryArgs),
    /// Run the differential harness.
    Fuzz(FuzzArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `crcv checksum`.
#[derive(clap::Args)]
pub struct ChecksumArgs {
    /// Text to checksum, as UTF-8 bytes.
    pub text: String,
}

/// Arguments for `crcv encode`.
#[derive(clap::Args)]
pub struct EncodeArgs {
    /// Strings to checksum and encode, one output line each.
    #[arg(required = true)]
    pub texts: Vec<String>,
}

/// Arguments for `crcv query`.
///
/// Connects, installs the encoder if the formulation needs one, and asks
/// for exactly one value. Handy for re-checking a value from a report.
#[derive(clap::Args)]
pub struct QueryArgs {
    /// The integer to encode on both sides.
    pub value: u32,
}

/// Arguments for `crcv fuzz`.
///
/// ```text
/// ┌──────────────────┬──────────────────────────────────────────────────────┐
/// │ Flag             │ Effect                                               │
/// ├──────────────────┼──────────────────────────────────────────────────────┤
/// │ --iterations N   │ random values after the seeds (default 1000)         │
/// │ --seed S         │ rng seed for the random tail (default 0)             │
/// │ --stop-on-first  │ end the run at the first divergence                  │
/// │ --workers N      │ concurrent oracle connections (default 1)            │
/// │ --no-minimize    │ report random divergences without shrinking them     │
/// │ --fixture PATH   │ replay recorded answers instead of connecting        │
/// │ --record PATH    │ save every oracle answer to a fixture file           │
/// │ --json           │ print the report as JSON                             │
/// └──────────────────┴──────────────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct FuzzArgs {
    /// Number of random values compared after the seed corpus.
    #[arg(long, default_value_t = 1000)]
    pub iterations: u64,

    /// Seed for the random value generator.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Stop at the first divergence instead of collecting all of them.
    #[arg(long)]
    pub stop_on_first: bool,

    /// Number of workers, each with its own oracle connection.
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// Keep random divergent values as drawn.
    #[arg(long)]
    pub no_minimize: bool,

    /// Replay answers from a fixture file; no server is contacted.
    #[arg(long, conflicts_with = "record")]
    pub fixture: Option<std::path::PathBuf>,

    /// Record the oracle's answers to this fixture file.
    #[arg(long)]
    pub record: Option<std::path::PathBuf>,

    /// Print the report as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

/// Where and how to reach the ClickHouse oracle.
#[derive(clap::Args)]
pub struct OracleArgs {
    /// HTTP endpoint, optionally a DSN carrying credentials and database
    /// (`http://user:pw@host:8123/db`).
    #[arg(long, global = true, env = "CRCV_ENDPOINT", default_value = "http://localhost:8123")]
    pub endpoint: String,

    /// User name; overrides one given in the endpoint.
    #[arg(long, global = true, env = "CRCV_USER")]
    pub user: Option<String>,

    /// Password; overrides one given in the endpoint.
    #[arg(long, global = true, env = "CRCV_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Database; overrides one given in the endpoint.
    #[arg(long, global = true, env = "CRCV_DATABASE")]
    pub database: Option<String>,

    /// Which SQL computes the encoding on the server: udf, inline,
    /// fixed-width or positional-length (the last two are known-broken).
    #[arg(long, global = true, env = "CRCV_FORMULATION", default_value_t = Formulation::Inline)]
    pub formulation: Formulation,

    /// Per-query timeout in milliseconds.
    #[arg(long, global = true, env = "CRCV_QUERY_TIMEOUT_MS", default_value_t = 10_000)]
    pub query_timeout_ms: u64,
}

impl OracleArgs {
    /// Fold the flags into an [`OracleConfig`]. Explicit flags beat values
    /// embedded in the endpoint.
    pub fn to_config(&self) -> Result<OracleConfig> {
        let mut config = OracleConfig::from_dsn(&self.endpoint)?;
        if let Some(user) = &self.user {
            config.user.clone_from(user);
        }
        if self.password.is_some() {
            config.password.clone_from(&self.password);
        }
        if self.database.is_some() {
            config.database.clone_from(&self.database);
        }
        config.formulation = self.formulation;
        config.query_timeout_ms = self.query_timeout_ms;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Checksum(args) => cmd_checksum::run(&args),
        Commands::Encode(args) => cmd_encode::run(&args),
        Commands::Query(args) => cmd_query::run(&args, &cli.oracle).await,
        Commands::Fuzz(args) => cmd_fuzz::run(&args, &cli.oracle).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
