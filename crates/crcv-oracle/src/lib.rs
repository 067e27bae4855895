#![warn(clippy::pedantic)]

pub mod clickhouse;
pub mod config;
pub mod error;
pub mod fixture;
pub mod local;
pub mod oracle;
pub mod sql;

pub use clickhouse::ClickHouseOracle;
pub use config::OracleConfig;
pub use error::{ConnectionError, FixtureError, InstallError, OracleError, QueryError};
pub use fixture::{Fixture, FixtureOracle, RecordingOracle};
pub use local::StrategyOracle;
pub use oracle::Oracle;
pub use sql::Formulation;
