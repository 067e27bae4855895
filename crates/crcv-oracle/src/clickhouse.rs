use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::OracleConfig;
use crate::error::{ConnectionError, InstallError, OracleError, QueryError};
use crate::oracle::Oracle;
use crate::sql::{CREATE_FUNCTION_SQL, PROBE_SQL};

const USER_HEADER: &str = "X-ClickHouse-User";
const KEY_HEADER: &str = "X-ClickHouse-Key";
const EXCEPTION_CODE_HEADER: &str = "X-ClickHouse-Exception-Code";

/// ClickHouse error code for `FUNCTION_ALREADY_EXISTS`.
const FUNCTION_ALREADY_EXISTS: &str = "609";

/// Oracle backed by a ClickHouse server's HTTP interface.
///
/// One instance owns one HTTP client and issues one statement at a time.
/// The lifecycle is:
///
/// ```text
///   connect ──probe ok──▶ Ready ──close──▶ Closed
///      │                   │  ▲
///      │ probe fails       │  └── query / install_encoder
///      ▼                   ▼
///   ConnectionError    QueryError (client stays Ready)
/// ```
///
/// Only failures to establish a connection are retried, and a retry
/// re-sends the whole statement. Anything that may have reached the server
/// is reported instead of resumed.
#[derive(Debug)]
pub struct ClickHouseOracle {
    http: Option<reqwest::Client>,
    endpoint: Url,
    config: OracleConfig,
}

/// A fully read HTTP answer.
struct RawResponse {
    status: StatusCode,
    exception_code: Option<String>,
    body: Vec<u8>,
}

impl ClickHouseOracle {
    /// Open a client and verify the server answers an authenticated
    /// `SELECT 1` within `config.connect_timeout()`.
    ///
    /// # Errors
    ///
    /// A [`ConnectionError`] for a bad endpoint, an unreachable or
    /// rejecting server, a probe timeout or an unexpected probe answer.
    /// No client survives a failed connect.
    pub async fn connect(config: OracleConfig) -> Result<Self, ConnectionError> {
        let mut endpoint =
            Url::parse(&config.endpoint).map_err(|e| ConnectionError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                reason: e.to_string(),
            })?;
        if let Some(database) = &config.database {
            endpoint.query_pairs_mut().append_pair("database", database);
        }

        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(ConnectionError::Client)?;

        let oracle = Self {
            http: Some(http),
            endpoint,
            config,
        };
        // On failure `oracle` is dropped here, taking the pooled sockets with it
        oracle.probe().await?;

        info!(
            endpoint = %oracle.config.endpoint,
            database = ?oracle.config.database,
            formulation = %oracle.config.formulation,
            "connected to ClickHouse oracle"
        );
        Ok(oracle)
    }

    /// The configuration this client was connected with.
    #[must_use]
    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    async fn probe(&self) -> Result<(), ConnectionError> {
        let http = self.http.as_ref().ok_or(ConnectionError::Closed)?;
        let endpoint = self.config.endpoint.clone();
        let limit = self.config.connect_timeout();

        let response = timeout(limit, self.post(http, PROBE_SQL))
            .await
            .map_err(|_| ConnectionError::ProbeTimeout {
                endpoint: endpoint.clone(),
                timeout: limit,
            })?
            .map_err(|source| ConnectionError::Unreachable {
                endpoint: endpoint.clone(),
                source,
            })?;

        let body = String::from_utf8_lossy(&response.body);
        if !response.status.is_success() || response.exception_code.is_some() {
            return Err(ConnectionError::Rejected {
                endpoint,
                status: response.status.as_u16(),
                message: body.trim().to_string(),
            });
        }
        if body.trim_end_matches('\n') != "1" {
            return Err(ConnectionError::UnexpectedProbe {
                endpoint,
                body: body.into_owned(),
            });
        }

        debug!(endpoint = %self.config.endpoint, "liveness probe ok");
        Ok(())
    }

    async fn post(&self, http: &reqwest::Client, sql: &str) -> Result<RawResponse, reqwest::Error> {
        let mut request = http
            .post(self.endpoint.clone())
            .header(USER_HEADER, &self.config.user)
            .body(sql.to_string());
        if let Some(password) = &self.config.password {
            request = request.header(KEY_HEADER, password);
        }

        let response = request.send().await?;
        let status = response.status();
        let exception_code = response
            .headers()
            .get(EXCEPTION_CODE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse {
            status,
            exception_code,
            body,
        })
    }

    /// Send `sql` under the per-query timeout. The limit covers every
    /// attempt, so retries never stretch a query past it.
    async fn post_with_retry(
        &self,
        http: &reqwest::Client,
        sql: &str,
        value: u32,
    ) -> Result<RawResponse, QueryError> {
        let limit = self.config.query_timeout();
        timeout(limit, self.post_retrying(http, sql, value))
            .await
            .map_err(|_| QueryError::Timeout { value, timeout: limit })?
    }

    /// Re-send from scratch while the connection could not be established.
    async fn post_retrying(
        &self,
        http: &reqwest::Client,
        sql: &str,
        value: u32,
    ) -> Result<RawResponse, QueryError> {
        let mut attempt = 0;
        loop {
            match self.post(http, sql).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_connect() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(value, attempt, error = %e, "connect failed, re-sending query");
                }
                Err(source) => return Err(QueryError::Transport { value, source }),
            }
        }
    }
}

/// Turn a response into exactly one scalar string.
fn parse_scalar(value: u32, response: RawResponse) -> Result<String, QueryError> {
    if !response.status.is_success() || response.exception_code.is_some() {
        return Err(QueryError::Remote {
            value,
            status: response.status.as_u16(),
            code: response.exception_code,
            message: String::from_utf8_lossy(&response.body).trim().to_string(),
        });
    }

    let body = String::from_utf8(response.body).map_err(|e| QueryError::Malformed {
        value,
        body: String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })?;

    // TabSeparatedRaw ends every row with one newline
    let row = body.strip_suffix('\n').unwrap_or(&body);
    if row.is_empty() {
        return Err(QueryError::Empty { value });
    }
    if row.contains(['\n', '\t']) {
        return Err(QueryError::Malformed { value, body });
    }
    Ok(row.to_string())
}

#[async_trait]
impl Oracle for ClickHouseOracle {
    fn name(&self) -> &str {
        "clickhouse"
    }

    async fn install_encoder(&mut self) -> Result<(), OracleError> {
        if !self.config.formulation.requires_install() {
            debug!(formulation = %self.config.formulation, "formulation needs no remote function");
            return Ok(());
        }
        let http = self.http.as_ref().ok_or(ConnectionError::Closed)?;
        let limit: Duration = self.config.query_timeout();

        let response = timeout(limit, self.post(http, CREATE_FUNCTION_SQL))
            .await
            .map_err(|_| InstallError::Timeout { timeout: limit })?
            .map_err(InstallError::Transport)?;

        if response.exception_code.as_deref() == Some(FUNCTION_ALREADY_EXISTS) {
            debug!("encoding function already defined");
            return Ok(());
        }
        if !response.status.is_success() || response.exception_code.is_some() {
            return Err(InstallError::Remote {
                status: response.status.as_u16(),
                message: String::from_utf8_lossy(&response.body).trim().to_string(),
            }
            .into());
        }

        info!("encoding function installed");
        Ok(())
    }

    async fn query(&mut self, value: u32) -> Result<String, OracleError> {
        let http = self.http.as_ref().ok_or(ConnectionError::Closed)?;
        let sql = self.config.formulation.query(value);

        let result = self
            .post_with_retry(http, &sql, value)
            .await
            .and_then(|response| parse_scalar(value, response));
        if let Err(e) = &result {
            warn!(value, error = %e, "oracle query failed");
        }
        result.map_err(OracleError::from)
    }

    async fn close(&mut self) {
        if self.http.take().is_some() {
            debug!(endpoint = %self.config.endpoint, "oracle connection closed");
        }
    }
}
