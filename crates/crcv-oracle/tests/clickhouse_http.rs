//! `ClickHouseOracle` against a mock ClickHouse HTTP interface.
//!
//! Each test stands up a `wiremock` server that answers the liveness probe
//! and whichever statements the scenario needs. Matchers are keyed on the
//! statement text so the probe, the install and each value's query never
//! shadow one another.
//!
//! Losing the server mid-run needs a listener that really goes away, so
//! that scenario answers the probe from a bare `TcpListener` instead.

use std::time::{Duration, Instant};

use crcv_oracle::sql::{CREATE_FUNCTION_SQL, PROBE_SQL};
use crcv_oracle::{
    ClickHouseOracle, ConnectionError, Formulation, InstallError, Oracle, OracleConfig,
    OracleError, QueryError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_string, body_string_contains, header, method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn config_for(server: &MockServer) -> OracleConfig {
    OracleConfig {
        endpoint: server.uri(),
        password: Some("pw".to_string()),
        connect_timeout_ms: 2_000,
        query_timeout_ms: 2_000,
        ..OracleConfig::default()
    }
}

async fn mount_probe(server: &MockServer) {
    Mock::given(method("POST"))
        .and(body_string(PROBE_SQL))
        .and(header("X-ClickHouse-User", "default"))
        .and(header("X-ClickHouse-Key", "pw"))
        .and(query_param("database", "otel"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1\n"))
        .mount(server)
        .await;
}

async fn mount_answer(server: &MockServer, value: u32, body: &str) {
    Mock::given(method("POST"))
        .and(body_string_contains(format!("toUInt32({value})")))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn connected(server: &MockServer, config: OracleConfig) -> ClickHouseOracle {
    mount_probe(server).await;
    ClickHouseOracle::connect(config)
        .await
        .expect("connect against mock should succeed")
}

// ── Connect ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn connect_probes_then_queries() {
    let server = MockServer::start().await;
    mount_answer(&server, 128, "gAE\n").await;
    let mut oracle = connected(&server, config_for(&server)).await;

    assert_eq!(oracle.query(128).await.unwrap(), "gAE");
    oracle.close().await;
}

#[tokio::test]
async fn rejected_probe_is_connection_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(516)
                .insert_header("X-ClickHouse-Exception-Code", "516")
                .set_body_string("Code: 516. DB::Exception: default: Authentication failed\n"),
        )
        .mount(&server)
        .await;

    let err = ClickHouseOracle::connect(config_for(&server)).await.unwrap_err();
    match err {
        ConnectionError::Rejected { status, message, .. } => {
            assert_eq!(status, 516);
            assert!(message.contains("Authentication failed"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_probe_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("1\n")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = OracleConfig {
        connect_timeout_ms: 100,
        ..config_for(&server)
    };
    let err = ClickHouseOracle::connect(config).await.unwrap_err();
    assert!(matches!(err, ConnectionError::ProbeTimeout { .. }), "got {err:?}");
}

#[tokio::test]
async fn wrong_probe_answer_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let err = ClickHouseOracle::connect(config_for(&server)).await.unwrap_err();
    assert!(matches!(err, ConnectionError::UnexpectedProbe { .. }), "got {err:?}");
}

#[tokio::test]
async fn unreachable_endpoint_is_connection_error() {
    let config = OracleConfig {
        endpoint: "http://127.0.0.1:1".to_string(),
        connect_timeout_ms: 1_000,
        ..OracleConfig::default()
    };
    let err = ClickHouseOracle::connect(config).await.unwrap_err();
    assert!(
        matches!(err, ConnectionError::Unreachable { .. } | ConnectionError::ProbeTimeout { .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn malformed_endpoint_is_connection_error() {
    let config = OracleConfig {
        endpoint: "not a url".to_string(),
        ..OracleConfig::default()
    };
    let err = ClickHouseOracle::connect(config).await.unwrap_err();
    assert!(matches!(err, ConnectionError::InvalidEndpoint { .. }));
}

// ── Query failures ────────────────────────────────────────────────────────────

#[tokio::test]
async fn slow_query_times_out_and_client_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("toUInt32(128)"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("gAE\n")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    mount_answer(&server, 1, "AQ\n").await;

    let config = OracleConfig {
        query_timeout_ms: 100,
        ..config_for(&server)
    };
    let mut oracle = connected(&server, config).await;

    let err = oracle.query(128).await.unwrap_err();
    assert!(matches!(err, OracleError::Query(QueryError::Timeout { value: 128, .. })));
    assert_eq!(oracle.query(1).await.unwrap(), "AQ");
}

#[tokio::test]
async fn server_exception_is_query_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("toUInt32(7)"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("X-ClickHouse-Exception-Code", "46")
                .set_body_string("Code: 46. DB::Exception: Unknown function varintEncode\n"),
        )
        .mount(&server)
        .await;

    let mut oracle = connected(&server, config_for(&server)).await;
    let err = oracle.query(7).await.unwrap_err();
    match err {
        OracleError::Query(QueryError::Remote { value, status, code, .. }) => {
            assert_eq!(value, 7);
            assert_eq!(status, 404);
            assert_eq!(code.as_deref(), Some("46"));
        }
        other => panic!("expected Remote, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_result_is_query_error() {
    let server = MockServer::start().await;
    mount_answer(&server, 3, "").await;

    let mut oracle = connected(&server, config_for(&server)).await;
    let err = oracle.query(3).await.unwrap_err();
    assert!(matches!(err, OracleError::Query(QueryError::Empty { value: 3 })));
}

#[tokio::test]
async fn query_after_close_fails_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("toUInt32("))
        .respond_with(ResponseTemplate::new(200).set_body_string("AA\n"))
        .expect(0)
        .mount(&server)
        .await;

    let mut oracle = connected(&server, config_for(&server)).await;
    oracle.close().await;
    oracle.close().await;

    let err = oracle.query(0).await.unwrap_err();
    assert!(matches!(err, OracleError::Connection(ConnectionError::Closed)));
}

/// Answer exactly one probe, then stop listening on the port.
async fn serve_probe_once() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        while !request.ends_with(PROBE_SQL.as_bytes()) {
            let n = stream.read(&mut chunk).await.unwrap();
            assert_ne!(n, 0, "client hung up before sending the probe");
            request.extend_from_slice(&chunk[..n]);
        }
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\n1\n")
            .await
            .unwrap();
        stream.shutdown().await.unwrap();
        // Listener and stream drop here, so later connects are refused
    });

    endpoint
}

#[tokio::test]
async fn lost_server_is_transport_error_after_retries() {
    let endpoint = serve_probe_once().await;
    let config = OracleConfig {
        endpoint,
        max_retries: 2,
        connect_timeout_ms: 2_000,
        query_timeout_ms: 5_000,
        ..OracleConfig::default()
    };
    let mut oracle = ClickHouseOracle::connect(config).await.unwrap();

    let started = Instant::now();
    let err = oracle.query(5).await.unwrap_err();
    assert!(
        matches!(err, OracleError::Query(QueryError::Transport { value: 5, .. })),
        "got {err:?}"
    );
    assert!(!err.is_fatal());

    // Still open: the next query fails the same way instead of as Closed
    let err = oracle.query(6).await.unwrap_err();
    assert!(
        matches!(err, OracleError::Query(QueryError::Transport { value: 6, .. })),
        "got {err:?}"
    );
    assert!(started.elapsed() < Duration::from_secs(5));
    oracle.close().await;
}

// ── Install ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn udf_install_runs_create_function() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string(CREATE_FUNCTION_SQL))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;
    mount_answer(&server, 16384, "gIAB\n").await;

    let config = OracleConfig {
        formulation: Formulation::Udf,
        ..config_for(&server)
    };
    let mut oracle = connected(&server, config).await;

    // Twice: re-running against a persistent server must be harmless
    oracle.install_encoder().await.unwrap();
    oracle.install_encoder().await.unwrap();
    assert_eq!(oracle.query(16384).await.unwrap(), "gIAB");
}

#[tokio::test]
async fn install_treats_existing_function_as_done() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("CREATE OR REPLACE FUNCTION"))
        .respond_with(
            ResponseTemplate::new(500)
                .insert_header("X-ClickHouse-Exception-Code", "609")
                .set_body_string("Code: 609. DB::Exception: Function varintEncode already exists\n"),
        )
        .mount(&server)
        .await;

    let config = OracleConfig {
        formulation: Formulation::Udf,
        ..config_for(&server)
    };
    let mut oracle = connected(&server, config).await;
    oracle.install_encoder().await.unwrap();
}

#[tokio::test]
async fn install_failure_is_install_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("CREATE OR REPLACE FUNCTION"))
        .respond_with(
            ResponseTemplate::new(500)
                .insert_header("X-ClickHouse-Exception-Code", "497")
                .set_body_string("Code: 497. DB::Exception: Not enough privileges\n"),
        )
        .mount(&server)
        .await;

    let config = OracleConfig {
        formulation: Formulation::Udf,
        ..config_for(&server)
    };
    let mut oracle = connected(&server, config).await;
    let err = oracle.install_encoder().await.unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, OracleError::Install(InstallError::Remote { status: 500, .. })));
}

#[tokio::test]
async fn inline_formulation_installs_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("CREATE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut oracle = connected(&server, config_for(&server)).await;
    oracle.install_encoder().await.unwrap();
}
