// ABOUTME: Integration tests for russh-backed connection failures.
// ABOUTME: Uses local sockets only; no SSH server is required.

mod support;

use sshline::ssh::{Credential, Error, Session, SessionConfig};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

/// Find a local port with nothing listening on it.
async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// Test: Connection to a port with no listener fails with a connection error.
#[tokio::test]
async fn refused_port_returns_connection_error() {
    support::init_tracing();
    let port = closed_port().await;
    let config = SessionConfig::new("127.0.0.1", "testuser").port(port);

    let err = Session::connect(config, Credential::password("secret"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::Connection(_)),
        "expected Connection error, got: {:?}",
        err
    );
}

/// Test: Connection to invalid host fails with connection error.
#[tokio::test]
async fn invalid_host_returns_connection_error() {
    let config = SessionConfig::new("nonexistent.invalid.host.example", "testuser")
        .connect_timeout(Duration::from_secs(5));

    let err = Session::connect(config, Credential::password("secret"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::Connection(_)),
        "expected Connection error, got: {:?}",
        err
    );
}

/// Test: A peer that accepts TCP but never speaks SSH hits the connect timeout.
#[tokio::test]
async fn silent_server_hits_connect_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        // Hold the connection open without sending a version banner.
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(socket);
    });

    let config = SessionConfig::new("127.0.0.1", "testuser")
        .port(port)
        .connect_timeout(Duration::from_millis(300));

    let start = Instant::now();
    let err = Session::connect(config, Credential::password("secret"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::Connection(ref msg) if msg.contains("timed out")),
        "expected connect timeout, got: {:?}",
        err
    );
    assert!(start.elapsed() < Duration::from_secs(3));
    server.abort();
}

/// Test: A missing key file is reported before any connection attempt.
#[tokio::test]
async fn missing_key_returns_key_error() {
    let port = closed_port().await;
    let config = SessionConfig::new("127.0.0.1", "testuser").port(port);

    let err = Session::connect(config, Credential::key_file("/nonexistent/key/path"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::KeyLoadFailed { .. }),
        "expected KeyLoadFailed error, got: {:?}",
        err
    );
}
