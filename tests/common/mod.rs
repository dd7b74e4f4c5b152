//! Shared utilities for integration tests: local origins to trace against.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::extract::Query;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use httpeek::config::TransportConfig;
use httpeek::net::tls::load_tls_config;
use httpeek::Tracer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// Transport settings with short ceilings so failing tests fail fast.
pub fn test_transport() -> TransportConfig {
    TransportConfig {
        dial_timeout_secs: 2,
        tls_handshake_timeout_secs: 2,
        request_timeout_secs: 5,
        ..TransportConfig::default()
    }
}

/// A tracer that also trusts the fixture CA.
pub fn fixture_tracer() -> Tracer {
    let transport = TransportConfig {
        ca_file: Some(fixture("ca.pem").to_string_lossy().into_owned()),
        ..test_transport()
    };
    Tracer::new(transport).unwrap()
}

/// Routes shared by the plain and TLS origins.
pub fn origin_router() -> Router {
    Router::new()
        .route("/ok", get(|| async { "ok" }))
        .route("/hello", get(|| async { "hello" }))
        .route("/redirect", get(|| async { redirect("/ok") }))
        .route("/redirect-absolute", get(redirect_absolute))
        .route("/redirect-twice", get(|| async { redirect("/redirect") }))
        .route("/no-location", get(|| async { StatusCode::FOUND }))
        .route("/dead-redirect", get(|| async { redirect("http://127.0.0.1:1/") }))
        .route("/echo", any(echo))
        .route("/slow", get(slow))
}

fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

async fn redirect_absolute(headers: HeaderMap) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("127.0.0.1");
    redirect(&format!("http://{host}/ok"))
}

/// Echo `X-Test` and the request body back to the caller.
async fn echo(headers: HeaderMap, body: String) -> Response {
    let x_test = headers
        .get("x-test")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    (
        StatusCode::OK,
        [("x-echo", x_test), ("x-echo-user-agent", user_agent)],
        body,
    )
        .into_response()
}

async fn slow(Query(params): Query<std::collections::HashMap<String, u64>>) -> &'static str {
    let ms = params.get("ms").copied().unwrap_or(3000);
    tokio::time::sleep(Duration::from_millis(ms)).await;
    "slow"
}

/// Serve `router` over plain HTTP on an ephemeral port.
pub async fn start_origin(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// Serve `router` over TLS with the fixture certificate on an ephemeral port.
pub async fn start_tls_origin(router: Router) -> SocketAddr {
    let config = load_tls_config(&fixture("server.pem"), &fixture("server.key"))
        .await
        .unwrap();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum_server::from_tcp_rustls(listener, config)
            .serve(router.into_make_service())
            .await;
    });
    addr
}

/// Start a raw TCP origin that answers every connection with `response`
/// verbatim once the request head has arrived, then closes.
pub async fn start_scripted_origin(response: impl Into<Vec<u8>>) -> SocketAddr {
    start_scripted(response.into(), None).await
}

/// Like [`start_scripted_origin`], but keeps the connection open for `hold`
/// after writing, so a short body never completes.
pub async fn start_stalling_origin(response: impl Into<Vec<u8>>, hold: Duration) -> SocketAddr {
    start_scripted(response.into(), Some(hold)).await
}

async fn start_scripted(response: Vec<u8>, hold: Option<Duration>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let response = response.clone();
                    tokio::spawn(async move {
                        let mut head = Vec::new();
                        let mut buf = [0u8; 1024];
                        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => head.extend_from_slice(&buf[..n]),
                            }
                        }
                        let _ = socket.write_all(&response).await;
                        if let Some(hold) = hold {
                            tokio::time::sleep(hold).await;
                        }
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
