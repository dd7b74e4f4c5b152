//! The `httpeek` binary: batch tracing, exit status and JSON output.

mod common;

use std::process::Output;

use httpeek::RequestTrace;
use tokio::process::Command;

use common::{closed_port, origin_router, start_origin};

async fn httpeek(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_httpeek"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .await
        .unwrap()
}

#[tokio::test]
async fn no_url_outside_api_mode_exits_with_usage_status() {
    let output = httpeek(&[]).await;

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no URL given"));
}

#[tokio::test]
async fn batch_continues_past_a_failure_and_exits_non_zero() {
    let origin = start_origin(origin_router()).await;
    let dead = closed_port().await;
    let dead_url = format!("http://{dead}/");
    let good_url = format!("http://{origin}/ok");

    let output = httpeek(&[&dead_url, &good_url]).await;

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("Target: {dead_url}")));
    assert!(stdout.contains(&format!("Target: {good_url}")));
    assert!(stdout.contains(&format!("Request: GET {good_url}")));
    assert!(stdout.contains("Status: 200"));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(&format!("error: {dead_url}")));
}

#[tokio::test]
async fn single_url_gets_a_banner_and_succeeds() {
    let origin = start_origin(origin_router()).await;
    let url = format!("http://{origin}/redirect");

    let output = httpeek(&["--show-headers", &url]).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("Target: {url}")));
    assert!(stdout.contains("Status: 302"));
    assert!(stdout.contains("    location: /ok"));
    assert!(stdout.contains("Redirect:\n    Request: GET"));
}

#[tokio::test]
async fn json_flag_prints_the_trace_tree() {
    let origin = start_origin(origin_router()).await;
    let url = format!("http://{origin}/redirect");

    let output = httpeek(&["--json", "--show-body", &url]).await;

    assert!(output.status.success());
    let trace: RequestTrace = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(trace.url, url);
    assert_eq!(trace.resp_status, 302);
    let child = trace.redirect_to.as_deref().unwrap();
    assert_eq!(child.resp_status, 200);
    assert_eq!(child.resp_body, "ok");
}
