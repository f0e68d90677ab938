mod common;

use common::{quiet_logger, unreachable_url, Upstream, SLOW_RESPONSE};
use mcp_api_client::services::batch::BatchCoordinator;
use mcp_api_client::services::request_executor::{ErrorKind, ExecOptions, RequestExecutor};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

fn coordinator() -> BatchCoordinator {
    let logger = quiet_logger();
    BatchCoordinator::new(logger.clone(), Arc::new(RequestExecutor::new(logger)))
}

#[tokio::test]
async fn results_follow_input_order_not_completion_order() {
    let upstream = Upstream::start().await;
    let delays = [300u64, 10, 150, 0, 220];
    let items: Vec<Value> = delays
        .iter()
        .map(|ms| json!({ "url": upstream.url(&format!("/sleep/{}", ms)) }))
        .collect();

    let results = coordinator()
        .execute_batch(&items, &ExecOptions::default())
        .await;

    assert_eq!(results.len(), delays.len());
    for (record, ms) in results.iter().zip(delays) {
        assert_eq!(record.to_value(), json!({"status": 200, "body": {"slept": ms}}));
    }
}

#[tokio::test]
async fn requests_run_concurrently() {
    let upstream = Upstream::start().await;
    let items: Vec<Value> = (0..4)
        .map(|_| json!({ "url": upstream.url("/sleep/400") }))
        .collect();

    let started = Instant::now();
    let results = coordinator()
        .execute_batch(&items, &ExecOptions::default())
        .await;

    assert!(results.iter().all(|record| record.is_success()));
    assert!(
        started.elapsed().as_millis() < 1200,
        "batch took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn one_unreachable_host_does_not_affect_the_rest() {
    let upstream = Upstream::start().await;
    let items = vec![
        json!({ "url": upstream.url("/json") }),
        json!({ "url": unreachable_url().await }),
        json!({ "url": upstream.url("/text") }),
    ];

    let results = coordinator()
        .execute_batch(&items, &ExecOptions::default())
        .await;

    assert_eq!(results[0].status(), Some(200));
    assert_eq!(results[1].error_kind(), Some(ErrorKind::Connection));
    assert_eq!(results[2].to_value(), json!({"status": 200, "body": "hello"}));
}

#[tokio::test]
async fn malformed_items_never_reach_the_network() {
    let upstream = Upstream::start().await;
    let items = vec![
        json!({ "method": "GET" }),
        json!({ "url": upstream.url("/json") }),
        json!({ "url": "not a url" }),
        json!("just a string"),
        json!({ "url": upstream.url("/json"), "body": 42 }),
    ];

    let results = coordinator()
        .execute_batch(&items, &ExecOptions::default())
        .await;

    let kinds: Vec<Option<ErrorKind>> = results.iter().map(|r| r.error_kind()).collect();
    assert_eq!(
        kinds,
        vec![
            Some(ErrorKind::InvalidRequest),
            None,
            Some(ErrorKind::InvalidRequest),
            Some(ErrorKind::InvalidRequest),
            Some(ErrorKind::InvalidRequest),
        ]
    );
    assert_eq!(
        results[0].to_value(),
        json!({"error": "invalid_request", "message": "Missing 'url' field"})
    );
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn timeout_applies_to_each_item() {
    let upstream = Upstream::start().await;
    let items = vec![
        json!({ "url": upstream.url("/delay") }),
        json!({ "url": upstream.url("/json") }),
    ];

    let started = Instant::now();
    let results = coordinator()
        .execute_batch(
            &items,
            &ExecOptions {
                timeout_secs: 0.5,
                include_headers: false,
            },
        )
        .await;

    assert!(started.elapsed() < SLOW_RESPONSE);
    assert_eq!(results[0].error_kind(), Some(ErrorKind::Timeout));
    assert_eq!(results[1].status(), Some(200));
}

#[tokio::test]
async fn batch_items_carry_their_own_method_and_body() {
    let upstream = Upstream::start().await;
    let items = vec![
        json!({ "url": upstream.url("/echo"), "method": "delete" }),
        json!({
            "url": upstream.url("/echo"),
            "method": "PATCH",
            "body": [1, 2],
            "params": { "n": 3, "flag": true },
        }),
    ];

    let results = coordinator()
        .execute_batch(
            &items,
            &ExecOptions {
                include_headers: true,
                ..ExecOptions::default()
            },
        )
        .await;

    let first = results[0].to_value();
    assert_eq!(first["body"]["method"], "DELETE");
    assert!(first["headers"].is_object());

    let second = results[1].to_value();
    assert_eq!(second["body"]["method"], "PATCH");
    assert_eq!(second["body"]["query"], "flag=true&n=3");
    assert_eq!(second["body"]["body"], "[1,2]");
}
