//! WebSocket progress streaming tests
//!
//! Verifies that clients connected to /ws/progress receive research progress
//! events in the JSON wire format the frontend expects.

mod helpers;

use futures_util::StreamExt;
use helpers::{spawn_app, TestApp};
use serde_json::json;
use std::time::Duration;

/// Wait until the server-side socket handler has subscribed to the
/// progress broadcaster, so no event can be sent before anyone listens.
async fn wait_for_subscriber(app: &TestApp) {
    for _ in 0..100 {
        if app.state.progress_broadcaster.receiver_count() > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("WebSocket handler never subscribed to progress updates");
}

#[tokio::test]
async fn progress_events_reach_connected_clients() {
    let app = spawn_app().await;
    let ws_url = format!("{}/ws/progress", app.ws_address);

    let (mut ws_stream, _) = tokio_tungstenite::connect_async(&ws_url).await.unwrap();
    wait_for_subscriber(&app).await;

    app.state
        .progress_broadcaster
        .send(delve_research::ProgressEvent::info(
            "Processing query",
            Some(json!({"query": "rust adoption"})),
        ))
        .unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(5), ws_stream.next())
        .await
        .expect("timed out waiting for progress frame")
        .expect("stream ended before any frame")
        .unwrap();

    let text = frame.into_text().unwrap();
    let event: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(event["type"], "info");
    assert_eq!(event["message"], "Processing query");
    assert_eq!(event["data"]["query"], "rust adoption");
    assert!(event["timestamp"].is_string());
}

#[tokio::test]
async fn a_research_run_streams_its_progress() {
    let app = spawn_app().await;
    let ws_url = format!("{}/ws/progress", app.ws_address);

    let (mut ws_stream, _) = tokio_tungstenite::connect_async(&ws_url).await.unwrap();
    wait_for_subscriber(&app).await;

    // Kick off a run over HTTP while the WebSocket client listens
    let client = app.api_client.clone();
    let address = app.address.clone();
    let request_handle = tokio::spawn(async move {
        client
            .post(format!("{}/api/research/start", address))
            .json(&json!({
                "query": "How does artificial intelligence affect the job market?",
                "depth": 1,
                "breadth": 2,
                "questionsWithAnswers": "Q1: Which sectors are most at risk?\nA1: Mainly transportation and administration..."
            }))
            .send()
            .await
            .unwrap()
    });

    let mut messages = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(frame) = ws_stream.next().await {
            let frame = frame.unwrap();
            if !frame.is_text() {
                continue;
            }
            let event: serde_json::Value =
                serde_json::from_str(&frame.into_text().unwrap()).unwrap();
            let message = event["message"].as_str().unwrap().to_string();
            let done = message == "Research completed successfully!";
            messages.push(message);
            if done {
                break;
            }
        }
    })
    .await
    .expect("timed out waiting for the run to finish");

    assert!(messages
        .iter()
        .any(|m| m == "Starting comprehensive research..."));
    assert!(messages.iter().any(|m| m == "Generated SERP queries"));
    assert!(messages
        .iter()
        .any(|m| m == "Final report has been generated"));

    let response = request_handle.await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn event_wire_format_is_stable() {
    let event = delve_research::ProgressEvent::info(
        "Generated SERP queries",
        Some(json!({"count": 2, "queries": []})),
    );

    let serialized = serde_json::to_string(&event).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&serialized).unwrap();

    assert_eq!(parsed["type"], "info");
    assert_eq!(parsed["message"], "Generated SERP queries");
    assert_eq!(parsed["data"]["count"], 2);
    assert!(parsed["timestamp"].is_string());
}
