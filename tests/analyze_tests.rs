mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use codeforge_backend::store::Store;
use common::{ReadOnlyLedgerStore, ScriptedExecutor};
use serde_json::{json, Value};

fn analyze_body(previous: Option<Value>) -> Value {
    let mut body = json!({
        "code": "def f(a, t): return a.index(t)",
        "language": "python",
        "question": {
            "title": "Find Target Index",
            "description": "Print the index of the target.",
            "constraints": "1 <= n <= 10^5\n-10^9 <= a[i] <= 10^9"
        },
        "testResults": [{
            "input": "1 2 3\n4",
            "expected_output": "-1",
            "actual_output": "Traceback: ValueError",
            "stderr": "ValueError",
            "status_code": 1,
            "passed": false
        }],
        "attempts": 2,
        "timeSpentInSeconds": 95,
        "user_id": "learner-1"
    });
    if let Some(p) = previous {
        body["previousWeaknesses"] = p;
    }
    body
}

#[tokio::test]
async fn fenced_reply_is_parsed_and_persisted() {
    let app = common::create_test_app(ScriptedExecutor::constant(""));
    app.oracle.reply(
        "```json\n{\"analysis\": \"Fails when the target is missing.\", \"weaknesses\": [\"edge case handling\"]}\n```",
    );

    let (status, body) = app.post("/analyze", analyze_body(Some(json!([])))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analysis"], "Fails when the target is missing.");
    assert_eq!(body["weaknesses"], json!(["edge case handling"]));
    assert_eq!(body["persisted"], true);
    assert_eq!(
        app.store.get_weaknesses("learner-1").await.unwrap(),
        Some(vec!["edge case handling".to_string()])
    );

    let prompt = app.oracle.last_prompt();
    assert!(prompt.contains("None (first attempt)"));
    assert!(prompt.contains("Number of attempts: 2"));
    assert!(prompt.contains("Time spent: 95 seconds"));
    assert!(prompt.contains("-10^9 <= a[i] <= 10^9"));
}

#[tokio::test]
async fn bare_reply_with_backticks_in_analysis_parses() {
    let app = common::create_test_app(ScriptedExecutor::constant(""));
    app.oracle.reply(r#"{"analysis": "Prefer ```for i in range(n)``` over while.", "weaknesses": []}"#);

    let (status, body) = app.post("/analyze", analyze_body(Some(json!([])))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analysis"], "Prefer ```for i in range(n)``` over while.");
}

#[tokio::test]
async fn omitted_previous_weaknesses_come_from_the_ledger() {
    let app = common::create_test_app(ScriptedExecutor::constant(""));
    app.store
        .replace_weaknesses("learner-1", &["off-by-one".to_string()])
        .await
        .unwrap();
    app.oracle.reply(r#"{"analysis": "Fixed the loop bound.", "weaknesses": []}"#);

    let (status, body) = app.post("/analyze", analyze_body(None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(app.oracle.last_prompt().contains("- off-by-one"));
    // An empty verdict clears the ledger rather than leaving the old entries.
    assert_eq!(body["weaknesses"], json!([]));
    assert_eq!(app.store.get_weaknesses("learner-1").await.unwrap(), Some(vec![]));
}

#[tokio::test]
async fn malformed_reply_returns_raw_text_and_keeps_ledger() {
    let app = common::create_test_app(ScriptedExecutor::constant(""));
    app.store
        .replace_weaknesses("learner-1", &["recursion".to_string()])
        .await
        .unwrap();
    app.oracle.reply("Sure! Here is my analysis: the code looks fine.");

    let (status, body) = app.post("/analyze", analyze_body(None)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "malformed_oracle_response");
    assert_eq!(body["raw"], "Sure! Here is my analysis: the code looks fine.");
    assert_eq!(
        app.store.get_weaknesses("learner-1").await.unwrap(),
        Some(vec!["recursion".to_string()])
    );
}

#[tokio::test]
async fn ledger_write_failure_still_returns_analysis() {
    let app = common::create_test_app_with_store(
        ScriptedExecutor::constant(""),
        Arc::new(ReadOnlyLedgerStore::default()),
    );
    app.oracle.reply(r#"{"analysis": "Good.", "weaknesses": ["naming"]}"#);

    let (status, body) = app.post("/analyze", analyze_body(Some(json!([])))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["weaknesses"], json!(["naming"]));
    assert_eq!(body["persisted"], false);
}

#[tokio::test]
async fn analyze_requires_user_and_question() {
    let app = common::create_test_app(ScriptedExecutor::constant(""));

    let (status, body) = app
        .post("/analyze", json!({ "code": "x", "language": "python", "testResults": [] }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let msg = body["error"].as_str().unwrap();
    assert!(msg.contains("question"));
    assert!(msg.contains("user_id"));
    assert!(app.oracle.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn weakness_endpoint_reads_the_ledger() {
    let app = common::create_test_app(ScriptedExecutor::constant(""));

    let (status, body) = app.post("/weakness", json!({ "user_id": "nobody" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "weaknesses": [] }));

    app.store
        .replace_weaknesses("learner-1", &["edge case handling".to_string(), "recursion".to_string()])
        .await
        .unwrap();
    let (_, body) = app.post("/weakness", json!({ "user_id": "learner-1" })).await;
    assert_eq!(body["weaknesses"], json!(["edge case handling", "recursion"]));

    let (status, _) = app.post("/weakness", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
