//! HTTP edge behavior: envelopes, validation, auth roles, and the thin
//! wrappers over the core.

mod common;

use agentd::infrastructure::server::router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn empty_message_is_rejected_with_envelope() {
    let provider = ScriptedProvider::new(Vec::new());
    let h = harness(provider, Vec::new()).await;
    let app = router(h.state.clone());

    let response = app
        .oneshot(post_json("/api/chat", json!({"message": "   "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("message"));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn invalid_role_is_rejected() {
    let provider = ScriptedProvider::new(Vec::new());
    let h = harness(provider, Vec::new()).await;
    let app = router(h.state.clone());

    let response = app
        .oneshot(post_json(
            "/api/chat",
            json!({"message": "hi", "role": "superuser"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("invalid role"));
}

#[tokio::test]
async fn single_mode_chat_returns_timeline_in_envelope() {
    let provider = ScriptedProvider::new(vec![text_turn("Hi")]);
    let h = harness(provider, Vec::new()).await;
    let app = router(h.state.clone());

    let response = app
        .oneshot(post_json(
            "/api/chat",
            json!({"message": "Hello", "user_id": "alice"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    let data = &body["data"];
    assert_eq!(data["response"], "Hi");
    assert_eq!(data["mode"], "single");
    assert!(data["session_id"].is_string());
    assert_eq!(data["timeline"]["tool_calls"], json!([]));
    assert!(data.get("plan").is_none());
}

#[tokio::test]
async fn multi_mode_chat_includes_plan_and_review() {
    let provider = ScriptedProvider::new(vec![
        text_turn(r#"{"goal":"greet","complexity":"simple","estimated_tools":[],"steps":[{"step_no":1,"description":"answer"}]}"#),
        text_turn("Hi"),
        text_turn(r#"{"passed":true,"score":7,"feedback":"ok","issues":[],"suggestions":[]}"#),
    ]);
    let h = harness(provider, Vec::new()).await;
    let app = router(h.state.clone());

    let response = app
        .oneshot(post_json(
            "/api/chat",
            json!({"message": "Hello", "mode": "multi"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let data = &body["data"];
    assert_eq!(data["mode"], "multi");
    assert!(data["plan"]["steps"].as_array().unwrap().len() >= 1);
    let score = data["review"]["score"].as_u64().unwrap();
    assert!(score <= 10);
}

#[tokio::test]
async fn bearer_token_selects_the_caller_role() {
    let provider = ScriptedProvider::new(Vec::new());
    let (invoker, _) = RecordingInvoker::new(json!({}));
    let (admin_invoker, _) = RecordingInvoker::new(json!({}));
    let h = harness(
        provider,
        vec![
            (spec("everyone_tool", all_roles(), true), invoker),
            (
                spec("admin_tool", vec![agentd::domain::types::Role::Admin], true),
                admin_invoker,
            ),
        ],
    )
    .await;

    let app = router(h.state.clone());
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/tools")
                .header("authorization", "Bearer admin-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["role"], "admin");
    assert_eq!(body["data"]["tools"].as_array().unwrap().len(), 2);

    // No token falls back to readonly and hides the admin tool.
    let response = app.oneshot(get("/api/tools")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["role"], "readonly");
    assert_eq!(body["data"]["tools"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn permissions_endpoint_partitions_the_catalog() {
    let provider = ScriptedProvider::new(Vec::new());
    let (a, _) = RecordingInvoker::new(json!({}));
    let (b, _) = RecordingInvoker::new(json!({}));
    let h = harness(
        provider,
        vec![
            (spec("open_tool", all_roles(), true), a),
            (
                spec("locked_tool", vec![agentd::domain::types::Role::Admin], true),
                b,
            ),
        ],
    )
    .await;
    let app = router(h.state.clone());

    let response = app
        .clone()
        .oneshot(get("/api/permissions/readonly"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["allowed"], json!(["open_tool"]));
    assert_eq!(body["data"]["blocked"], json!(["locked_tool"]));

    let response = app.oneshot(get("/api/permissions/root")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_lifecycle_over_http() {
    let provider = ScriptedProvider::new(Vec::new());
    let h = harness(provider, Vec::new()).await;
    let app = router(h.state.clone());

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/sessions",
            json!({"user_id": "alice", "role": "operator"}),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["role"], "operator");
    let session_id = body["data"]["session_id"].as_str().unwrap().to_string();

    let response = app.clone().oneshot(get("/api/sessions")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["sessions"].as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/sessions/{session_id}")))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["message_count"], 0);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/sessions/{session_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get(&format!("/api/sessions/{session_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_llm_availability() {
    let provider = ScriptedProvider::new(Vec::new());
    let h = harness(provider, Vec::new()).await;
    let app = router(h.state.clone());

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["llm_available"], true);
    assert_eq!(body["data"]["llm_models"], json!(["scripted"]));
}

#[tokio::test]
async fn metrics_snapshot_and_reset_round_trip() {
    let provider = ScriptedProvider::new(vec![text_turn("ok")]);
    let h = harness(provider, Vec::new()).await;
    let app = router(h.state.clone());

    app.clone()
        .oneshot(post_json("/api/chat", json!({"message": "hello"})))
        .await
        .unwrap();

    let response = app.clone().oneshot(get("/api/metrics")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["total_requests"], 1);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/api/metrics")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["total_requests"], 0);
}

#[tokio::test]
async fn mcp_server_registration_validates_input() {
    let provider = ScriptedProvider::new(Vec::new());
    let h = harness(provider, Vec::new()).await;
    let app = router(h.state.clone());

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/mcp/servers",
            json!({"name": "", "command": ""}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.oneshot(get("/api/mcp/servers")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["servers"], json!([]));
}
