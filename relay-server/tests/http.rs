//! End-to-end HTTP tests: a real listener in front of the relay, wiremock in
//! place of the generative API.

use std::net::SocketAddr;
use std::sync::Arc;

use placement_core::config::UpstreamConfig;
use placement_core::gemini::GeminiClient;
use placement_core::store::{read_records, JsonlStore, ResultStore};
use placement_core::{Relay, TestSession};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

async fn spawn(relay: Relay) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = placement_relay::app(Arc::new(relay), 16 * 1024);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

async fn upstream_replying(text: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        })))
        .mount(&server)
        .await;
    server
}

fn gemini(server: &MockServer) -> Arc<GeminiClient> {
    let cfg = UpstreamConfig {
        base_url: server.uri(),
        ..Default::default()
    };
    Arc::new(GeminiClient::new(&cfg, "k".to_string()).expect("client"))
}

#[tokio::test]
async fn analyse_returns_parsed_json() {
    let upstream = upstream_replying("Sure! ```json\n{\"clarityScore\": 8}\n```").await;
    let addr = spawn(Relay::new(Some(gemini(&upstream)), None)).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/analyse"))
        .json(&json!({ "prompt": "score my speech", "kind": "speaking" }))
        .send()
        .await
        .expect("send");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body, json!({ "clarityScore": 8 }));
}

#[tokio::test]
async fn browser_payload_is_forwarded() {
    let upstream = upstream_replying("[{\"question\":\"Q\",\"options\":[\"a\",\"b\",\"c\",\"d\"],\"correct\":2}]").await;
    let addr = spawn(Relay::new(Some(gemini(&upstream)), None)).await;

    let payload = json!({
        "contents": [{ "role": "user", "parts": [{ "text": "write one question" }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": { "type": "ARRAY" }
        }
    });
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/analyse"))
        .json(&payload)
        .send()
        .await
        .expect("send");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body[0]["correct"], 2);
}

#[tokio::test]
async fn extraction_failure_is_single_error_message() {
    let upstream = upstream_replying("I cannot evaluate this.").await;
    let addr = spawn(Relay::new(Some(gemini(&upstream)), None)).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/analyse"))
        .json(&json!({ "prompt": "score" }))
        .send()
        .await
        .expect("send");
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.expect("json");
    let obj = body.as_object().expect("object");
    assert_eq!(obj.len(), 1);
    assert!(obj["error"].as_str().unwrap().contains("no JSON found"));
}

#[tokio::test]
async fn missing_key_is_500_and_bad_body_is_400() {
    let addr = spawn(Relay::new(None, None)).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/analyse"))
        .json(&json!({ "prompt": "score" }))
        .send()
        .await
        .expect("send");
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["error"], "API key is not configured on the server.");

    let resp = client
        .post(format!("http://{addr}/analyse"))
        .body("not json")
        .send()
        .await
        .expect("send");
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn non_post_is_method_not_allowed() {
    let addr = spawn(Relay::new(None, None)).await;
    let resp = reqwest::get(format!("http://{addr}/analyse"))
        .await
        .expect("send");
    assert_eq!(resp.status(), 405);

    let resp = reqwest::get(format!("http://{addr}/healthz"))
        .await
        .expect("send");
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn save_appends_to_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store_path = dir.path().join("results.jsonl");
    let store: Arc<dyn ResultStore> = Arc::new(JsonlStore::new(&store_path));
    let addr = spawn(Relay::new(None, Some(store))).await;

    let results = TestSession::start(
        placement_core::StudentDetails {
            name: "Asha".to_string(),
            ..Default::default()
        },
        vec![],
    )
    .finish();
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/save"))
        .json(&results)
        .send()
        .await
        .expect("send");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("json");
    let id = body["id"].as_str().expect("id").to_string();

    let records = read_records(&store_path).await.expect("read");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, id);
    assert_eq!(records[0].results.student.name, "Asha");
}

#[tokio::test]
async fn save_without_store_is_503() {
    let addr = spawn(Relay::new(None, None)).await;
    let results = TestSession::start(Default::default(), vec![]).finish();
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/save"))
        .json(&results)
        .send()
        .await
        .expect("send");
    assert_eq!(resp.status(), 503);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let addr = spawn(Relay::new(None, None)).await;
    let prompt = "x".repeat(32 * 1024);
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/analyse"))
        .json(&json!({ "prompt": prompt }))
        .send()
        .await
        .expect("send");
    assert_eq!(resp.status(), 413);
}
