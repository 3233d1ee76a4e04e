//! HTTP API tests against a server started in-process.

use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

use solace::config::Config;
use solace::server::run_server;

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

async fn start_server(cfg: Config) -> (tokio::task::JoinHandle<()>, String) {
    let port = find_free_port();
    let mut cfg = cfg;
    cfg.server.bind = format!("127.0.0.1:{}", port);

    let handle = tokio::spawn(async move {
        run_server(&cfg).await.ok();
    });
    wait_for_server(port).await;
    (handle, format!("http://127.0.0.1:{}", port))
}

async fn send(client: &reqwest::Client, base: &str, id: &str, text: &str) -> Value {
    let resp = client
        .post(format!("{}/sessions/{}/messages", base, id))
        .json(&json!({ "text": text }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn test_health_reports_version() {
    let (server, base) = start_server(Config::minimal()).await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["external_responder"], false);
    server.abort();
}

#[tokio::test]
async fn test_conversation_over_http() {
    let (server, base) = start_server(Config::minimal()).await;
    let client = reqwest::Client::new();

    let first = send(&client, &base, "abc", "hello").await;
    assert_eq!(first["kind"], "welcome");
    assert!(first.get("notice").is_none());

    let second = send(&client, &base, "abc", "I'm so stressed about my exam").await;
    assert_eq!(second["kind"], "composed");
    assert!(second["reply"].as_str().unwrap().contains("academics"));

    let third = send(&client, &base, "abc", "thanks").await;
    assert_eq!(third["kind"], "gratitude");

    let state: Value = client
        .get(format!("{}/sessions/abc/state", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(state["greeting_sent"], true);
    assert_eq!(state["depth"], 1);
    assert_eq!(state["turn_count"], 3);

    let transcript: Value = client
        .get(format!("{}/sessions/abc/transcript", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entries = transcript["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 6);
    assert_eq!(entries[0]["role"], "user");
    assert_eq!(entries[1]["role"], "assistant");

    server.abort();
}

#[tokio::test]
async fn test_reset_endpoint() {
    let (server, base) = start_server(Config::minimal()).await;
    let client = reqwest::Client::new();

    send(&client, &base, "r", "hi").await;
    send(&client, &base, "r", "I can't sleep").await;

    let resp = client
        .post(format!("{}/sessions/r/reset", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let again = send(&client, &base, "r", "I can't sleep").await;
    assert_eq!(again["kind"], "welcome");

    server.abort();
}

#[tokio::test]
async fn test_end_session_endpoint() {
    let (server, base) = start_server(Config::minimal()).await;
    let client = reqwest::Client::new();

    send(&client, &base, "gone", "hi").await;
    send(&client, &base, "gone", "I feel so alone").await;

    let resp = client
        .delete(format!("{}/sessions/gone", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ended"], true);

    let state = client
        .get(format!("{}/sessions/gone/state", base))
        .send()
        .await
        .unwrap();
    assert_eq!(state.status(), 404);

    let twice = client
        .delete(format!("{}/sessions/gone", base))
        .send()
        .await
        .unwrap();
    assert_eq!(twice.status(), 404);

    // Same id starts fresh
    let again = send(&client, &base, "gone", "I feel so alone").await;
    assert_eq!(again["kind"], "welcome");

    server.abort();
}

#[tokio::test]
async fn test_error_contract() {
    let (server, base) = start_server(Config::minimal()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/sessions/x/messages", base))
        .json(&json!({ "text": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    for url in [
        format!("{}/sessions/ghost/transcript", base),
        format!("{}/sessions/ghost/state", base),
    ] {
        let resp = client.get(url).send().await.unwrap();
        assert_eq!(resp.status(), 404);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "not_found");
    }

    let resp = client
        .post(format!("{}/sessions/ghost/reset", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    server.abort();
}

#[tokio::test]
async fn test_dataset_provider_over_http() {
    let tmp = TempDir::new().unwrap();
    let kb = tmp.path().join("kb.json");
    fs::write(
        &kb,
        r#"[{"question": "How do I fall asleep faster?", "answer": "Keep a regular bedtime."}]"#,
    )
    .unwrap();

    let mut cfg = Config::minimal();
    cfg.responder.provider = "dataset".to_string();
    cfg.knowledge.path = Some(kb);

    let (server, base) = start_server(cfg).await;
    let client = reqwest::Client::new();

    send(&client, &base, "d", "hey").await;
    let reply = send(&client, &base, "d", "how do I fall asleep faster").await;
    assert_eq!(reply["kind"], "external");
    assert_eq!(reply["reply"], "Keep a regular bedtime.");

    server.abort();
}
