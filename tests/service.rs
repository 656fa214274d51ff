//! End-to-end tests: startup against a file-backed store and a live server
//! driven over real HTTP.

use std::path::PathBuf;

use obsdemo::app::{init_state, serve};
use obsdemo::metrics::{sample_value, METRIC_REQUESTS_TOTAL};
use obsdemo::store::SEED_MESSAGES;
use obsdemo::Config;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_test::assert_ok;

/// Per-test database file under the system temp directory.
struct TempDb {
    path: PathBuf,
}

impl TempDb {
    fn new() -> Self {
        let path = std::env::temp_dir().join(format!("obsdemo-{}.db", uuid::Uuid::new_v4()));
        Self { path }
    }

    fn config(&self) -> Config {
        Config {
            database_url: format!("sqlite://{}?mode=rwc", self.path.display()),
            database_max_connections: 2,
            ..Config::default()
        }
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.path.display(), suffix));
        }
    }
}

#[tokio::test]
async fn first_startup_seeds_ten_messages_and_restart_adds_none() {
    let db = TempDb::new();

    let state = assert_ok!(init_state(&db.config()).await);
    assert_eq!(state.store.count().await.unwrap(), 10);
    for (idx, (text, author)) in SEED_MESSAGES.iter().enumerate() {
        let msg = state.store.get_by_id(idx as i64 + 1).await.unwrap().unwrap();
        assert_eq!((msg.text.as_str(), msg.author.as_str()), (*text, *author));
    }
    let first_created = state.store.get_by_id(1).await.unwrap().unwrap().created_at;
    state.store.close().await;

    let restarted = assert_ok!(init_state(&db.config()).await);
    assert_eq!(restarted.store.count().await.unwrap(), 10);
    assert!(restarted.store.get_by_id(11).await.unwrap().is_none());
    assert_eq!(
        restarted.store.get_by_id(1).await.unwrap().unwrap().created_at,
        first_created
    );
    restarted.store.close().await;
}

#[tokio::test]
async fn startup_rejects_invalid_config() {
    let config = Config {
        database_max_connections: 0,
        ..Config::default()
    };

    assert!(init_state(&config).await.is_err());
}

#[tokio::test]
async fn live_server_serves_every_endpoint() {
    let db = TempDb::new();
    let state = init_state(&db.config()).await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(serve(listener, state, async {
        let _ = stop_rx.await;
    }));

    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health, json!({ "status": "ok" }));

    let mut ids = Vec::new();
    for _ in 0..3 {
        let resp = client
            .post(format!("{base}/process"))
            .json(&json!({ "data": "hello world", "priority": 4 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["result"], "processed-4");
        assert_eq!(body["data_length"], 11);
        ids.push(body["request_id"].as_str().unwrap().to_owned());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);

    let rejected = client
        .post(format!("{base}/process"))
        .json(&json!({ "data": "", "priority": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), 422);

    let msg: Value = client
        .get(format!("{base}/message/4"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(msg["id"], 4);
    assert_eq!(msg["text"], SEED_MESSAGES[3].0);

    let missing = client
        .get(format!("{base}/message/9999"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
    let missing: Value = missing.json().await.unwrap();
    assert_eq!(missing["detail"], "Message not found");

    let exposition = client
        .get(format!("{base}/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(
        sample_value(
            &exposition,
            METRIC_REQUESTS_TOTAL,
            &["method=\"POST\"", "endpoint=\"/process\"", "status=\"200\""]
        ),
        Some(3.0)
    );
    assert_eq!(
        sample_value(
            &exposition,
            METRIC_REQUESTS_TOTAL,
            &["endpoint=\"/process\"", "status=\"422\""]
        ),
        Some(1.0)
    );
    assert_eq!(
        sample_value(&exposition, "app_process_duration_seconds_count", &[]),
        Some(3.0)
    );

    drop(client);
    stop_tx.send(()).unwrap();
    assert_ok!(server.await.unwrap());
}
