//! Integration tests for the poll-and-relay task and its health endpoint.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use courier::config::{ForwardConfig, RelayEndpoints};
use courier::error::{RelayError, RelayStage};
use courier::health::{STATUS_ACTIVE, STATUS_INACTIVE, STATUS_UNCONFIGURED};
use courier::relay::{self, CycleOutcome, RelayContext, TaskStatus};
use courier::server::{self, RelayState};

const SOURCE_KEY: &str = "source-key";
const DEST_KEY: &str = "dest-key";

#[derive(Clone)]
struct Mock {
    source_status: StatusCode,
    source_body: String,
    source_delay: Duration,
    dest_status: StatusCode,
    fetch_keys: Arc<Mutex<Vec<Option<String>>>>,
    posts: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

impl Mock {
    fn new(source_body: Value) -> Self {
        Self {
            source_status: StatusCode::OK,
            source_body: source_body.to_string(),
            source_delay: Duration::ZERO,
            dest_status: StatusCode::OK,
            fetch_keys: Arc::default(),
            posts: Arc::default(),
        }
    }

    fn posts(&self) -> Vec<(Option<String>, Value)> {
        self.posts.lock().unwrap().clone()
    }
}

fn key_param(uri: &Uri) -> Option<String> {
    url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
        .find(|(name, _)| name == "key")
        .map(|(_, value)| value.into_owned())
}

async fn source(State(mock): State<Mock>, uri: Uri) -> (StatusCode, String) {
    mock.fetch_keys.lock().unwrap().push(key_param(&uri));
    tokio::time::sleep(mock.source_delay).await;
    (mock.source_status, mock.source_body.clone())
}

async fn destination(State(mock): State<Mock>, uri: Uri, Json(body): Json<Value>) -> StatusCode {
    mock.posts.lock().unwrap().push((key_param(&uri), body));
    mock.dest_status
}

async fn start_mock(mock: Mock) -> SocketAddr {
    let router = Router::new()
        .route("/api/message", get(source))
        .route("/send", post(destination))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn relay_config(addr: SocketAddr, interval: Duration) -> ForwardConfig {
    ForwardConfig {
        target_base_url: None,
        source_api_url: Some(format!("http://{addr}/api/message")),
        source_api_key: Some(SOURCE_KEY.into()),
        dest_api_url: Some(format!("http://{addr}/send")),
        dest_api_key: Some(DEST_KEY.into()),
        poll_interval: interval,
    }
}

async fn context_for(mock: &Mock) -> RelayContext {
    let addr = start_mock(mock.clone()).await;
    let config = relay_config(addr, Duration::from_secs(60));
    let endpoints = RelayEndpoints::from_config(&config).unwrap().unwrap();
    RelayContext::new(server::build_http_client(None), endpoints)
}

#[tokio::test]
async fn message_is_posted_exactly_once() {
    let mock = Mock::new(json!({
        "success": true,
        "data": {"id": "42", "title": "T", "content": "C"}
    }));
    let ctx = context_for(&mock).await;

    let outcome = relay::run_cycle(&ctx).await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Forwarded {
            id: Some("42".into()),
            status: 200
        }
    );

    let posts = mock.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].0.as_deref(), Some(DEST_KEY));
    assert_eq!(posts[0].1, json!({"title": "T", "content": "C"}));
    assert_eq!(
        mock.fetch_keys.lock().unwrap().as_slice(),
        &[Some(SOURCE_KEY.to_string())]
    );
}

#[tokio::test]
async fn missing_title_gets_placeholder() {
    let mock = Mock::new(json!({"success": true, "data": {"content": "body only"}}));
    let ctx = context_for(&mock).await;

    relay::run_cycle(&ctx).await.unwrap();

    let posts = mock.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].1, json!({"title": "no title", "content": "body only"}));
}

#[tokio::test]
async fn null_data_posts_nothing() {
    let mock = Mock::new(json!({"success": true, "data": null}));
    let ctx = context_for(&mock).await;

    let outcome = relay::run_cycle(&ctx).await.unwrap();
    assert_eq!(outcome, CycleOutcome::NoMessage);
    assert!(mock.posts().is_empty());
}

#[tokio::test]
async fn message_without_content_posts_nothing() {
    let mock = Mock::new(json!({"success": true, "data": {"id": "7"}}));
    let ctx = context_for(&mock).await;

    let outcome = relay::run_cycle(&ctx).await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Incomplete {
            id: Some("7".into())
        }
    );
    assert!(mock.posts().is_empty());
}

#[tokio::test]
async fn unsuccessful_response_is_bad_response() {
    let mock = Mock::new(json!({"success": false, "error": "quota exceeded"}));
    let ctx = context_for(&mock).await;

    let err = relay::run_cycle(&ctx).await.unwrap_err();
    match err {
        RelayError::UpstreamBadResponse { raw } => assert!(raw.contains("quota exceeded")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(mock.posts().is_empty());
}

#[tokio::test]
async fn source_error_status_fails_fetch() {
    let mut mock = Mock::new(json!({"success": true, "data": null}));
    mock.source_status = StatusCode::INTERNAL_SERVER_ERROR;
    let ctx = context_for(&mock).await;

    let err = relay::run_cycle(&ctx).await.unwrap_err();
    assert!(matches!(
        err,
        RelayError::Status {
            stage: RelayStage::Fetch,
            status: StatusCode::INTERNAL_SERVER_ERROR,
            ..
        }
    ));
    assert!(mock.posts().is_empty());
}

#[tokio::test]
async fn slow_source_times_out() {
    let mut mock = Mock::new(json!({"success": true, "data": null}));
    mock.source_delay = Duration::from_secs(2);
    let mut ctx = context_for(&mock).await;
    ctx.fetch_timeout = Duration::from_millis(200);

    let err = relay::run_cycle(&ctx).await.unwrap_err();
    assert!(matches!(
        err,
        RelayError::Timeout {
            stage: RelayStage::Fetch,
            ..
        }
    ));
}

#[tokio::test]
async fn destination_failure_is_not_retried() {
    let mut mock = Mock::new(json!({
        "success": true,
        "data": {"id": "42", "title": "T", "content": "C"}
    }));
    mock.dest_status = StatusCode::SERVICE_UNAVAILABLE;
    let ctx = context_for(&mock).await;

    let err = relay::run_cycle(&ctx).await.unwrap_err();
    assert!(matches!(
        err,
        RelayError::Status {
            stage: RelayStage::Forward,
            status: StatusCode::SERVICE_UNAVAILABLE,
            ..
        }
    ));
    assert_eq!(mock.posts().len(), 1);
}

#[tokio::test]
async fn poll_loop_runs_until_shutdown() {
    let mock = Mock::new(json!({
        "success": true,
        "data": {"id": "1", "title": "T", "content": "C"}
    }));
    let addr = start_mock(mock.clone()).await;
    let config = relay_config(addr, Duration::from_secs(1));

    let status = TaskStatus::new();
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = relay::spawn(&config, server::build_http_client(None), &status, shutdown_rx)
        .unwrap()
        .expect("relay should start when configured");
    assert!(status.is_alive());

    // Nothing is fetched before the first interval elapses
    assert!(mock.posts().is_empty());

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while mock.posts().is_empty() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(!mock.posts().is_empty());

    let _ = shutdown_tx.send(true);
    handle.await.unwrap();
    assert!(!status.is_alive());
}

#[tokio::test]
async fn failing_cycles_do_not_stop_the_loop() {
    let mut mock = Mock::new(json!({"success": true, "data": null}));
    mock.source_status = StatusCode::BAD_GATEWAY;
    let addr = start_mock(mock.clone()).await;
    let config = relay_config(addr, Duration::from_secs(1));

    let status = TaskStatus::new();
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = relay::spawn(&config, server::build_http_client(None), &status, shutdown_rx)
        .unwrap()
        .unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(6);
    while mock.fetch_keys.lock().unwrap().len() < 2 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(mock.fetch_keys.lock().unwrap().len() >= 2);
    assert!(status.is_alive());

    let _ = shutdown_tx.send(true);
    handle.await.unwrap();
}

async fn start_relay_health(config: ForwardConfig, task: TaskStatus) -> SocketAddr {
    let state = Arc::new(RelayState {
        config: Arc::new(config),
        task,
    });
    let router = server::build_relay_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn health_reports_active_scheduler() {
    let mock = Mock::new(json!({"success": true, "data": null}));
    let mock_addr = start_mock(mock).await;
    let config = relay_config(mock_addr, Duration::from_secs(60));

    let task = TaskStatus::new();
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = relay::spawn(&config, server::build_http_client(None), &task, shutdown_rx)
        .unwrap()
        .unwrap();

    let addr = start_relay_health(config, task).await;
    let resp = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), STATUS_ACTIVE);

    let _ = shutdown_tx.send(true);
    handle.await.unwrap();

    let resp = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(resp.status(), 500);
    assert_eq!(resp.text().await.unwrap(), STATUS_INACTIVE);
}

#[tokio::test]
async fn health_reports_unconfigured() {
    let addr = start_relay_health(ForwardConfig::default(), TaskStatus::new()).await;

    let resp = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(resp.status(), 503);
    assert_eq!(resp.text().await.unwrap(), STATUS_UNCONFIGURED);
}
