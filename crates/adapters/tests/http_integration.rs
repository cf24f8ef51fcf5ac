use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use querydeck_adapters::http::HttpQueryBackend;
use querydeck_core::history::EntryStatus;
use querydeck_core::query_pipeline::{ConsoleState, QueryBackend, QueryPipeline};
use serde_json::{json, Value};

#[derive(Debug, Clone, Default)]
struct Recorded {
    executions: Arc<Mutex<Vec<Value>>>,
}

async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("stub server should run");
    });
    addr
}

async fn generate_users(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "json": {
            "query": { "select": ["id"], "prompt": body["prompt"] },
            "endpoint": "/users"
        }
    }))
}

async fn execute_users(State(recorded): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    recorded
        .executions
        .lock()
        .expect("executions lock")
        .push(body);
    Json(json!([{ "id": 1 }, { "id": 2 }]))
}

async fn generation_offline() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "generation offline")
}

async fn execution_rejected() -> (StatusCode, &'static str) {
    (StatusCode::BAD_GATEWAY, "datastore unreachable")
}

fn backend_for(addr: SocketAddr) -> HttpQueryBackend {
    HttpQueryBackend::new(format!("http://{addr}"), None).expect("client should build")
}

#[tokio::test(flavor = "current_thread")]
async fn generate_then_execute_over_http() {
    let recorded = Recorded::default();
    let router = Router::new()
        .route("/api/generate", post(generate_users))
        .route("/api/users", post(execute_users))
        .with_state(recorded.clone());
    let addr = spawn_server(router).await;

    let pipeline = QueryPipeline::new(backend_for(addr));
    let mut state = ConsoleState::new(16);
    let outcome = pipeline.run(&mut state, "list user ids").await;

    assert_eq!(outcome.status, EntryStatus::Success);
    let table = state.table.expect("rows should tabulate");
    assert_eq!(table.columns, vec!["id"]);
    assert_eq!(table.rows, vec![vec![json!(1)], vec![json!(2)]]);

    let executions = recorded.executions.lock().expect("executions lock").clone();
    assert_eq!(
        executions,
        vec![json!({ "select": ["id"], "prompt": "list user ids" })]
    );
}

#[tokio::test(flavor = "current_thread")]
async fn non_success_generation_skips_execution() {
    let recorded = Recorded::default();
    let router = Router::new()
        .route("/api/generate", post(generation_offline))
        .route("/api/users", post(execute_users))
        .with_state(recorded.clone());
    let addr = spawn_server(router).await;

    let pipeline = QueryPipeline::new(backend_for(addr));
    let mut state = ConsoleState::new(16);
    let outcome = pipeline.run(&mut state, "list user ids").await;

    assert_eq!(outcome.status, EntryStatus::Error);
    assert!(state.table.is_none());
    assert!(recorded.executions.lock().expect("executions lock").is_empty());
    let entry = state.history.last().expect("history entry");
    assert!(entry.result.contains("HTTP 500"));
    assert!(entry.result.contains("generation offline"));
}

#[tokio::test(flavor = "current_thread")]
async fn non_success_execution_reports_status_and_body() {
    let router = Router::new()
        .route("/api/generate", post(generate_users))
        .route("/api/users", post(execution_rejected));
    let addr = spawn_server(router).await;

    let backend = backend_for(addr);
    let err = backend
        .post_json("/api/users", &json!({}))
        .await
        .expect_err("502 should be an error");
    assert_eq!(err.status(), Some(502));
    assert!(err.to_string().contains("datastore unreachable"));

    let pipeline = QueryPipeline::new(backend);
    let mut state = ConsoleState::new(16);
    let outcome = pipeline.run(&mut state, "list user ids").await;
    assert_eq!(outcome.status, EntryStatus::Error);
    assert_eq!(state.history.len(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn unreachable_origin_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("listener address");
    drop(listener);

    let err = backend_for(addr)
        .post_json("/api/generate", &json!({ "prompt": "x" }))
        .await
        .expect_err("closed port should fail");
    assert_eq!(err.status(), None);
}
