//! REST backend tests against an in-process mock of the command proxy.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use store::{RestConfig, RestSetStore, SetStore, StoreError};

const TOKEN: &str = "proxy-token";
const KEY: &str = "global_fingerprints";

#[derive(Default)]
struct Proxy {
    sets: Mutex<HashMap<String, HashSet<String>>>,
    commands: Mutex<Vec<String>>,
    requests: AtomicUsize,
    /// Members whose SISMEMBER answers 500.
    failing: Mutex<HashSet<String>>,
}

async fn handle(
    State(proxy): State<Arc<Proxy>>,
    headers: HeaderMap,
    Json(command): Json<Vec<String>>,
) -> (StatusCode, Json<Value>) {
    proxy.requests.fetch_add(1, Ordering::SeqCst);
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"));
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Unauthorized"})),
        );
    }

    let name = command.first().cloned().unwrap_or_default().to_uppercase();
    proxy.commands.lock().unwrap().push(name.clone());
    let mut sets = proxy.sets.lock().unwrap();

    match (name.as_str(), command.as_slice()) {
        ("PING", _) => (StatusCode::OK, Json(json!({"result": "PONG"}))),
        ("SISMEMBER", [_, _, member]) if proxy.failing.lock().unwrap().contains(member) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "ERR backend timeout"})),
        ),
        ("SISMEMBER", [_, key, member]) => {
            let found = sets.get(key).is_some_and(|s| s.contains(member));
            (StatusCode::OK, Json(json!({"result": found as i64})))
        }
        ("SADD", [_, key, members @ ..]) => {
            let set = sets.entry(key.clone()).or_default();
            let added = members.iter().filter(|m| set.insert((*m).clone())).count();
            (StatusCode::OK, Json(json!({"result": added})))
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "ERR unknown command"})),
        ),
    }
}

async fn spawn_proxy() -> (Arc<Proxy>, String) {
    let proxy = Arc::new(Proxy::default());
    let app = Router::new()
        .route("/", post(handle))
        .with_state(proxy.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (proxy, format!("http://{addr}"))
}

fn fps(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn ping_succeeds_with_valid_token() {
    let (_proxy, url) = spawn_proxy().await;
    let store = RestSetStore::new(&RestConfig::new(url, TOKEN)).unwrap();
    store.ping().await.unwrap();
}

#[tokio::test]
async fn membership_costs_one_request_per_member() {
    let (proxy, url) = spawn_proxy().await;
    let store = RestSetStore::new(&RestConfig::new(url, TOKEN)).unwrap();

    let batch = fps(&["h1", "h2", "h3", "h4"]);
    let flags = store.check_membership(KEY, &batch).await.unwrap();
    assert_eq!(flags, vec![false; 4]);
    assert_eq!(proxy.requests.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn add_is_a_single_request_and_visible_afterwards() {
    let (proxy, url) = spawn_proxy().await;
    let store = RestSetStore::new(&RestConfig::new(url, TOKEN)).unwrap();

    store.add_members(KEY, &fps(&["h1", "h3"])).await.unwrap();
    assert_eq!(*proxy.commands.lock().unwrap(), vec!["SADD".to_string()]);

    let flags = store
        .check_membership(KEY, &fps(&["h1", "h2", "h3"]))
        .await
        .unwrap();
    assert_eq!(flags, vec![true, false, true]);
}

#[tokio::test]
async fn empty_add_makes_no_request() {
    let (proxy, url) = spawn_proxy().await;
    let store = RestSetStore::new(&RestConfig::new(url, TOKEN)).unwrap();

    store.add_members(KEY, &[]).await.unwrap();
    assert!(store.check_membership(KEY, &[]).await.unwrap().is_empty());
    assert_eq!(proxy.requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn order_is_preserved_with_many_in_flight() {
    let (_proxy, url) = spawn_proxy().await;
    let mut cfg = RestConfig::new(url, TOKEN);
    cfg.max_in_flight = 8;
    let store = RestSetStore::new(&cfg).unwrap();

    let stored: Vec<String> = (0..40).filter(|i| i % 3 == 0).map(|i| format!("fp-{i}")).collect();
    store.add_members(KEY, &stored).await.unwrap();

    let batch: Vec<String> = (0..40).map(|i| format!("fp-{i}")).collect();
    let flags = store.check_membership(KEY, &batch).await.unwrap();
    let expected: Vec<bool> = (0..40).map(|i| i % 3 == 0).collect();
    assert_eq!(flags, expected);
}

#[tokio::test]
async fn bad_token_is_a_protocol_error() {
    let (_proxy, url) = spawn_proxy().await;
    let store = RestSetStore::new(&RestConfig::new(url, "wrong-token")).unwrap();

    let err = store.check_membership(KEY, &fps(&["h1"])).await.unwrap_err();
    assert!(matches!(err, StoreError::Protocol(_)), "got {err:?}");
    assert!(!err.is_unavailable());
}

#[tokio::test]
async fn unreachable_proxy_is_unavailable() {
    // Bind then drop to get a port with no listener.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut cfg = RestConfig::new(format!("http://{addr}"), TOKEN);
    cfg.timeout_ms = 500;
    let store = RestSetStore::new(&cfg).unwrap();

    let err = store.check_membership(KEY, &fps(&["h1"])).await.unwrap_err();
    assert!(err.is_unavailable(), "got {err:?}");
    assert!(store.ping().await.unwrap_err().is_unavailable());
}

#[tokio::test]
async fn failure_mid_batch_fails_the_whole_check() {
    let (proxy, url) = spawn_proxy().await;
    proxy.failing.lock().unwrap().insert("bad".to_string());
    let store = RestSetStore::new(&RestConfig::new(url, TOKEN)).unwrap();

    let err = store
        .check_membership(KEY, &fps(&["a", "bad", "c"]))
        .await
        .unwrap_err();
    assert!(err.is_unavailable(), "got {err:?}");
    assert!(!proxy.commands.lock().unwrap().contains(&"SADD".to_string()));
}
