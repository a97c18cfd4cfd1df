#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};

/// Behaviour knobs for the in-process cart API.
#[derive(Clone, Debug)]
pub struct StubApi {
    pub cookies: bool,
    pub add_error: Option<&'static str>,
}

impl Default for StubApi {
    fn default() -> Self {
        Self { cookies: true, add_error: None }
    }
}

#[derive(Clone)]
struct StubState {
    options: StubApi,
    platform: Arc<Mutex<String>>,
}

impl StubState {
    fn platform(&self) -> String {
        self.platform.lock().expect("platform lock").clone()
    }
}

/// Serves the cart API on a background thread with its own runtime; returns the base URL.
pub fn spawn_stub_api(options: StubApi) -> String {
    let (address_tx, address_rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("stub runtime");
        runtime.block_on(async move {
            let listener =
                tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub listener");
            address_tx.send(listener.local_addr().expect("stub address")).expect("send address");
            axum::serve(listener, router(options)).await.expect("stub server");
        });
    });
    format!("http://{}", address_rx.recv().expect("stub address"))
}

/// A base URL nothing listens on.
pub fn unreachable_api() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
    let address = listener.local_addr().expect("probe address");
    drop(listener);
    format!("http://{address}")
}

fn router(options: StubApi) -> Router {
    let state = StubState { options, platform: Arc::new(Mutex::new("motonet".to_string())) };
    Router::new()
        .route("/health", get(health))
        .route("/api/switch-platform", post(switch_platform))
        .route("/api/add-to-cart", post(add_to_cart))
        .route("/api/cart/url", get(cart_url))
        .with_state(state)
}

async fn health(State(state): State<StubState>) -> Json<Value> {
    let platform = state.platform();
    let mut cookies = Map::new();
    cookies.insert(platform.clone(), Value::Bool(state.options.cookies));
    Json(json!({ "currentPlatform": platform, "cookieStatus": cookies }))
}

async fn switch_platform(
    State(state): State<StubState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    match body["platform"].as_str() {
        Some(platform @ ("motonet" | "rusta")) => {
            *state.platform.lock().expect("platform lock") = platform.to_string();
            (StatusCode::OK, Json(json!({ "currentPlatform": platform })))
        }
        _ => (StatusCode::BAD_REQUEST, Json(json!({ "error": "unsupported platform" }))),
    }
}

async fn add_to_cart(State(state): State<StubState>) -> (StatusCode, Json<Value>) {
    match state.options.add_error {
        Some(error) => (StatusCode::OK, Json(json!({ "success": false, "error": error }))),
        None => (StatusCode::OK, Json(json!({ "success": true }))),
    }
}

async fn cart_url(Query(params): Query<std::collections::HashMap<String, String>>) -> Json<Value> {
    let platform = params.get("platform").cloned().unwrap_or_default();
    Json(json!({ "cartUrl": format!("https://{platform}.example/cart") }))
}
