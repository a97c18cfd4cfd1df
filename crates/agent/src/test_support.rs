use std::collections::VecDeque;

use async_trait::async_trait;
use cartchat_core::api::{
    AddToCartReply, AddToCartRequest, AddToCartResponse, CartApi, HealthReport,
};
use cartchat_core::domain::product::Platform;
use cartchat_core::errors::ApiError;
use serde_json::{json, Value};
use tokio::sync::Mutex;

/// Cart API fake that replays queued replies and records what it was asked.
///
/// Unscripted add-to-cart calls succeed; unscripted cart-url calls fail.
#[derive(Default)]
pub(crate) struct ScriptedCartApi {
    state: Mutex<ScriptedState>,
}

#[derive(Default)]
struct ScriptedState {
    add_replies: VecDeque<Result<AddToCartReply, ApiError>>,
    add_requests: Vec<AddToCartRequest>,
    cart_url: Option<String>,
    cart_url_calls: usize,
}

impl ScriptedCartApi {
    pub(crate) fn reply(http_ok: bool, raw: Value) -> AddToCartReply {
        let body: AddToCartResponse = serde_json::from_value(raw.clone()).unwrap_or_default();
        AddToCartReply { http_ok, body, raw }
    }

    pub(crate) async fn push_add_reply(&self, reply: Result<AddToCartReply, ApiError>) {
        self.state.lock().await.add_replies.push_back(reply);
    }

    pub(crate) async fn set_cart_url(&self, url: &str) {
        self.state.lock().await.cart_url = Some(url.to_owned());
    }

    pub(crate) async fn add_calls(&self) -> usize {
        self.state.lock().await.add_requests.len()
    }

    pub(crate) async fn add_requests(&self) -> Vec<AddToCartRequest> {
        self.state.lock().await.add_requests.clone()
    }

    pub(crate) async fn cart_url_calls(&self) -> usize {
        self.state.lock().await.cart_url_calls
    }
}

#[async_trait]
impl CartApi for ScriptedCartApi {
    async fn health(&self) -> Result<HealthReport, ApiError> {
        Ok(HealthReport::default())
    }

    async fn switch_platform(&self, platform: &Platform) -> Result<Platform, ApiError> {
        Ok(platform.clone())
    }

    async fn add_to_cart(&self, request: &AddToCartRequest) -> Result<AddToCartReply, ApiError> {
        let mut state = self.state.lock().await;
        state.add_requests.push(request.clone());
        state
            .add_replies
            .pop_front()
            .unwrap_or_else(|| Ok(Self::reply(true, json!({ "success": true }))))
    }

    async fn cart_url(&self, _platform: &Platform) -> Result<String, ApiError> {
        let mut state = self.state.lock().await;
        state.cart_url_calls += 1;
        state.cart_url.clone().ok_or_else(|| ApiError::Status {
            endpoint: "api/cart/url".to_owned(),
            status: 404,
            body: "no cart".to_owned(),
        })
    }
}
