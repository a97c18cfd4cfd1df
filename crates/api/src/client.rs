use async_trait::async_trait;
use cartchat_core::api::{
    AddToCartReply, AddToCartRequest, AddToCartResponse, CartApi, CartUrlResponse, HealthReport,
    SwitchPlatformRequest, SwitchPlatformResponse, ADD_TO_CART_PATH, CART_URL_PATH, HEALTH_PATH,
    SWITCH_PLATFORM_PATH,
};
use cartchat_core::config::{join_url, ApiConfig};
use cartchat_core::domain::product::Platform;
use cartchat_core::errors::ApiError;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// reqwest-backed [`CartApi`] talking JSON to the cart API server.
#[derive(Clone, Debug)]
pub struct HttpCartApi {
    client: Client,
    base_url: String,
}

impl HttpCartApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.normalized_base_url())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    async fn send(&self, path: &str, request: RequestBuilder) -> Result<Response, ApiError> {
        debug!(event_name = "api.request.sent", endpoint = path, "calling cart api");
        request.send().await.map_err(|error| ApiError::Request {
            endpoint: path.to_string(),
            message: error.to_string(),
        })
    }

    /// Sends `request` and decodes a 2xx JSON body; any other status is an error.
    async fn send_json<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send(path, request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        response.json::<T>().await.map_err(|error| ApiError::Decode {
            endpoint: path.to_string(),
            message: error.to_string(),
        })
    }
}

#[async_trait]
impl CartApi for HttpCartApi {
    async fn health(&self) -> Result<HealthReport, ApiError> {
        self.send_json(HEALTH_PATH, self.client.get(self.url(HEALTH_PATH))).await
    }

    async fn switch_platform(&self, platform: &Platform) -> Result<Platform, ApiError> {
        let body = SwitchPlatformRequest { platform: platform.clone() };
        let request = self.client.post(self.url(SWITCH_PLATFORM_PATH)).json(&body);
        let response: SwitchPlatformResponse =
            self.send_json(SWITCH_PLATFORM_PATH, request).await?;
        Ok(response.current_platform)
    }

    async fn add_to_cart(&self, request: &AddToCartRequest) -> Result<AddToCartReply, ApiError> {
        let builder = self.client.post(self.url(ADD_TO_CART_PATH)).json(request);
        let response = self.send(ADD_TO_CART_PATH, builder).await?;
        let http_ok = response.status().is_success();

        let bytes = response.bytes().await.map_err(|error| ApiError::Request {
            endpoint: ADD_TO_CART_PATH.to_string(),
            message: error.to_string(),
        })?;
        let raw: Value = serde_json::from_slice(&bytes).map_err(|error| ApiError::Decode {
            endpoint: ADD_TO_CART_PATH.to_string(),
            message: error.to_string(),
        })?;
        // A JSON body of an unexpected shape still counts as a rejection, not a transport fault.
        let body: AddToCartResponse = serde_json::from_value(raw.clone()).unwrap_or_default();

        Ok(AddToCartReply { http_ok, body, raw })
    }

    async fn cart_url(&self, platform: &Platform) -> Result<String, ApiError> {
        let request =
            self.client.get(self.url(CART_URL_PATH)).query(&[("platform", platform.as_str())]);
        let response: CartUrlResponse = self.send_json(CART_URL_PATH, request).await?;
        Ok(response.cart_url)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use cartchat_core::api::{AddToCartRequest, CartApi};
    use cartchat_core::domain::product::{Platform, ProductId};
    use cartchat_core::errors::ApiError;
    use serde_json::{json, Value};

    use super::HttpCartApi;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
        let address = listener.local_addr().expect("local address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{address}")
    }

    fn request(product_id: &str, quantity: u32) -> AddToCartRequest {
        AddToCartRequest { product_id: ProductId(product_id.to_string()), quantity }
    }

    #[tokio::test]
    async fn health_decodes_platform_and_cookie_status() {
        let router = Router::new().route(
            "/health",
            get(|| async {
                Json(json!({ "currentPlatform": "rusta", "cookieStatus": { "rusta": true } }))
            }),
        );
        let api = HttpCartApi::new(format!("{}/", serve(router).await));

        let report = api.health().await.expect("health should decode");

        assert_eq!(report.current_platform, Some(Platform::Rusta));
        assert!(report.has_cookies_for(&Platform::Rusta));
        assert!(!report.has_cookies_for(&Platform::Motonet));
    }

    #[tokio::test]
    async fn add_to_cart_sends_camel_case_body() {
        let router = Router::new().route(
            "/api/add-to-cart",
            post(|Json(body): Json<Value>| async move {
                let accepted = body["productId"] == "59-5064" && body["quantity"] == 2;
                Json(json!({ "success": accepted }))
            }),
        );
        let api = HttpCartApi::new(serve(router).await);

        let reply = api.add_to_cart(&request("59-5064", 2)).await.expect("reply");

        assert!(reply.http_ok);
        assert!(reply.accepted());
    }

    #[tokio::test]
    async fn rejected_add_keeps_status_class_and_raw_payload() {
        let router = Router::new().route(
            "/api/add-to-cart",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "error": "Missing cookies", "trace": 7 })),
                )
            }),
        );
        let api = HttpCartApi::new(serve(router).await);

        let reply = api.add_to_cart(&request("10-1000", 1)).await.expect("reply");

        assert!(!reply.http_ok);
        assert!(!reply.accepted());
        assert_eq!(reply.body.error.as_deref(), Some("Missing cookies"));
        assert_eq!(reply.raw["trace"], 7);
    }

    #[tokio::test]
    async fn non_json_add_reply_is_a_decode_error() {
        let router =
            Router::new().route("/api/add-to-cart", post(|| async { "<html>oops</html>" }));
        let api = HttpCartApi::new(serve(router).await);

        let error = api.add_to_cart(&request("10-1000", 1)).await.expect_err("decode error");

        assert!(matches!(error, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_request_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
        let address = listener.local_addr().expect("local address");
        drop(listener);
        let api = HttpCartApi::new(format!("http://{address}"));

        let error = api.health().await.expect_err("connection refused");

        assert!(matches!(error, ApiError::Request { .. }));
        assert_eq!(error.endpoint(), "health");
    }

    #[tokio::test]
    async fn switch_platform_maps_error_status() {
        let router = Router::new()
            .route(
                "/api/switch-platform",
                post(|Json(body): Json<Value>| async move {
                    if body["platform"] == "rusta" {
                        (StatusCode::OK, Json(json!({ "currentPlatform": "rusta" })))
                    } else {
                        (StatusCode::BAD_REQUEST, Json(json!({ "error": "unknown platform" })))
                    }
                }),
            );
        let api = HttpCartApi::new(serve(router).await);

        assert_eq!(api.switch_platform(&Platform::Rusta).await, Ok(Platform::Rusta));
        let error = api
            .switch_platform(&Platform::Other("biltema".to_string()))
            .await
            .expect_err("bad request");
        assert!(matches!(error, ApiError::Status { status: 400, .. }));
    }

    #[tokio::test]
    async fn cart_url_passes_platform_query() {
        let router = Router::new().route(
            "/api/cart/url",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let platform = params.get("platform").cloned().unwrap_or_default();
                Json(json!({ "cartUrl": format!("https://{platform}.example/cart") }))
            }),
        );
        let api = HttpCartApi::new(serve(router).await);

        let url = api.cart_url(&Platform::Motonet).await.expect("cart url");

        assert_eq!(url, "https://motonet.example/cart");
    }

    #[test]
    fn base_url_is_trimmed() {
        let api = HttpCartApi::new("  http://localhost:3000///  ");
        assert_eq!(api.base_url(), "http://localhost:3000");
    }
}
