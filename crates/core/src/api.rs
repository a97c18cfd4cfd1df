//! Contract of the remote cart API the chat front end talks to.
//!
//! The wire types mirror the JSON bodies exactly (camelCase keys). [`CartApi`] is the seam the
//! agent and the connectivity monitor depend on; the reqwest implementation lives in
//! `cartchat-api`, and tests substitute scripted fakes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::product::{Platform, ProductId};
use crate::errors::ApiError;

pub const HEALTH_PATH: &str = "health";
pub const SWITCH_PLATFORM_PATH: &str = "api/switch-platform";
pub const ADD_TO_CART_PATH: &str = "api/add-to-cart";
pub const CART_URL_PATH: &str = "api/cart/url";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    #[serde(default)]
    pub current_platform: Option<Platform>,
    #[serde(default)]
    pub cookie_status: BTreeMap<String, bool>,
}

impl HealthReport {
    pub fn has_cookies_for(&self, platform: &Platform) -> bool {
        self.cookie_status.get(platform.as_str()).copied().unwrap_or(false)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchPlatformRequest {
    pub platform: Platform,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchPlatformResponse {
    pub current_platform: Platform,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToCartResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// A decoded add-to-cart answer from a reachable server.
#[derive(Clone, Debug, PartialEq)]
pub struct AddToCartReply {
    /// HTTP status was 2xx.
    pub http_ok: bool,
    pub body: AddToCartResponse,
    /// Untouched payload for the diagnostic surface.
    pub raw: Value,
}

impl AddToCartReply {
    pub fn accepted(&self) -> bool {
        self.http_ok && self.body.success
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartUrlResponse {
    pub cart_url: String,
}

#[async_trait]
pub trait CartApi: Send + Sync {
    async fn health(&self) -> Result<HealthReport, ApiError>;

    /// Returns the platform the server reports as current after the switch.
    async fn switch_platform(&self, platform: &Platform) -> Result<Platform, ApiError>;

    /// Transport or decoding failures are errors; logical rejections come back as a reply
    /// whose [`AddToCartReply::accepted`] is false.
    async fn add_to_cart(&self, request: &AddToCartRequest) -> Result<AddToCartReply, ApiError>;

    async fn cart_url(&self, platform: &Platform) -> Result<String, ApiError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AddToCartRequest, AddToCartResponse, HealthReport};
    use crate::domain::product::{Platform, ProductId};

    #[test]
    fn health_report_reads_camel_case_payload() {
        let report: HealthReport = serde_json::from_value(json!({
            "currentPlatform": "rusta",
            "cookieStatus": { "motonet": false, "rusta": true }
        }))
        .expect("health payload should decode");

        assert_eq!(report.current_platform, Some(Platform::Rusta));
        assert!(report.has_cookies_for(&Platform::Rusta));
        assert!(!report.has_cookies_for(&Platform::Motonet));
        assert!(!report.has_cookies_for(&Platform::Other("biltema".to_string())));
    }

    #[test]
    fn health_report_tolerates_missing_fields() {
        let report: HealthReport = serde_json::from_value(json!({})).expect("empty object");
        assert_eq!(report, HealthReport::default());
    }

    #[test]
    fn add_request_uses_wire_field_names() {
        let body = serde_json::to_value(AddToCartRequest {
            product_id: ProductId("59-5064".to_string()),
            quantity: 2,
        })
        .expect("serialize");

        assert_eq!(body, json!({ "productId": "59-5064", "quantity": 2 }));
    }

    #[test]
    fn add_response_defaults_to_unsuccessful() {
        let response: AddToCartResponse =
            serde_json::from_value(json!({ "error": "Product not found" })).expect("decode");
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Product not found"));
    }
}
