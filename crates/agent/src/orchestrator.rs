use std::sync::Arc;

use cartchat_core::api::{AddToCartRequest, CartApi};
use cartchat_core::config::FallbackMode;
use cartchat_core::connectivity::ConnectionState;
use cartchat_core::diagnostics::{DiagnosticReport, DiagnosticSink};
use cartchat_core::domain::cart::{Cart, CartLine};
use cartchat_core::domain::conversation::ConversationLog;
use cartchat_core::domain::product::{Platform, ProductId};
use cartchat_core::errors::{ApiError, ChatError, RejectionReason};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::classifier::AddItemSlots;
use crate::resolver::ProductResolver;

/// Result of one add-to-cart submission.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CartActionOutcome {
    Success { line: CartLine },
    Failure { reason: RejectionReason, raw_message: Option<String> },
    TransportError { raw_message: String },
}

impl CartActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The error a caller would surface for this outcome, if any.
    pub fn as_error(&self) -> Option<ChatError> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason, raw_message } => Some(ChatError::ServerRejection {
                reason: *reason,
                message: raw_message.clone().unwrap_or_default(),
            }),
            Self::TransportError { raw_message } => {
                Some(ChatError::Transport(raw_message.clone()))
            }
        }
    }
}

/// What happened while handling one add-item intent.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AddItemReport {
    pub product_id: Option<ProductId>,
    pub outcome: Option<CartActionOutcome>,
    pub fallback_url: Option<String>,
}

impl AddItemReport {
    fn gated() -> Self {
        Self::default()
    }
}

/// Drives an add-item intent through the connectivity gate, product resolution and the cart
/// API, then folds the result back into the local cart and conversation.
pub struct AddToCartOrchestrator {
    api: Arc<dyn CartApi>,
    resolver: Arc<dyn ProductResolver>,
    diagnostics: Arc<dyn DiagnosticSink>,
    fallback: FallbackMode,
}

impl AddToCartOrchestrator {
    pub fn new(
        api: Arc<dyn CartApi>,
        resolver: Arc<dyn ProductResolver>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self { api, resolver, diagnostics, fallback: FallbackMode::Disabled }
    }

    pub fn with_fallback(mut self, fallback: FallbackMode) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn fallback(&self) -> FallbackMode {
        self.fallback
    }

    pub fn api(&self) -> &Arc<dyn CartApi> {
        &self.api
    }

    /// Sends one add-to-cart request and reports the outcome.
    ///
    /// Never touches the local cart. Rejections and transport failures are also published to
    /// the diagnostic sink with whatever raw payload the server produced.
    pub async fn submit_add_item(
        &self,
        product_id: &ProductId,
        quantity: u32,
        product_name: &str,
    ) -> CartActionOutcome {
        let request = AddToCartRequest { product_id: product_id.clone(), quantity };
        info!(
            event_name = "cart.add_item.submitted",
            product_id = %product_id,
            quantity,
            "submitting add-to-cart request"
        );

        match self.api.add_to_cart(&request).await {
            Ok(reply) if reply.accepted() => {
                info!(
                    event_name = "cart.add_item.accepted",
                    product_id = %product_id,
                    quantity,
                    "server accepted add-to-cart request"
                );
                CartActionOutcome::Success {
                    line: CartLine {
                        product_id: product_id.clone(),
                        product_name: product_name.to_string(),
                        quantity,
                    },
                }
            }
            Ok(reply) => {
                let raw_message = reply.body.error.clone();
                let reason = RejectionReason::classify(raw_message.as_deref());
                warn!(
                    event_name = "cart.add_item.rejected",
                    product_id = %product_id,
                    http_ok = reply.http_ok,
                    reason = reason.as_str(),
                    error = raw_message.as_deref().unwrap_or("none"),
                    "server rejected add-to-cart request"
                );
                self.diagnostics.emit(
                    DiagnosticReport::new(
                        "Add to Cart Error",
                        raw_message.clone().unwrap_or_else(|| reason.user_message()),
                    )
                    .with_raw_details(reply.raw),
                );
                CartActionOutcome::Failure { reason, raw_message }
            }
            Err(error) => {
                warn!(
                    event_name = "cart.add_item.transport_failed",
                    product_id = %product_id,
                    endpoint = error.endpoint(),
                    error = %error,
                    "add-to-cart request did not complete"
                );
                self.diagnostics.emit(
                    DiagnosticReport::new("Connection Error", error.to_string())
                        .with_raw_details(transport_details(&error)),
                );
                CartActionOutcome::TransportError { raw_message: error.to_string() }
            }
        }
    }

    /// Handles an add-item intent end to end against the session's cart and log.
    ///
    /// While disconnected exactly one bot entry is appended and no request is made. Otherwise
    /// an interim entry precedes the request, and the outcome entry follows it. The cart only
    /// changes on an accepted request.
    pub async fn handle_add_item_intent(
        &self,
        slots: &AddItemSlots,
        connection: &ConnectionState,
        cart: &mut Cart,
        log: &mut ConversationLog,
    ) -> AddItemReport {
        if !connection.connected() {
            info!(
                event_name = "cart.add_item.offline",
                status = ?connection.status,
                "add-item intent refused while disconnected"
            );
            log.push_bot(ChatError::Offline.user_message());
            return AddItemReport::gated();
        }

        let product_id = match &slots.explicit_product_id {
            Some(explicit) => ProductId(explicit.clone()),
            None => self.resolver.resolve(&slots.product_text, &connection.active_platform),
        };
        let quantity = slots.quantity;
        let name = slots.product_text.as_str();

        log.push_bot(format!("I'll try to add {quantity} {name} to your cart..."));
        let outcome = self.submit_add_item(&product_id, quantity, name).await;

        match &outcome {
            CartActionOutcome::Success { line } => {
                let merged =
                    cart.merge(line.product_id.clone(), line.product_name.clone(), line.quantity);
                info!(
                    event_name = "cart.line.merged",
                    product_id = %merged.product_id,
                    quantity = merged.quantity,
                    "cart line updated"
                );
                log.push_bot(format!("Great! I've added {quantity} {name} to your cart."));
            }
            CartActionOutcome::Failure { reason, .. } => {
                log.push_bot(reason.user_message());
            }
            CartActionOutcome::TransportError { raw_message } => {
                log.push_bot(ChatError::Transport(raw_message.clone()).user_message());
            }
        }

        let fallback_url = if !outcome.is_success() && self.fallback == FallbackMode::CartPage {
            self.offer_cart_page(name, &connection.active_platform, log).await
        } else {
            None
        };

        AddItemReport { product_id: Some(product_id), outcome: Some(outcome), fallback_url }
    }

    async fn offer_cart_page(
        &self,
        product_name: &str,
        platform: &Platform,
        log: &mut ConversationLog,
    ) -> Option<String> {
        match self.api.cart_url(platform).await {
            Ok(url) => {
                info!(
                    event_name = "cart.fallback.cart_page_offered",
                    platform = %platform,
                    "offering cart page after failed add"
                );
                log.push_bot(format!(
                    "{product_name} was not added. You can open your {platform} cart and add it \
                     manually: {url}"
                ));
                Some(url)
            }
            Err(error) => {
                warn!(
                    event_name = "cart.fallback.cart_page_failed",
                    platform = %platform,
                    error = %error,
                    "could not fetch cart page for fallback"
                );
                None
            }
        }
    }
}

fn transport_details(error: &ApiError) -> serde_json::Value {
    match error {
        ApiError::Request { endpoint, message } => {
            json!({ "kind": "request", "endpoint": endpoint, "message": message })
        }
        ApiError::Status { endpoint, status, body } => {
            json!({ "kind": "status", "endpoint": endpoint, "status": status, "body": body })
        }
        ApiError::Decode { endpoint, message } => {
            json!({ "kind": "decode", "endpoint": endpoint, "message": message })
        }
    }
}
