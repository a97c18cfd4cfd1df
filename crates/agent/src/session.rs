use cartchat_core::connectivity::ConnectionState;
use cartchat_core::domain::cart::{Cart, CartLine};
use cartchat_core::domain::conversation::{ConversationEntry, ConversationLog};
use cartchat_core::domain::product::{Platform, ProductId};
use cartchat_core::errors::ChatError;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classifier::{Intent, IntentClassifier};
use crate::orchestrator::{AddItemReport, AddToCartOrchestrator};

pub const WELCOME_MESSAGE: &str = "Hello! I'm your shopping assistant. I can help you add \
                                   products to your cart. What would you like to shop for today?";
const HELP_MESSAGE: &str = "I can help you add products to your cart. Try saying something like \
                            \"Add 2 winter tires to my cart\" or \"Add motor oil product id \
                            59-5064\".";
const THANKS_MESSAGE: &str =
    "You're welcome! Is there anything else you'd like to add to your cart?";
const FAREWELL_MESSAGE: &str = "Thank you for shopping with us! Have a great day!";
const CLEARED_MESSAGE: &str = "I've cleared your cart. What would you like to shop for?";
const UNRECOGNIZED_MESSAGE: &str = "I'm designed to help you add products to your cart. Try \
                                    asking me to add a specific product, like \"Add winter tires \
                                    to my cart\" or \"Add 2 bottles of motor oil\".";

/// Everything one user turn produced.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TurnReport {
    pub intent: Intent,
    /// Entries appended during the turn, user entry first.
    pub entries: Vec<ConversationEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_item: Option<AddItemReport>,
}

/// One chat conversation: its cart, its transcript and the machinery that answers turns.
pub struct ChatSession {
    classifier: IntentClassifier,
    orchestrator: AddToCartOrchestrator,
    cart: Cart,
    log: ConversationLog,
}

impl ChatSession {
    pub fn new(orchestrator: AddToCartOrchestrator) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            orchestrator,
            cart: Cart::new(),
            log: ConversationLog::new(),
        }
    }

    /// Opens the transcript with the assistant's introduction.
    pub fn with_welcome(mut self) -> Self {
        self.log.push_bot(WELCOME_MESSAGE);
        self
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub async fn handle_utterance(
        &mut self,
        utterance: &str,
        connection: &ConnectionState,
    ) -> Result<TurnReport, ChatError> {
        let text = utterance.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyUtterance);
        }

        let mark = self.log.len();
        self.log.push_user(text);
        let intent = self.classifier.classify(text);
        debug!(
            event_name = "chat.turn.classified",
            intent = intent.name(),
            connected = connection.connected(),
            "classified user utterance"
        );

        let add_item = match &intent {
            Intent::AddItem(slots) => Some(
                self.orchestrator
                    .handle_add_item_intent(slots, connection, &mut self.cart, &mut self.log)
                    .await,
            ),
            Intent::ClearCart => {
                let removed = self.cart.len();
                self.cart.clear();
                info!(event_name = "chat.cart.cleared", removed, "cart cleared");
                self.log.push_bot(CLEARED_MESSAGE);
                None
            }
            Intent::Greeting => {
                self.log.push_bot(format!(
                    "Hello! I'm your shopping assistant for {}. How can I help you today?",
                    connection.active_platform
                ));
                None
            }
            Intent::HelpRequest => {
                self.log.push_bot(HELP_MESSAGE);
                None
            }
            Intent::Thanks => {
                self.log.push_bot(THANKS_MESSAGE);
                None
            }
            Intent::Farewell => {
                self.log.push_bot(FAREWELL_MESSAGE);
                None
            }
            Intent::Unrecognized => {
                self.log.push_bot(UNRECOGNIZED_MESSAGE);
                None
            }
        };

        Ok(TurnReport { intent, entries: self.log.since(mark).to_vec(), add_item })
    }

    pub fn announce_platform_switch(&mut self, platform: &Platform) -> &ConversationEntry {
        self.log.push_bot(format!("Switched to {platform} store. How can I help you shop today?"))
    }

    /// Drops one line locally. The remote cart is not touched.
    pub fn remove_line(&mut self, product_id: &ProductId) -> Option<CartLine> {
        let removed = self.cart.remove(product_id);
        if removed.is_some() {
            info!(event_name = "chat.cart.line_removed", product_id = %product_id, "line removed");
        }
        removed
    }

    /// Link to the platform's web cart, offered only once something is in the local cart.
    pub async fn cart_page_url(&self, platform: &Platform) -> Result<Option<String>, ChatError> {
        if self.cart.is_empty() {
            return Ok(None);
        }
        match self.orchestrator.api().cart_url(platform).await {
            Ok(url) => Ok(Some(url)),
            Err(error) => {
                warn!(
                    event_name = "chat.cart.url_failed",
                    platform = %platform,
                    error = %error,
                    "could not fetch cart url"
                );
                Err(error.into())
            }
        }
    }
}
