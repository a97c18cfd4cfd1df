//! Conversation agent - turns chat utterances into cart actions
//!
//! This crate is the conversational half of cartchat:
//! - Classifies each utterance into exactly one [`Intent`] (`classifier`)
//! - Maps free-text product mentions to platform product ids (`resolver`)
//! - Drives add-to-cart requests and folds results into the cart (`orchestrator`)
//! - Owns one conversation's cart and transcript (`session`)
//!
//! # Flow
//!
//! 1. **Classify** - ordered rules, first match wins, no I/O
//! 2. **Gate** - cart actions only run while the API link is connected
//! 3. **Resolve + submit** - explicit product ids beat resolved ones
//! 4. **Reconcile** - the local cart changes only after the server accepts
//!
//! Connectivity itself is tracked elsewhere; sessions receive a
//! [`ConnectionState`](cartchat_core::ConnectionState) snapshot per turn.

pub mod classifier;
pub mod orchestrator;
pub mod resolver;
pub mod session;

#[cfg(test)]
mod test_support;

pub use classifier::{AddItemSlots, Intent, IntentClassifier};
pub use orchestrator::{AddItemReport, AddToCartOrchestrator, CartActionOutcome};
pub use resolver::{ProductResolver, SyntheticIdResolver};
pub use session::{ChatSession, TurnReport};
