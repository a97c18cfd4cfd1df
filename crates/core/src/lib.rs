pub mod api;
pub mod config;
pub mod connectivity;
pub mod diagnostics;
pub mod domain;
pub mod errors;

pub use api::{AddToCartReply, AddToCartRequest, CartApi, HealthReport};
pub use connectivity::{ConnectionState, LinkStatus, LinkTransition};
pub use diagnostics::{DiagnosticReport, DiagnosticSink, InMemoryDiagnosticSink};
pub use domain::cart::{Cart, CartLine};
pub use domain::conversation::{ConversationEntry, ConversationLog, Speaker};
pub use domain::product::{Platform, ProductId};
pub use errors::{ApiError, ChatError, RejectionReason};
