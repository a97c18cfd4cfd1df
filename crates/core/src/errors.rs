use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a reachable server refused an add-to-cart request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    Authentication,
    NotFound,
    Other,
}

impl RejectionReason {
    /// Buckets server error text; authentication hints take priority over missing products.
    pub fn classify(error_text: Option<&str>) -> Self {
        let Some(text) = error_text else {
            return Self::Other;
        };
        let normalized = text.to_ascii_lowercase();
        if normalized.contains("cookie") || normalized.contains("authentication") {
            Self::Authentication
        } else if normalized.contains("not found") || normalized.contains("invalid product") {
            Self::NotFound
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::NotFound => "not_found",
            Self::Other => "other",
        }
    }

    pub fn user_message(&self) -> String {
        let base = "Sorry, I couldn't add that item to your cart.";
        match self {
            Self::Authentication => {
                format!("{base} It seems there might be an authentication issue.")
            }
            Self::NotFound => {
                format!("{base} The product might not exist or the ID might be incorrect.")
            }
            Self::Other => base.to_string(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("request to `{endpoint}` failed: {message}")]
    Request { endpoint: String, message: String },
    #[error("`{endpoint}` responded with status {status}")]
    Status { endpoint: String, status: u16, body: String },
    #[error("could not decode `{endpoint}` response: {message}")]
    Decode { endpoint: String, message: String },
}

impl ApiError {
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Request { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Decode { endpoint, .. } => endpoint,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("utterance is empty")]
    EmptyUtterance,
    #[error("cart action attempted while disconnected")]
    Offline,
    #[error("server rejected the request ({}): {message}", reason.as_str())]
    ServerRejection { reason: RejectionReason, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("could not switch to platform `{platform}`: {message}")]
    PlatformSwitch { platform: String, message: String },
}

impl ChatError {
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyUtterance => "Please type a message first.".to_string(),
            Self::Offline => "Sorry, I cannot process your request because I'm not connected \
                              to the server. Please check your connection and try again."
                .to_string(),
            Self::ServerRejection { reason, .. } => reason.user_message(),
            Self::Transport(_) => "Sorry, there was an error connecting to the server. \
                                   Please try again later."
                .to_string(),
            Self::PlatformSwitch { platform, .. } => {
                format!("I couldn't switch to the {platform} store. Still using the previous one.")
            }
        }
    }

    /// Title used on the diagnostic surface, when the error belongs there.
    pub fn diagnostic_title(&self) -> Option<&'static str> {
        match self {
            Self::ServerRejection { .. } => Some("Add to Cart Error"),
            Self::Transport(_) => Some("Connection Error"),
            Self::PlatformSwitch { .. } => Some("Platform Switch Error"),
            Self::EmptyUtterance | Self::Offline => None,
        }
    }
}

impl From<ApiError> for ChatError {
    fn from(value: ApiError) -> Self {
        Self::Transport(value.to_string())
    }
}
