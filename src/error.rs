/// Startup configuration failure. Fatal: the bot refuses to start.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// A language-model call that did not produce usable text.
///
/// Handlers turn this into a user-facing fallback reply; the broadcast task
/// skips the day.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("invalid generation request: {0}")]
    InvalidRequest(String),

    #[error("provider transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// One outbound message could not be delivered to one chat.
#[derive(Debug, thiserror::Error)]
#[error("failed to deliver message to chat {chat_id}: {reason}")]
pub struct DeliveryError {
    pub chat_id: i64,
    pub reason: String,
}

impl DeliveryError {
    pub fn new(chat_id: i64, reason: impl Into<String>) -> Self {
        Self {
            chat_id,
            reason: reason.into(),
        }
    }
}
