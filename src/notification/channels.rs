use async_trait::async_trait;

/// Outbound e-mail, already rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Chat card addressed to a member's chat identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCard {
    pub recipient_chat_id: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SendError {
    #[error("recipient rejected: {0}")]
    Rejected(String),
    #[error("send failed: {0}")]
    Transport(String),
}

/// Outbound e-mail capability (rendering happens upstream).
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), SendError>;
}

/// Chat-card capability. `send_card` returns the messenger-issued message
/// id, which the caller persists for later in-place updates.
#[async_trait]
pub trait ChatMessenger: Send + Sync {
    async fn send_card(&self, card: ChatCard) -> Result<String, SendError>;
    async fn update_card(&self, message_id: &str, card: ChatCard) -> Result<(), SendError>;
}
