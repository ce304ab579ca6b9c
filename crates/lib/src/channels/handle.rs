//! Outbound side of a channel: the capability to reply into a conversation.

use async_trait::async_trait;

/// Handle to a channel connector that can deliver replies.
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Send a text message to a conversation (e.g. a WhatsApp phone id).
    async fn send_message(&self, conversation_id: &str, text: &str) -> Result<(), String>;
}
