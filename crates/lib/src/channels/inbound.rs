//! Inbound message from a channel: delivered to the gateway for handling.

/// A text message from a channel to be answered in the same conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub channel_id: String,
    /// Reply target (WhatsApp sender phone id).
    pub conversation_id: String,
    pub text: String,
}
