//! Catch-all message handler: every inbound text goes to the chat bridge and the result goes
//! back to the same conversation. Exactly one reply per message.

use std::sync::Arc;

use crate::bridge::ChatBridge;
use crate::channels::{ChannelHandle, InboundMessage};

/// Sent when the bridge task itself dies (panic) instead of returning text.
pub const HANDLER_FALLBACK: &str =
    "Lo siento, ocurrió un error al procesar tu mensaje. Intenta nuevamente.";

/// Produce the reply for one inbound message. The bridge runs in its own task so a panic inside
/// it is contained and answered with [`HANDLER_FALLBACK`].
pub async fn reply_for(bridge: Arc<ChatBridge>, text: String) -> String {
    let task = tokio::spawn(async move { bridge.chat("", &text).await });
    match task.await {
        Ok(reply) => reply,
        Err(e) => {
            log::error!("handler: error processing message: {}", e);
            HANDLER_FALLBACK.to_string()
        }
    }
}

/// Handle one inbound message end to end: compute the reply and send it.
pub async fn handle_inbound(
    bridge: Arc<ChatBridge>,
    channel: Arc<dyn ChannelHandle>,
    msg: InboundMessage,
) {
    log::info!(
        "inbound {} message from {} ({} chars)",
        msg.channel_id,
        msg.conversation_id,
        msg.text.chars().count()
    );
    let reply = reply_for(bridge, msg.text).await;
    if let Err(e) = channel.send_message(&msg.conversation_id, &reply).await {
        log::warn!("handler: send_message to {} failed: {}", msg.conversation_id, e);
    }
}
