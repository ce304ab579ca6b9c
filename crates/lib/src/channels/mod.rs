//! Communication channels (WhatsApp Cloud API via Meta).
//!
//! Inbound messages arrive through the gateway webhook; replies go out through a `ChannelHandle`.

mod handle;
mod inbound;
mod meta;

pub use handle::ChannelHandle;
pub use inbound::InboundMessage;
pub use meta::{verify_subscription, MetaChannel, MetaError, MetaWebhook, META_CHANNEL_ID};
