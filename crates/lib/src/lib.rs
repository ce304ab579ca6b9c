//! Maxibot core library: configuration, persona, Gemini chat bridge, Meta WhatsApp channel,
//! and the webhook gateway used by the CLI.

pub mod bridge;
pub mod channels;
pub mod config;
pub mod gateway;
pub mod handler;
pub mod llm;
pub mod persona;
pub mod prompt;
pub mod validate;
