//! Gateway: HTTP server for the messaging webhook.
//!
//! Single port serves a health probe and the Meta webhook (`GET` verification, `POST` notifications).
//! Inbound messages are queued and answered by the catch-all handler.

mod server;

pub use server::{router, run_gateway, serve, GatewayState};
