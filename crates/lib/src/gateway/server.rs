//! Gateway HTTP server: health probe and the Meta webhook (verification + inbound messages).

use crate::bridge::ChatBridge;
use crate::channels::{verify_subscription, ChannelHandle, InboundMessage, MetaChannel, MetaWebhook};
use crate::config::{self, Config};
use crate::handler;
use crate::llm::GeminiClient;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

/// Inbound queue depth; the webhook answers 503 only once the processor is gone.
const INBOUND_QUEUE: usize = 256;

/// Shared state for the HTTP handlers. Read-only after startup.
#[derive(Clone)]
pub struct GatewayState {
    pub port: u16,
    pub model: Arc<str>,
    /// Expected `hub.verify_token`. None refuses every verification request.
    pub verify_token: Option<Arc<str>>,
    /// Sender for inbound webhook messages. Processor task receives.
    pub inbound_tx: mpsc::Sender<InboundMessage>,
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Builds the chat bridge (Gemini) and the Meta channel from config, then blocks until shutdown (e.g. Ctrl+C).
/// `config_path` is used to resolve a relative persona prompt file.
pub async fn run_gateway(config: Config, config_path: PathBuf) -> Result<()> {
    let persona = config::resolve_persona(&config, &config_path)?;
    let gemini = GeminiClient::from_config(&config, &persona);
    if !gemini.has_api_key() {
        log::warn!("GEMINI_API_KEY is not set; every message will get the configuration fallback");
    }
    let model = gemini.model().to_string();
    let bridge = Arc::new(ChatBridge::new(Arc::new(gemini), persona));

    let credentials = config::resolve_meta_credentials(&config);
    let meta = MetaChannel::new(credentials);
    if !meta.can_send() {
        log::warn!("meta channel: META_JWT_TOKEN or META_NUMBER_ID not set; replies cannot be delivered");
    }
    let verify_token: Option<Arc<str>> = meta.verify_token().map(Arc::from);
    if verify_token.is_none() {
        log::warn!("meta channel: META_VERIFY_TOKEN not set; webhook verification will be refused");
    }

    serve(
        &config,
        model,
        verify_token,
        bridge,
        Arc::new(meta),
        shutdown_signal(),
    )
    .await
}

/// Bind, serve until `shutdown` completes, then wait for in-flight messages to be answered.
pub async fn serve<F>(
    config: &Config,
    model: String,
    verify_token: Option<Arc<str>>,
    bridge: Arc<ChatBridge>,
    channel: Arc<dyn ChannelHandle>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind = config.gateway.bind.trim();
    let port = config.gateway.port;
    let (inbound_tx, inbound_rx) = mpsc::channel::<InboundMessage>(INBOUND_QUEUE);
    let processor = spawn_processor(inbound_rx, bridge, channel);

    let state = GatewayState {
        port,
        model: Arc::from(model),
        verify_token,
        inbound_tx,
    };
    let app = router(state);

    let bind_addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("gateway server exited")?;

    log::info!("gateway stopped, waiting for in-flight messages");
    if let Err(e) = processor.await {
        log::warn!("inbound processor ended abnormally: {}", e);
    }
    log::info!("inbound processor finished");
    Ok(())
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/webhook", get(webhook_verify).post(webhook_receive))
        .with_state(state)
}

/// Drain the inbound queue, one handler task per message. Ends when every sender is dropped
/// (the router is gone) and all spawned handlers have finished.
fn spawn_processor(
    mut inbound_rx: mpsc::Receiver<InboundMessage>,
    bridge: Arc<ChatBridge>,
    channel: Arc<dyn ChannelHandle>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tasks = JoinSet::new();
        while let Some(msg) = inbound_rx.recv().await {
            while tasks.try_join_next().is_some() {}
            tasks.spawn(handler::handle_inbound(bridge.clone(), channel.clone(), msg));
        }
        while tasks.join_next().await.is_some() {}
    })
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.port,
        "model": &*state.model,
    }))
}

/// GET /webhook — Meta subscription handshake; echoes `hub.challenge` when the verify token matches.
async fn webhook_verify(
    State(state): State<GatewayState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let challenge = verify_subscription(
        params.get("hub.mode").map(String::as_str),
        params.get("hub.verify_token").map(String::as_str),
        params.get("hub.challenge").map(String::as_str),
        state.verify_token.as_deref(),
    );
    match challenge {
        Some(c) => {
            log::info!("meta webhook verified");
            (StatusCode::OK, c.to_string()).into_response()
        }
        None => {
            log::warn!("meta webhook verification refused");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// POST /webhook — receives Meta notification JSON and queues every user message.
/// Acknowledges immediately; replies are sent asynchronously.
async fn webhook_receive(State(state): State<GatewayState>, body: Bytes) -> StatusCode {
    let hook: MetaWebhook = match serde_json::from_slice(&body) {
        Ok(h) => h,
        Err(e) => {
            log::debug!("meta webhook: malformed payload: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    if !hook.is_whatsapp() {
        log::info!(
            "meta webhook: ignoring {:?} notification",
            hook.object.as_deref().unwrap_or_default()
        );
        return StatusCode::OK;
    }
    for inbound in hook.inbound_messages() {
        if state.inbound_tx.send(inbound).await.is_err() {
            return StatusCode::SERVICE_UNAVAILABLE;
        }
    }
    StatusCode::OK
}
