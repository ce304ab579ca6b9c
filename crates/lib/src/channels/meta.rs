//! WhatsApp Cloud API channel (Meta provider): webhook payloads, subscription handshake,
//! and sending text replies via the Graph API.

use crate::channels::handle::ChannelHandle;
use crate::channels::inbound::InboundMessage;
use crate::config::MetaCredentials;
use async_trait::async_trait;
use serde::Deserialize;

pub const META_CHANNEL_ID: &str = "meta";

/// `object` of WhatsApp Business notifications. Other Graph objects share the webhook shape.
pub const WHATSAPP_OBJECT: &str = "whatsapp_business_account";

#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    #[error("meta channel not configured: missing {0}")]
    NotConfigured(&'static str),
    #[error("graph api request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("graph api error {status}: {body}")]
    Api { status: u16, body: String },
}

/// Sends replies through `POST /{version}/{number_id}/messages`.
pub struct MetaChannel {
    credentials: MetaCredentials,
    client: reqwest::Client,
}

impl MetaChannel {
    pub fn new(credentials: MetaCredentials) -> Self {
        Self {
            credentials,
            client: reqwest::Client::new(),
        }
    }

    /// True when both the access token and the sender number id are set.
    pub fn can_send(&self) -> bool {
        self.credentials.jwt_token.is_some() && self.credentials.number_id.is_some()
    }

    pub fn verify_token(&self) -> Option<&str> {
        self.credentials.verify_token.as_deref()
    }

    /// Send a plain text message to a WhatsApp user.
    pub async fn send_text(&self, to: &str, text: &str) -> Result<(), MetaError> {
        let token = self
            .credentials
            .jwt_token
            .as_deref()
            .ok_or(MetaError::NotConfigured("access token"))?;
        let number_id = self
            .credentials
            .number_id
            .as_deref()
            .ok_or(MetaError::NotConfigured("number id"))?;
        let url = format!(
            "{}/{}/{}/messages",
            self.credentials.graph_base_url, self.credentials.version, number_id
        );
        let body = serde_json::json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to,
            "type": "text",
            "text": { "preview_url": false, "body": text },
        });
        let res = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(MetaError::Api { status, body });
        }
        log::debug!("meta: sent {} chars to {}", text.chars().count(), to);
        Ok(())
    }
}

#[async_trait]
impl ChannelHandle for MetaChannel {
    async fn send_message(&self, conversation_id: &str, text: &str) -> Result<(), String> {
        self.send_text(conversation_id, text)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Webhook subscription handshake (`GET /webhook?hub.mode=subscribe&hub.verify_token=..&hub.challenge=..`).
/// Returns the challenge to echo back, or None when the request must be refused.
pub fn verify_subscription<'a>(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&'a str>,
    expected_token: Option<&str>,
) -> Option<&'a str> {
    let expected = expected_token?;
    if mode? != "subscribe" || token? != expected {
        return None;
    }
    challenge
}

/// Webhook POST body: `{ object, entry: [{ changes: [{ value: { messages: [...] } }] }] }`.
#[derive(Debug, Deserialize)]
pub struct MetaWebhook {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub value: WebhookValue,
}

/// Message notifications carry `messages`; delivery receipts carry `statuses` (ignored).
#[derive(Debug, Default, Deserialize)]
pub struct WebhookValue {
    #[serde(default)]
    pub messages: Vec<WebhookMessage>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookMessage {
    pub from: String,
    #[serde(rename = "type", default)]
    pub typ: String,
    #[serde(default)]
    pub text: Option<TextBody>,
    /// Quick-reply button on a template message.
    #[serde(default)]
    pub button: Option<ButtonBody>,
    /// Reply button or list selection on an interactive message.
    #[serde(default)]
    pub interactive: Option<InteractiveBody>,
    #[serde(default)]
    pub image: Option<MediaBody>,
    #[serde(default)]
    pub video: Option<MediaBody>,
    #[serde(default)]
    pub document: Option<MediaBody>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct ButtonBody {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct InteractiveBody {
    #[serde(default)]
    pub button_reply: Option<ReplyTitle>,
    #[serde(default)]
    pub list_reply: Option<ReplyTitle>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyTitle {
    pub title: String,
}

/// Image, video or document attachment. Only the optional caption is read.
#[derive(Debug, Deserialize)]
pub struct MediaBody {
    #[serde(default)]
    pub caption: Option<String>,
}

fn caption(media: Option<&MediaBody>) -> Option<&str> {
    media?.caption.as_deref().filter(|c| !c.trim().is_empty())
}

impl WebhookMessage {
    /// What the user typed or picked: text, button or interactive reply, or a media caption.
    pub fn body(&self) -> Option<&str> {
        match self.typ.as_str() {
            "text" => self.text.as_ref().map(|t| t.body.as_str()),
            "button" => self.button.as_ref().map(|b| b.text.as_str()),
            "interactive" => self.interactive.as_ref().and_then(|i| {
                i.button_reply
                    .as_ref()
                    .or(i.list_reply.as_ref())
                    .map(|r| r.title.as_str())
            }),
            "image" => caption(self.image.as_ref()),
            "video" => caption(self.video.as_ref()),
            "document" => caption(self.document.as_ref()),
            _ => None,
        }
    }

    /// Stand-in text for user content that carries none, so the sender still gets a reply.
    pub fn placeholder(&self) -> Option<&'static str> {
        match self.typ.as_str() {
            "image" => Some("[El usuario envió una imagen]"),
            "video" => Some("[El usuario envió un video]"),
            "document" => Some("[El usuario envió un documento]"),
            "audio" => Some("[El usuario envió una nota de voz]"),
            "sticker" => Some("[El usuario envió un sticker]"),
            "location" => Some("[El usuario compartió una ubicación]"),
            "contacts" => Some("[El usuario compartió un contacto]"),
            _ => None,
        }
    }
}

impl MetaWebhook {
    /// False only when the payload names an object other than a WhatsApp Business account.
    pub fn is_whatsapp(&self) -> bool {
        self.object.as_deref().map_or(true, |o| o == WHATSAPP_OBJECT)
    }

    /// One inbound message per user message, in payload order. Media without a caption gets a
    /// placeholder text. Reactions, system notices and unknown types are logged and skipped;
    /// status updates carry no messages at all.
    pub fn inbound_messages(&self) -> Vec<InboundMessage> {
        self.entry
            .iter()
            .flat_map(|e| e.changes.iter())
            .flat_map(|c| c.value.messages.iter())
            .filter_map(|m| {
                let Some(text) = m.body().or_else(|| m.placeholder()) else {
                    log::info!("meta webhook: skipping {:?} message from {}", m.typ, m.from);
                    return None;
                };
                Some(InboundMessage {
                    channel_id: META_CHANNEL_ID.to_string(),
                    conversation_id: m.from.clone(),
                    text: text.to_string(),
                })
            })
            .collect()
    }
}
