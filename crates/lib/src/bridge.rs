//! Chat bridge: one user utterance in, one reply string out.
//!
//! `respond` is the single fallible operation (answer or classified failure); `chat` unwraps it
//! into user-facing text so nothing ever escapes to the caller.

use std::sync::Arc;

use crate::llm::{GeminiError, TextGenerator};
use crate::persona::Persona;
use crate::prompt::build_prompt;
use crate::validate::validate_response;

/// Why a reply could not be produced. Each kind maps to one fixed fallback string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatFailure {
    /// Credentials missing or rejected.
    Configuration,
    /// Quota exhausted or rate limited.
    RateLimited,
    /// Request or response rejected by the content policy.
    ContentBlocked,
    /// Network failure, malformed response, anything else.
    Technical,
    /// The call succeeded but carried no response.
    NoResponse,
    /// The text failed validation.
    InadequateResponse,
}

impl ChatFailure {
    /// Classify a generation error by its message. First match wins, case-insensitive.
    pub fn classify(message: &str) -> Self {
        let m = message.to_lowercase();
        if m.contains("api key") {
            ChatFailure::Configuration
        } else if m.contains("quota") || m.contains("limit") {
            ChatFailure::RateLimited
        } else if m.contains("blocked") || m.contains("safety") {
            ChatFailure::ContentBlocked
        } else {
            ChatFailure::Technical
        }
    }

    pub fn fallback_text(self) -> &'static str {
        match self {
            ChatFailure::Configuration => {
                "Error de configuración del servicio. Por favor contacta al administrador."
            }
            ChatFailure::RateLimited => {
                "El servicio está temporalmente saturado. Intenta nuevamente en unos minutos."
            }
            ChatFailure::ContentBlocked => {
                "Lo siento, tu mensaje no pudo ser procesado por las políticas de contenido del servicio. ¿Podrías reformularlo?"
            }
            ChatFailure::Technical => {
                "Lo siento, ocurrió un error técnico. Intenta nuevamente o contacta al soporte si el problema persiste."
            }
            ChatFailure::NoResponse => {
                "Lo siento, no pude procesar tu solicitud en este momento. ¿Podrías intentar reformular tu pregunta?"
            }
            ChatFailure::InadequateResponse => {
                "Lo siento, no pude generar una respuesta adecuada. ¿Podrías reformular tu pregunta?"
            }
        }
    }
}

impl From<&GeminiError> for ChatFailure {
    fn from(e: &GeminiError) -> Self {
        ChatFailure::classify(&e.to_string())
    }
}

/// Persona + generation backend. Stateless between calls; share behind an `Arc`.
pub struct ChatBridge {
    generator: Arc<dyn TextGenerator>,
    persona: Persona,
}

impl ChatBridge {
    pub fn new(generator: Arc<dyn TextGenerator>, persona: Persona) -> Self {
        Self { generator, persona }
    }

    /// Build the prompt, call the model once, validate. The original error is logged here
    /// and only the classified kind is returned.
    pub async fn respond(&self, extra_context: &str, user_text: &str) -> Result<String, ChatFailure> {
        let prompt = build_prompt(&self.persona.instructions, extra_context, user_text);
        let answer = match self.generator.generate(&prompt).await {
            Ok(Some(answer)) => answer,
            Ok(None) => {
                log::warn!("bridge: generation returned no response");
                return Err(ChatFailure::NoResponse);
            }
            Err(e) => {
                let kind = ChatFailure::from(&e);
                log::error!("bridge: generation failed ({:?}): {}", kind, e);
                return Err(kind);
            }
        };
        if !validate_response(&answer, self.persona.min_response_chars) {
            log::warn!("bridge: rejected generated text: {:?}", answer);
            return Err(ChatFailure::InadequateResponse);
        }
        Ok(answer.trim().to_string())
    }

    /// Never fails: the answer, or the fallback text for whatever went wrong.
    pub async fn chat(&self, extra_context: &str, user_text: &str) -> String {
        match self.respond(extra_context, user_text).await {
            Ok(answer) => answer,
            Err(kind) => kind.fallback_text().to_string(),
        }
    }
}
