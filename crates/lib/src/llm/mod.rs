//! Generation backend abstraction and the Gemini client.
//!
//! The bridge only needs "prompt in, text out"; `TextGenerator` is that seam so tests can
//! substitute a scripted backend.

mod gemini;

pub use gemini::{GeminiClient, GeminiError, GenerationConfig};

use async_trait::async_trait;

/// Single-shot text generation.
/// `Ok(None)` means the call succeeded but the service returned no usable response.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, GeminiError>;
}
