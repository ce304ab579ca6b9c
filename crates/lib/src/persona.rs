//! Persona profiles: the fixed instruction block prepended to every prompt, plus the
//! generation parameters and validator threshold that go with it.

use serde::{Deserialize, Serialize};

/// Named persona configuration. `Maxiapoyo` is the default; `General` is an alternate profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonaProfile {
    /// Maxibot for Maxiapoyo: course dates, venues and prices.
    #[default]
    Maxiapoyo,
    /// Shorter general-purpose assistant with a lower token limit.
    General,
}

const MAXIAPOYO_INSTRUCTIONS: &str = "Eres Maxibot, un asistente virtual inteligente de Maxiapoyo que puede:
1. Responder preguntas generales con conocimiento amplio
2. Proporcionar información sobre cursos de Maxiapoyo
3. Ayudar con cualquier consulta de manera amigable y profesional

Información importante sobre Maxiapoyo:
- Las inscripciones son el 12 de diciembre
- En Habitat Solidaridad 4: cursos de maquillaje, sublimación y mecánica
- En Altares: repostería y panadería\x20\x20
- Todos los cursos cuestan $400

Instrucciones de respuesta:
- Sé amigable, útil y conversacional
- Si no tienes información específica, sé honesto al respecto
- Mantén respuestas concisas pero informativas
- Usa emojis ocasionalmente para hacer la conversación más amigable

";

const GENERAL_INSTRUCTIONS: &str = "Eres Maxibot, un asistente virtual amable que responde por WhatsApp.

Instrucciones de respuesta:
- Responde en el idioma del usuario, de forma breve y clara
- Si no sabes algo, dilo con honestidad
- No inventes datos, fechas ni precios

";

/// Everything the bridge needs from the persona. Built once at startup; read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Persona {
    pub instructions: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Generated text shorter than this (after trimming) is rejected.
    pub min_response_chars: usize,
}

impl Persona {
    pub fn from_profile(profile: PersonaProfile) -> Self {
        match profile {
            PersonaProfile::Maxiapoyo => Self {
                instructions: MAXIAPOYO_INSTRUCTIONS.to_string(),
                temperature: 0.7,
                max_output_tokens: 1024,
                min_response_chars: 10,
            },
            PersonaProfile::General => Self {
                instructions: GENERAL_INSTRUCTIONS.to_string(),
                temperature: 0.7,
                max_output_tokens: 512,
                min_response_chars: 5,
            },
        }
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::from_profile(PersonaProfile::default())
    }
}
