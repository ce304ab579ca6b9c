//! Response validator: rejects generated text that is too short or looks like a broken generation.

/// Substrings that indicate leaked runtime values or error text. Matched case-insensitively.
const BLOCKED_MARKERS: &[&str] = &[
    "undefined",
    "null",
    "error:",
    "[object Object]",
    "NaN",
    "TypeError",
    "ReferenceError",
];

/// True if `text` is usable as a reply: at least `min_chars` characters after trimming
/// and free of every blocked marker.
pub fn validate_response(text: &str, min_chars: usize) -> bool {
    if text.trim().chars().count() < min_chars.max(1) {
        return false;
    }
    let lower = text.to_lowercase();
    !BLOCKED_MARKERS
        .iter()
        .any(|marker| lower.contains(&marker.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_short() {
        assert!(!validate_response("", 10));
        assert!(!validate_response("          ", 10));
        assert!(!validate_response("  Hola  ", 10));
        assert!(!validate_response("", 0));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 5 characters, 10 bytes
        assert!(validate_response("ñañañ", 5));
        assert!(!validate_response("ñaña", 5));
    }

    #[test]
    fn rejects_blocked_markers_case_insensitively() {
        for text in [
            "undefined",
            "La respuesta es UNDEFINED por ahora",
            "El valor es null y no hay más",
            "Error: algo salió mal en el modelo",
            "Resultado: [object Object] listo",
            "El total es nan pesos mexicanos",
            "TypeError: cannot read properties",
            "referenceerror en la generación del texto",
        ] {
            assert!(!validate_response(text, 5), "should reject {:?}", text);
        }
    }

    #[test]
    fn accepts_plain_sentence() {
        assert!(validate_response(
            "Las inscripciones son el 12 de diciembre. 😊",
            10
        ));
        assert!(validate_response("Todos los cursos cuestan $400.", 10));
    }
}
