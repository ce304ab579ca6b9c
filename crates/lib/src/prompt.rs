//! Prompt construction: persona block, optional extra context, then the user's question.

const CONTEXT_LABEL: &str = "Contexto adicional: ";
const QUESTION_LABEL: &str = "Usuario pregunta: ";

/// Compose the single-turn prompt sent to the model.
/// The context section is emitted only when `extra_context` is non-empty.
pub fn build_prompt(instructions: &str, extra_context: &str, user_text: &str) -> String {
    let mut prompt = String::with_capacity(
        instructions.len() + extra_context.len() + user_text.len() + 64,
    );
    prompt.push_str(instructions);
    if extra_context.is_empty() {
        prompt.push_str("\n\n");
    } else {
        prompt.push_str("\n\n");
        prompt.push_str(CONTEXT_LABEL);
        prompt.push_str(extra_context);
        prompt.push_str("\n\n");
    }
    prompt.push_str(QUESTION_LABEL);
    prompt.push_str(user_text);
    prompt
}
