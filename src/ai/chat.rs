//! Conversational grounding over a document
//!
//! One backend call per question, grounded on a bounded prefix of the
//! document text. No chunking here: very long documents lose tail content
//! from the context, which is an accepted limitation.

use super::backend::{ChatMessage, CompletionBackend, CompletionRequest};
use super::{clamp_utf8, BackendError};

/// How much document text is embedded in the system prompt.
pub const CHAT_CONTEXT_LIMIT: usize = 50_000;

const ANSWER_MAX_TOKENS: u32 = 1500;
const TEMPERATURE: f32 = 0.7;

/// Answer a question against the document plus prior turns.
pub async fn answer(
    backend: &dyn CompletionBackend,
    question: &str,
    document_text: &str,
    history: &[ChatMessage],
    model: &str,
) -> Result<String, BackendError> {
    let context = clamp_utf8(document_text, CHAT_CONTEXT_LIMIT);

    let system_prompt = format!(
        "You are a professional document assistant. The user will ask \
         questions about a PDF document.\n\
         The document content is below (for reference only):\n{context}\n\n\
         Answer the user's questions based on the document content. If a \
         question is unrelated to the document, politely say so."
    );

    let mut messages = history.to_vec();
    messages.push(ChatMessage::user(question));

    backend
        .complete(CompletionRequest {
            model: model.to_string(),
            system_prompt,
            messages,
            max_tokens: ANSWER_MAX_TOKENS,
            temperature: TEMPERATURE,
        })
        .await
}
