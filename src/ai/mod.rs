//! Generative AI integration
//!
//! - `backend`: the completion backend seam and its OpenRouter implementation
//! - `summarize`: chunked map-then-reduce summarization for long documents
//! - `chat`: single-call question answering grounded on a document prefix

mod backend;
pub mod chat;
pub mod summarize;

pub use backend::{
    BackendError, ChatMessage, CompletionBackend, CompletionRequest, MessageRole,
    OpenRouterBackend,
};

/// Truncate to at most `max_bytes`, backing off to a character boundary.
pub(crate) fn clamp_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
