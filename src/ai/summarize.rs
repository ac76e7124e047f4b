//! Chunked summarization pipeline
//!
//! Reduces document text of unbounded length to one summary under a hard
//! bound on backend calls. Short texts are summarized with a single call;
//! long texts are split into paragraph-aligned chunks, each chunk is
//! summarized sequentially in document order, and the concatenated chunk
//! summaries are reduced with exactly one final call. Content past the chunk
//! cap is dropped: coverage is traded for cost and latency predictability.

use super::backend::{ChatMessage, CompletionBackend, CompletionRequest};
use super::{clamp_utf8, BackendError};

/// Texts at or under this size are summarized with a single call.
pub const SINGLE_CALL_THRESHOLD: usize = 50_000;

/// Upper bound on chunk calls regardless of document length.
pub const MAX_CHUNKS: usize = 10;

/// Hard clamp on any single prompt's document payload.
const PROMPT_INPUT_LIMIT: usize = 100_000;

const SUMMARY_MAX_TOKENS: u32 = 2000;
const TEMPERATURE: f32 = 0.7;

const SYSTEM_PROMPT: &str =
    "You are a professional document summarization assistant, skilled at \
     extracting key information from long documents and producing clear, \
     structured summaries.";

/// Summarize `text`, chunking as needed.
///
/// Any backend failure aborts the whole operation; partial chunk summaries
/// are discarded, never cached or returned.
pub async fn summarize(
    backend: &dyn CompletionBackend,
    text: &str,
    model: &str,
) -> Result<String, BackendError> {
    if text.len() <= SINGLE_CALL_THRESHOLD {
        tracing::debug!(len = text.len(), "text fits in one call");
        return summarize_once(backend, text, model).await;
    }

    let chunks = build_chunks(text, SINGLE_CALL_THRESHOLD, MAX_CHUNKS);
    tracing::info!(
        len = text.len(),
        chunks = chunks.len(),
        "summarizing long document in chunks"
    );

    // Sequential on purpose: the reduction step reads chunk summaries in
    // document order, and sequential calls keep backend rate limits simple.
    let mut summaries = Vec::with_capacity(chunks.len());
    for (index, chunk) in chunks.iter().enumerate() {
        tracing::debug!(
            chunk = index + 1,
            total = chunks.len(),
            size = chunk.len(),
            "summarizing chunk"
        );
        summaries.push(summarize_once(backend, chunk, model).await?);
    }

    if summaries.len() == 1 {
        return Ok(summaries.remove(0));
    }

    // Single reduction pass, never recursive: the combined summaries go
    // through one more call whatever their length (the prompt clamp applies).
    let combined = summaries.join("\n\n");
    tracing::debug!(combined_len = combined.len(), "reducing chunk summaries");
    summarize_once(backend, &combined, model).await
}

/// One base-case summarization call with the fixed instruction template.
async fn summarize_once(
    backend: &dyn CompletionBackend,
    text: &str,
    model: &str,
) -> Result<String, BackendError> {
    let input = clamp_utf8(text, PROMPT_INPUT_LIMIT);
    let prompt = format!(
        "Generate a detailed, structured summary of the following document \
         content. The summary should include:\n\
         1. The document's primary topic and purpose\n\
         2. Key points (3-5)\n\
         3. Important details and figures\n\
         4. Conclusions or recommendations (if present)\n\n\
         Keep it professional and accurate.\n\n\
         Document content:\n{input}"
    );

    backend
        .complete(CompletionRequest {
            model: model.to_string(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: SUMMARY_MAX_TOKENS,
            temperature: TEMPERATURE,
        })
        .await
}

/// Split text into non-empty paragraphs on blank-line boundaries.
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    paragraphs
}

/// Greedily pack paragraphs into at most `max_chunks` chunks.
///
/// A chunk closes when appending the next paragraph would push it over
/// `max_chunk_size`. Paragraphs remaining once the cap is hit are dropped.
fn build_chunks(text: &str, max_chunk_size: usize, max_chunks: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in split_paragraphs(text) {
        if !current.is_empty() && current.len() + paragraph.len() > max_chunk_size {
            chunks.push(std::mem::take(&mut current));
            if chunks.len() >= max_chunks {
                tracing::warn!(
                    max_chunks,
                    "document exceeds chunk cap, truncating remaining text"
                );
                return chunks;
            }
            current = paragraph;
        } else {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(&paragraph);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Backend double that records every prompt it receives.
    #[derive(Default)]
    struct MockBackend {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionBackend for MockBackend {
        async fn complete(&self, request: CompletionRequest) -> Result<String, BackendError> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(request.messages[0].content.clone());
            Ok(format!("summary-{}", prompts.len()))
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl CompletionBackend for FailingBackend {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, BackendError> {
            Err(BackendError::MalformedResponse)
        }
    }

    /// `count` numbered paragraphs of ~1000 chars each.
    fn paragraphs(count: usize) -> String {
        (0..count)
            .map(|i| format!("paragraph {i:04} {}", "x".repeat(985)))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[test]
    fn split_paragraphs_handles_whitespace_blank_lines() {
        let text = "first\nstill first\n\nsecond\n   \nthird\n\n\n";
        let paragraphs = split_paragraphs(text);
        assert_eq!(paragraphs, vec!["first\nstill first", "second", "third"]);
    }

    #[test]
    fn chunks_respect_size_and_order() {
        let text = paragraphs(150); // ~150k chars, 3x threshold
        let chunks = build_chunks(&text, SINGLE_CALL_THRESHOLD, MAX_CHUNKS);

        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.len() <= SINGLE_CALL_THRESHOLD);
        }
        assert!(chunks[0].starts_with("paragraph 0000"));
        // Document order across chunk boundaries.
        let mut last_seen = -1i64;
        for chunk in &chunks {
            let first: i64 = chunk[10..14].parse().unwrap();
            assert!(first > last_seen);
            last_seen = first;
        }
    }

    #[test]
    fn chunk_cap_drops_trailing_content() {
        let text = paragraphs(500); // ~500k chars
        let chunks = build_chunks(&text, SINGLE_CALL_THRESHOLD, MAX_CHUNKS);

        assert_eq!(chunks.len(), MAX_CHUNKS);
        // The tail of the document is truncated, by policy.
        assert!(!chunks.iter().any(|c| c.contains("paragraph 0499")));
    }

    #[test]
    fn oversized_single_paragraph_stays_one_chunk() {
        let text = "y".repeat(60_000);
        let chunks = build_chunks(&text, SINGLE_CALL_THRESHOLD, MAX_CHUNKS);
        assert_eq!(chunks.len(), 1);
    }

    #[tokio::test]
    async fn short_text_uses_exactly_one_call() {
        let backend = MockBackend::default();
        let result = summarize(&backend, "a short document", "test-model")
            .await
            .unwrap();

        assert_eq!(result, "summary-1");
        assert_eq!(backend.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn long_text_maps_then_reduces_once() {
        let backend = MockBackend::default();
        let text = paragraphs(150);
        summarize(&backend, &text, "test-model").await.unwrap();

        let prompts = backend.prompts.lock().unwrap();
        let chunk_count = build_chunks(&text, SINGLE_CALL_THRESHOLD, MAX_CHUNKS).len();
        assert!(chunk_count >= 2);
        // One call per chunk plus exactly one reduction call.
        assert_eq!(prompts.len(), chunk_count + 1);
        // Chunk calls arrive in document order.
        assert!(prompts[0].contains("paragraph 0000"));
        // The final call reduces the chunk summaries, not source text.
        let reduce = prompts.last().unwrap();
        assert!(reduce.contains("summary-1"));
        assert!(reduce.contains(&format!("summary-{chunk_count}")));
        assert!(!reduce.contains("paragraph 0000"));
    }

    #[tokio::test]
    async fn pathological_document_makes_max_chunks_plus_one_calls() {
        // 500k chars with a 50k threshold and a cap of 10 chunks.
        let backend = MockBackend::default();
        let text = paragraphs(500);
        assert!(text.len() >= 490_000);

        summarize(&backend, &text, "test-model").await.unwrap();

        let prompts = backend.prompts.lock().unwrap();
        assert_eq!(prompts.len(), MAX_CHUNKS + 1);
    }

    #[tokio::test]
    async fn backend_failure_propagates_without_partial_result() {
        let text = paragraphs(150);
        let result = summarize(&FailingBackend, &text, "test-model").await;
        assert!(matches!(result, Err(BackendError::MalformedResponse)));
    }
}
