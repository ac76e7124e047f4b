//! PDF ingestion
//!
//! Validates uploaded bytes and extracts plain text plus lightweight
//! metadata. Page count and Info-dictionary metadata come from `lopdf`; text
//! extraction goes through `pdf-extract`, which wants a file path, so the
//! bytes take a detour through a temp directory.

use lopdf::{Document, Object};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("not a PDF file")]
    NotPdf,

    #[error("failed to load PDF: {0}")]
    Load(String),

    #[error("failed to extract text: {0}")]
    Extract(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parser task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Extracted document content and metadata.
#[derive(Debug, Clone)]
pub struct ParsedPdf {
    pub text: String,
    pub page_count: u32,
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Magic-byte check for the `%PDF` header.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && &bytes[..4] == b"%PDF"
}

/// Parse a PDF, extracting text, page count, and title/author if present.
///
/// Offloaded to a blocking task since parsing is CPU-bound.
pub async fn parse(bytes: Vec<u8>) -> Result<ParsedPdf, ParseError> {
    if !is_pdf(&bytes) {
        return Err(ParseError::NotPdf);
    }

    tokio::task::spawn_blocking(move || parse_blocking(&bytes)).await?
}

fn parse_blocking(bytes: &[u8]) -> Result<ParsedPdf, ParseError> {
    let doc = Document::load_mem(bytes).map_err(|e| ParseError::Load(e.to_string()))?;

    let page_count = doc.get_pages().len() as u32;
    let title = info_string(&doc, b"Title");
    let author = info_string(&doc, b"Author");

    // pdf-extract reads from a path; stage the bytes in a temp dir.
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("document.pdf");
    std::fs::write(&path, bytes)?;

    let text = pdf_extract::extract_text(&path).map_err(|e| ParseError::Extract(e.to_string()))?;

    Ok(ParsedPdf {
        text,
        page_count,
        title,
        author,
    })
}

/// Read a string entry from the trailer's Info dictionary.
fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info = doc.trailer.get(b"Info").ok()?;
    let info = match info {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let bytes = info.as_dict().ok()?.get(key).ok()?.as_str().ok()?;
    let value = String::from_utf8_lossy(bytes).trim().to_string();
    (!value.is_empty()).then_some(value)
}
