use crate::error::{RagError, Result};
use lopdf::Document as PdfDocument;

/// Converts a PDF byte stream into one plain-text string.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String>;
}

/// `lopdf`-backed extractor. Page texts are concatenated with a single
/// space and no per-page structure is preserved. A page whose text
/// extraction fails contributes nothing; only an unparseable byte stream
/// aborts the whole operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl TextExtractor for LopdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let document =
            PdfDocument::load_mem(bytes).map_err(|error| RagError::Extraction(error.to_string()))?;

        let mut text = String::new();
        for (page_no, _page_id) in document.get_pages() {
            let page_text = match document.extract_text(&[page_no]) {
                Ok(extracted) => extracted,
                Err(_) => continue,
            };

            if page_text.trim().is_empty() {
                continue;
            }

            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(page_text.trim());
        }

        Ok(text.trim().to_string())
    }
}
