use crate::error::{RagError, Result};
use log::{debug, info, warn};
use mime_guess::from_path;
use pdf_extract::extract_text_by_pages;
use std::fs;
use std::path::Path;

/// Page separator used by plain-text exports of paginated documents
const FORM_FEED: char = '\u{000C}';

/// A source document split into its physical pages
#[derive(Debug, Clone)]
pub struct Document {
    /// Identifier recorded on every unit derived from this document (the path as given)
    pub source: String,
    /// The document's MIME type
    pub mime_type: String,
    /// Raw text of each physical page, in order
    pub pages: Vec<String>,
}

impl Document {
    /// Open a document and extract the text of every page
    ///
    /// Either every page is read or the whole call fails with `SourceRead`.
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let path = file_path.as_ref();
        let source = path.display().to_string();

        if path.file_name().is_none() {
            return Err(source_error(&source, "invalid file name"));
        }

        // Detect MIME type
        let mime = from_path(path).first_or_octet_stream();
        let mime_type = mime.to_string();
        debug!("Detected MIME type: {}", mime_type);

        let pages = read_pages(path, &mime_type)?;
        info!("Read {} pages from {}", pages.len(), source);

        Ok(Document {
            source,
            mime_type,
            pages,
        })
    }

    /// Build a document from already extracted page texts
    pub fn from_pages(source: impl Into<String>, pages: Vec<String>) -> Self {
        Document {
            source: source.into(),
            mime_type: "text/plain".to_string(),
            pages,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Read the pages of a document based on its MIME type
pub fn read_pages<P: AsRef<Path>>(file_path: P, mime_type: &str) -> Result<Vec<String>> {
    let path = file_path.as_ref();
    let source = path.display().to_string();

    match mime_type {
        // Handle PDF documents
        mime if mime.starts_with("application/pdf") => {
            info!("Processing PDF document: {}", source);
            let pages = extract_text_by_pages(path)
                .map_err(|e| source_error(&source, &format!("failed to extract text: {}", e)))?;

            if pages.iter().all(|page| page.trim().is_empty()) {
                warn!("Extracted PDF content is empty or contains only whitespace");
            }

            Ok(pages)
        }

        // Plain text, one page per form feed
        mime if mime.starts_with("text/") => {
            info!("Processing text document: {}", source);
            let content = fs::read_to_string(path)
                .map_err(|e| source_error(&source, &format!("failed to read file: {}", e)))?;
            Ok(split_pages(&content))
        }

        // Unsupported format
        _ => Err(source_error(
            &source,
            &format!(
                "unsupported document format: {}. Only text and PDF files are supported.",
                mime_type
            ),
        )),
    }
}

/// Split text on form feeds, normalizing Windows line endings
fn split_pages(content: &str) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }

    content
        .replace('\r', "")
        .split(FORM_FEED)
        .map(str::to_string)
        .collect()
}

fn source_error(path: &str, reason: &str) -> RagError {
    RagError::SourceRead {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}
