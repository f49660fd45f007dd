use crate::config::parsed;
use crate::document::Document;
use crate::error::{RagError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Running header printed on every page of the constitution PDF
pub const DEFAULT_HEADER: &str = "T Ü R K İ Y E  C U M H U R İ Y E T İ  A N AYA S A S I";

/// Whether a unit covers a whole page or a window of one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Page,
    Chunk,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Page => "page",
            Granularity::Chunk => "chunk",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single retrievable piece of text with its origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextUnit {
    /// The text that gets embedded and handed to the model
    pub content: String,
    /// Identifier of the source document
    pub source: String,
    /// 1-indexed physical page in the source
    pub page_number: u32,
    pub granularity: Granularity,
}

impl TextUnit {
    /// Metadata line shown next to an answer
    pub fn citation(&self) -> String {
        format!("{} - Page {}", self.source, self.page_number)
    }
}

/// Settings for turning pages into units
#[derive(Debug, Clone)]
pub struct SplitterConfig {
    /// Leading pages dropped unconditionally (front matter)
    pub skip_pages: usize,
    /// Literal removed from every page before anything else
    pub header: String,
    /// Pages whose trimmed text is shorter than this are dropped
    pub min_chars: usize,
    pub window_words: usize,
    pub overlap_words: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        SplitterConfig {
            skip_pages: 22,
            header: DEFAULT_HEADER.to_string(),
            min_chars: 10,
            window_words: 300,
            overlap_words: 50,
        }
    }
}

impl SplitterConfig {
    pub fn from_vars<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SplitterConfig::default();
        let config = SplitterConfig {
            skip_pages: parsed(lookup, "SPLIT_SKIP_PAGES", defaults.skip_pages)?,
            // The header contains double spaces, so it is read untrimmed
            header: lookup("SPLIT_HEADER")
                .filter(|h| !h.is_empty())
                .unwrap_or(defaults.header),
            min_chars: parsed(lookup, "SPLIT_MIN_CHARS", defaults.min_chars)?,
            window_words: parsed(lookup, "SPLIT_WINDOW_WORDS", defaults.window_words)?,
            overlap_words: parsed(lookup, "SPLIT_OVERLAP_WORDS", defaults.overlap_words)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Window must be larger than the overlap so every step advances
    pub fn validate(&self) -> Result<()> {
        if self.window_words == 0 {
            return Err(RagError::Configuration(
                "window size must be greater than 0".to_string(),
            ));
        }
        if self.overlap_words >= self.window_words {
            return Err(RagError::Configuration(format!(
                "window size ({}) must be greater than overlap ({})",
                self.window_words, self.overlap_words
            )));
        }
        Ok(())
    }
}

/// Page-level and chunk-level units of one document
#[derive(Debug, Clone, Default)]
pub struct SplitOutput {
    pub pages: Vec<TextUnit>,
    pub chunks: Vec<TextUnit>,
}

/// Turns a document into page units and overlapping word-window chunk units
#[derive(Debug, Clone)]
pub struct DocumentSplitter {
    config: SplitterConfig,
}

impl DocumentSplitter {
    pub fn new(config: SplitterConfig) -> Result<Self> {
        config.validate()?;
        Ok(DocumentSplitter { config })
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Split every page after the skipped front matter
    pub fn split(&self, document: &Document) -> SplitOutput {
        let mut output = SplitOutput::default();

        for (index, raw) in document.pages.iter().enumerate().skip(self.config.skip_pages) {
            let page_number = (index + 1) as u32;

            let text = if self.config.header.is_empty() {
                raw.clone()
            } else {
                raw.replace(&self.config.header, "")
            };
            let text = text.trim();

            if text.chars().count() < self.config.min_chars {
                debug!("Skipping page {}: no meaningful text", page_number);
                continue;
            }

            output.pages.push(TextUnit {
                content: text.to_string(),
                source: document.source.clone(),
                page_number,
                granularity: Granularity::Page,
            });

            for window in sliding_windows(text, self.config.window_words, self.config.overlap_words)
            {
                output.chunks.push(TextUnit {
                    content: window,
                    source: document.source.clone(),
                    page_number,
                    granularity: Granularity::Chunk,
                });
            }
        }

        info!(
            "Split {} into {} page units and {} chunk units",
            document.source,
            output.pages.len(),
            output.chunks.len()
        );

        output
    }
}

/// Split text into word windows of `window` words, each starting `window - overlap`
/// words after the previous one
///
/// The last window may be shorter. No window is emitted once a previous one already
/// reached the end of the text. Words are re-joined with single spaces.
pub fn sliding_windows(text: &str, window: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let stride = window.saturating_sub(overlap).max(1);

    let mut windows = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + window).min(words.len());
        windows.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += stride;
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(range: std::ops::Range<usize>) -> String {
        range.map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    fn document(pages: Vec<String>) -> Document {
        Document::from_pages("anayasa.pdf", pages)
    }

    fn expected_chunks(w: usize) -> usize {
        (w.saturating_sub(300) + 249) / 250 + 1
    }

    #[test]
    fn test_twenty_three_page_document() {
        let mut pages = vec!["front matter with plenty of text".to_string(); 22];
        pages.push(words(1..311));

        let splitter = DocumentSplitter::new(SplitterConfig::default()).unwrap();
        let output = splitter.split(&document(pages));

        assert_eq!(output.pages.len(), 1);
        assert_eq!(output.pages[0].page_number, 23);
        assert_eq!(output.chunks.len(), 2);
        assert_eq!(output.chunks[0].content, words(1..301));
        assert_eq!(output.chunks[1].content, words(251..311));
        assert!(output.chunks.iter().all(|c| c.page_number == 23));
        assert!(output.chunks.iter().all(|c| c.granularity == Granularity::Chunk));
    }

    #[test]
    fn test_page_numbers_after_skip_boundary() {
        let pages: Vec<String> = (1..=40).map(|p| format!("page number {} body text", p)).collect();
        let splitter = DocumentSplitter::new(SplitterConfig::default()).unwrap();
        let output = splitter.split(&document(pages));

        assert_eq!(output.pages.len(), 18);
        for unit in output.pages.iter().chain(output.chunks.iter()) {
            assert!(unit.page_number > 22);
            assert!(unit
                .content
                .contains(&format!("page number {} ", unit.page_number)));
        }
    }

    #[test]
    fn test_short_pages_are_discarded() {
        let config = SplitterConfig {
            skip_pages: 0,
            ..SplitterConfig::default()
        };
        let pages = vec![
            "   tiny   ".to_string(),
            format!("{}  12345", DEFAULT_HEADER),
            "Madde 1 - Türkiye Devleti bir Cumhuriyettir.".to_string(),
        ];
        let output = DocumentSplitter::new(config).unwrap().split(&document(pages));

        assert_eq!(output.pages.len(), 1);
        assert_eq!(output.pages[0].page_number, 3);
        assert!(output.chunks.iter().all(|c| c.page_number == 3));
    }

    #[test]
    fn test_header_is_stripped() {
        let config = SplitterConfig {
            skip_pages: 0,
            ..SplitterConfig::default()
        };
        let pages = vec![format!("{}\nMadde 2 - Cumhuriyetin nitelikleri", DEFAULT_HEADER)];
        let output = DocumentSplitter::new(config).unwrap().split(&document(pages));

        assert_eq!(output.pages[0].content, "Madde 2 - Cumhuriyetin nitelikleri");
        assert!(!output.chunks[0].content.contains("C U M H U R"));
    }

    #[test]
    fn test_empty_document() {
        let splitter = DocumentSplitter::new(SplitterConfig::default()).unwrap();
        let output = splitter.split(&document(Vec::new()));
        assert!(output.pages.is_empty());
        assert!(output.chunks.is_empty());
    }

    #[test]
    fn test_chunk_count_formula() {
        for w in [1, 50, 299, 300, 301, 550, 551, 800, 1234] {
            let chunks = sliding_windows(&words(0..w), 300, 50);
            assert_eq!(chunks.len(), expected_chunks(w), "W = {}", w);
            for chunk in &chunks {
                assert!(chunk.split_whitespace().count() <= 300);
            }
        }
    }

    #[test]
    fn test_short_page_yields_single_chunk() {
        let text = "Egemenlik kayıtsız şartsız Milletindir.";
        assert_eq!(sliding_windows(text, 300, 50), vec![text.to_string()]);
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let chunks = sliding_windows(&words(0..1000), 300, 50);
        for pair in chunks.windows(2) {
            let prev: Vec<&str> = pair[0].split_whitespace().collect();
            let next: Vec<&str> = pair[1].split_whitespace().collect();
            assert_eq!(prev[prev.len() - 50..], next[..50]);
        }
    }

    #[test]
    fn test_chunks_reconstruct_page() {
        let text = words(0..987);
        let chunks = sliding_windows(&text, 300, 50);

        let mut rebuilt: Vec<&str> = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let skip = if i == 0 { 0 } else { 50 };
            rebuilt.extend(chunk.split_whitespace().skip(skip));
        }
        assert_eq!(rebuilt.join(" "), text);
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        let chunks = sliding_windows("a\n\nb\t c   d", 300, 50);
        assert_eq!(chunks, vec!["a b c d".to_string()]);
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        let config = SplitterConfig {
            window_words: 50,
            overlap_words: 50,
            ..SplitterConfig::default()
        };
        assert!(matches!(
            DocumentSplitter::new(config),
            Err(RagError::Configuration(_))
        ));
    }

    #[test]
    fn test_citation() {
        let unit = TextUnit {
            content: "x".to_string(),
            source: "data/gerekceli_anayasa.pdf".to_string(),
            page_number: 42,
            granularity: Granularity::Page,
        };
        assert_eq!(unit.citation(), "data/gerekceli_anayasa.pdf - Page 42");
    }
}
