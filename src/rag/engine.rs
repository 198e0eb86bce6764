//! Document processing: cleaning, chunking and chunk metadata.
//!
//! Turns scraped pages into [`Chunk`]s ready for embedding:
//! - strips HTML and short boilerplate/navigation lines
//! - removes repeated paragraphs within a page
//! - splits on paragraph, sentence or word boundaries with overlap
//! - drops chunks that are mostly symbols or too short to be useful
//!
//! Processing has no side effects; it never touches the index.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::core::config::settings::{section_f64, section_u64};
use crate::core::errors::RagError;

static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<!--.*?-->").unwrap()
});
static BLOCK_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|li|ul|ol|h[1-6]|tr|table|section|article|header|footer|nav)\s*>")
        .unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static HTML_HINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?(html|body|div|p|span|a|br|script|style|h[1-6])\b").unwrap());
static PARAGRAPH_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

const BOILERPLATE_PHRASES: &[&str] = &[
    "cookie policy",
    "privacy policy",
    "terms of service",
    "terms of use",
    "all rights reserved",
    "copyright",
    "follow us on",
    "social media",
    "newsletter",
    "subscribe",
    "skip to content",
    "skip to main content",
    "back to top",
];

const NAVIGATION_LINES: &[&str] = &[
    "home", "menu", "search", "login", "sitemap", "print", "share", "close", "next", "previous",
];

/// Lines longer than this many words are kept even when they mention a
/// boilerplate phrase.
const BOILERPLATE_MAX_WORDS: usize = 12;

/// Chunking and quality thresholds. Sizes are in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    pub max_chunk_size: usize,
    pub min_chunk_size: usize,
    pub chunk_overlap: usize,
    /// chunks with fewer words are dropped
    pub min_chunk_words: usize,
    /// minimum share of alphabetic characters among non-whitespace ones
    pub min_alpha_ratio: f32,
    /// documents with fewer words after cleaning are skipped
    pub min_document_words: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 800,
            min_chunk_size: 200,
            chunk_overlap: 100,
            min_chunk_words: 5,
            min_alpha_ratio: 0.5,
            min_document_words: 8,
        }
    }
}

impl ChunkerConfig {
    pub fn from_config(config: &Value) -> Self {
        let defaults = Self::default();
        let read = |key: &str, default: usize| {
            section_u64(config, "chunker", key)
                .map(|v| v as usize)
                .unwrap_or(default)
        };

        Self {
            max_chunk_size: read("max_chunk_size", defaults.max_chunk_size),
            min_chunk_size: read("min_chunk_size", defaults.min_chunk_size),
            chunk_overlap: read("chunk_overlap", defaults.chunk_overlap),
            min_chunk_words: read("min_chunk_words", defaults.min_chunk_words),
            min_alpha_ratio: section_f64(config, "chunker", "min_alpha_ratio")
                .map(|v| v as f32)
                .unwrap_or(defaults.min_alpha_ratio),
            min_document_words: read("min_document_words", defaults.min_document_words),
        }
    }

    pub fn validate(&self) -> Result<(), RagError> {
        if self.min_chunk_size == 0 || self.min_chunk_size > self.max_chunk_size {
            return Err(RagError::Config(format!(
                "chunker requires 0 < min_chunk_size ({}) <= max_chunk_size ({})",
                self.min_chunk_size, self.max_chunk_size
            )));
        }
        if self.chunk_overlap >= self.min_chunk_size {
            return Err(RagError::Config(format!(
                "chunker.chunk_overlap ({}) must be below min_chunk_size ({})",
                self.chunk_overlap, self.min_chunk_size
            )));
        }
        Ok(())
    }
}

/// A scraped page as produced by the website crawler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(alias = "content")]
    pub raw_text: String,
    #[serde(
        default = "Utc::now",
        alias = "scraped_at",
        deserialize_with = "deserialize_timestamp"
    )]
    pub fetch_timestamp: DateTime<Utc>,
}

impl Document {
    pub fn new(url: impl Into<String>, title: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            raw_text: raw_text.into(),
            fetch_timestamp: Utc::now(),
        }
    }
}

/// Accepts RFC 3339 strings or epoch seconds; anything else means "now".
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .ok(),
        Value::Number(number) => number
            .as_f64()
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Utc.timestamp_millis_opt((secs * 1000.0) as i64).single()),
        _ => None,
    };
    Ok(parsed.unwrap_or_else(Utc::now))
}

/// Reads a crawler export: a JSON array of documents, or an object holding
/// one under `documents` or `pages`.
pub fn load_documents(path: &Path) -> Result<Vec<Document>, RagError> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content).map_err(|e| {
        RagError::InvalidInput(format!("{} is not valid JSON: {}", path.display(), e))
    })?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("documents").or_else(|| map.remove("pages")) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(RagError::InvalidInput(format!(
                    "{} has no document array",
                    path.display()
                )))
            }
        },
        _ => {
            return Err(RagError::InvalidInput(format!(
                "{} must contain a JSON array of documents",
                path.display()
            )))
        }
    };

    let mut documents = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<Document>(item) {
            Ok(doc) => documents.push(doc),
            Err(e) => tracing::warn!("Skipping entry {} in {}: {}", index, path.display(), e),
        }
    }
    Ok(documents)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    News,
    Career,
    About,
    Contact,
    Investor,
    General,
}

impl PageType {
    pub fn from_url(url: &str) -> Self {
        let path = match url::Url::parse(url) {
            Ok(parsed) => parsed.path().to_lowercase(),
            Err(_) => url.to_lowercase(),
        };
        let path = format!("{}/", path.trim_end_matches('/'));

        if path.contains("/news/") {
            PageType::News
        } else if path.contains("/career/") || path.contains("/careers/") || path.contains("/jobs/") {
            PageType::Career
        } else if path.contains("/about/") {
            PageType::About
        } else if path.contains("/contact/") {
            PageType::Contact
        } else if path.contains("/investor/") || path.contains("/investors/") {
            PageType::Investor
        } else {
            PageType::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::News => "news",
            PageType::Career => "career",
            PageType::About => "about",
            PageType::Contact => "contact",
            PageType::Investor => "investor",
            PageType::General => "general",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A retrievable span of a cleaned document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub source_url: String,
    pub source_title: String,
    /// ordinal among the chunks kept for this document
    pub position: usize,
    pub char_length: usize,
    /// character offsets into the cleaned document text
    pub start_offset: usize,
    pub end_offset: usize,
    pub page_type: PageType,
    pub fetched_at: DateTime<Utc>,
}

pub fn chunk_id(source_url: &str, start_offset: usize) -> String {
    let digest = Sha256::digest(format!("{}#{}", source_url, start_offset).as_bytes());
    hex::encode(&digest[..16])
}

#[derive(Debug, Default)]
pub struct ProcessReport {
    pub chunks: Vec<Chunk>,
    pub documents_processed: usize,
    pub documents_skipped: usize,
    pub warnings: Vec<String>,
}

pub struct DocumentProcessor {
    config: ChunkerConfig,
}

impl DocumentProcessor {
    pub fn new(config: ChunkerConfig) -> Result<Self, RagError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Cleans and chunks every document. Malformed documents are skipped and
    /// reported, never fatal.
    pub fn process(&self, documents: &[Document]) -> ProcessReport {
        let mut report = ProcessReport::default();

        for doc in documents {
            match self.process_document(doc) {
                Ok(chunks) => {
                    report.documents_processed += 1;
                    report.chunks.extend(chunks);
                }
                Err(reason) => {
                    let label = if doc.url.trim().is_empty() {
                        "<missing url>"
                    } else {
                        doc.url.as_str()
                    };
                    tracing::warn!("Skipping document {}: {}", label, reason);
                    report.documents_skipped += 1;
                    report.warnings.push(format!("{}: {}", label, reason));
                }
            }
        }

        tracing::info!(
            "Processed {} documents into {} chunks ({} skipped)",
            report.documents_processed,
            report.chunks.len(),
            report.documents_skipped
        );
        report
    }

    fn process_document(&self, doc: &Document) -> Result<Vec<Chunk>, String> {
        let url = doc.url.trim();
        if url.is_empty() {
            return Err("document has no url".to_string());
        }
        if url::Url::parse(url).is_err() {
            return Err("url is not absolute".to_string());
        }
        if doc.raw_text.trim().is_empty() {
            return Err("document has no text".to_string());
        }

        let cleaned = clean_text(&doc.raw_text);
        let word_count = cleaned.split_whitespace().count();
        if word_count < self.config.min_document_words {
            return Err(format!(
                "only {} words after cleaning (minimum {})",
                word_count, self.config.min_document_words
            ));
        }

        let chars: Vec<char> = cleaned.chars().collect();
        let page_type = PageType::from_url(url);
        let title = doc.title.trim();
        let mut seen = HashSet::new();
        let mut chunks = Vec::new();

        for (start, end) in split_spans(&chars, &self.config) {
            let text: String = chars[start..end].iter().collect();
            if !self.passes_quality(&text) || !seen.insert(normalize_for_dedup(&text)) {
                continue;
            }

            chunks.push(Chunk {
                id: chunk_id(url, start),
                char_length: end - start,
                text,
                source_url: url.to_string(),
                source_title: title.to_string(),
                position: chunks.len(),
                start_offset: start,
                end_offset: end,
                page_type,
                fetched_at: doc.fetch_timestamp,
            });
        }

        if chunks.is_empty() {
            return Err("no chunk passed the quality filter".to_string());
        }
        Ok(chunks)
    }

    fn passes_quality(&self, text: &str) -> bool {
        if text.split_whitespace().count() < self.config.min_chunk_words {
            return false;
        }
        let mut visible = 0usize;
        let mut alphabetic = 0usize;
        for c in text.chars().filter(|c| !c.is_whitespace()) {
            visible += 1;
            if c.is_alphabetic() {
                alphabetic += 1;
            }
        }
        visible > 0 && alphabetic as f32 / visible as f32 >= self.config.min_alpha_ratio
    }
}

/// Cleans raw page text into paragraphs separated by blank lines, with
/// single spaces inside each paragraph.
pub fn clean_text(raw: &str) -> String {
    let text = if HTML_HINT_RE.is_match(raw) {
        strip_html_tags(raw)
    } else {
        raw.replace("\r\n", "\n")
    };

    let mut seen = HashSet::new();
    let mut paragraphs = Vec::new();

    for block in PARAGRAPH_SPLIT_RE.split(&text) {
        let kept: Vec<&str> = block
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !is_boilerplate_line(line))
            .collect();
        let paragraph = kept.join(" ").split_whitespace().collect::<Vec<_>>().join(" ");
        if paragraph.is_empty() {
            continue;
        }
        if seen.insert(normalize_for_dedup(&paragraph)) {
            paragraphs.push(paragraph);
        }
    }

    paragraphs.join("\n\n")
}

fn strip_html_tags(html: &str) -> String {
    let without_code = SCRIPT_STYLE_RE.replace_all(html, " ");
    let with_breaks = BLOCK_TAG_RE.replace_all(&without_code, "\n\n");
    let text = TAG_RE.replace_all(&with_breaks, " ");

    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("\r\n", "\n")
}

fn is_boilerplate_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    let words = lower.split_whitespace().count();
    if words <= 2 && NAVIGATION_LINES.contains(&lower.trim_matches(|c: char| !c.is_alphanumeric())) {
        return true;
    }
    words <= BOILERPLATE_MAX_WORDS && BOILERPLATE_PHRASES.iter().any(|p| lower.contains(p))
}

fn normalize_for_dedup(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Computes `[start, end)` character spans over cleaned text.
///
/// Every span except the last is between `min_chunk_size` and
/// `max_chunk_size` characters long. Consecutive spans overlap by at most
/// `chunk_overlap` characters and the next span always starts on a word.
fn split_spans(chars: &[char], config: &ChunkerConfig) -> Vec<(usize, usize)> {
    let total = chars.len();
    let mut spans = Vec::new();
    let mut start = skip_whitespace(chars, 0);

    while start < total {
        if total - start <= config.max_chunk_size {
            spans.push((start, total));
            break;
        }

        let lo = start + config.min_chunk_size;
        let hi = start + config.max_chunk_size;
        let end = find_split_point(chars, lo, hi).unwrap_or(hi);
        spans.push((start, end));

        let mut next = end - config.chunk_overlap.min(end - start - 1);
        if next > start && !chars[next - 1].is_whitespace() {
            while next < end && !chars[next].is_whitespace() {
                next += 1;
            }
        }
        start = skip_whitespace(chars, next);
    }

    spans
}

/// Finds the best exclusive end in `[lo, hi]`: a paragraph break, else a
/// sentence end, else a word boundary. `hi` must be below `chars.len()`.
fn find_split_point(chars: &[char], lo: usize, hi: usize) -> Option<usize> {
    let ends_word = |e: usize| chars[e].is_whitespace() && !chars[e - 1].is_whitespace();

    let paragraph = (lo..=hi)
        .rev()
        .find(|&e| ends_word(e) && chars[e] == '\n' && chars.get(e + 1) == Some(&'\n'));
    if paragraph.is_some() {
        return paragraph;
    }

    let sentence = (lo..=hi)
        .rev()
        .find(|&e| ends_word(e) && matches!(chars[e - 1], '.' | '!' | '?'));
    if sentence.is_some() {
        return sentence;
    }

    (lo..=hi).rev().find(|&e| ends_word(e))
}

fn skip_whitespace(chars: &[char], mut index: usize) -> usize {
    while index < chars.len() && chars[index].is_whitespace() {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn small_config() -> ChunkerConfig {
        ChunkerConfig {
            max_chunk_size: 120,
            min_chunk_size: 60,
            chunk_overlap: 20,
            min_chunk_words: 3,
            min_alpha_ratio: 0.5,
            min_document_words: 5,
        }
    }

    fn prose() -> String {
        let sentences = [
            "GAIL operates a large natural gas pipeline network across India.",
            "The company also markets liquefied natural gas and petrochemicals.",
            "Its city gas distribution projects supply homes and vehicles.",
            "Renewable energy investments include solar and wind capacity.",
            "Corporate social responsibility programmes focus on health and education.",
            "The head office is located in New Delhi.",
        ];
        format!(
            "{} {}\n\n{} {}\n\n{} {}",
            sentences[0], sentences[1], sentences[2], sentences[3], sentences[4], sentences[5]
        )
    }

    #[test]
    fn chunks_respect_size_bounds_and_overlap() {
        let config = small_config();
        let processor = DocumentProcessor::new(config.clone()).unwrap();
        let report = processor.process(&[Document::new(
            "https://gailonline.com/about/overview",
            "Overview",
            prose(),
        )]);

        assert_eq!(report.documents_processed, 1);
        let chunks = &report.chunks;
        assert!(chunks.len() > 2);
        let last = chunks.len() - 1;
        for (i, chunk) in chunks.iter().enumerate() {
            assert!(chunk.char_length <= config.max_chunk_size);
            if i != last {
                assert!(chunk.char_length >= config.min_chunk_size, "chunk {} too short", i);
            }
            assert_eq!(chunk.char_length, chunk.text.chars().count());
            assert_eq!(chunk.position, i);
            assert_eq!(chunk.page_type, PageType::About);
        }
        for pair in chunks.windows(2) {
            let overlap = pair[0].end_offset.saturating_sub(pair[1].start_offset);
            assert!(overlap <= config.chunk_overlap);
            assert!(pair[1].start_offset > pair[0].start_offset);
        }
    }

    #[test]
    fn offsets_reassemble_cleaned_text() {
        let processor = DocumentProcessor::new(small_config()).unwrap();
        let raw = prose();
        let cleaned: Vec<char> = clean_text(&raw).chars().collect();
        let report = processor.process(&[Document::new("https://gailonline.com/x", "X", raw)]);

        let mut covered = vec![false; cleaned.len()];
        for chunk in &report.chunks {
            let slice: String = cleaned[chunk.start_offset..chunk.end_offset].iter().collect();
            assert_eq!(slice, chunk.text);
            for flag in &mut covered[chunk.start_offset..chunk.end_offset] {
                *flag = true;
            }
        }
        for (i, c) in cleaned.iter().enumerate() {
            assert!(covered[i] || c.is_whitespace(), "char {} not covered", i);
        }
    }

    #[test]
    fn splits_prefer_sentence_and_paragraph_ends() {
        let processor = DocumentProcessor::new(small_config()).unwrap();
        let report = processor.process(&[Document::new("https://gailonline.com/x", "X", prose())]);
        let last = report.chunks.len() - 1;
        for chunk in &report.chunks[..last] {
            assert!(chunk.text.ends_with('.'), "unexpected split: {:?}", chunk.text);
        }
    }

    #[test]
    fn single_long_word_gets_hard_cut() {
        let config = small_config();
        let chars: Vec<char> = "x".repeat(300).chars().collect();
        let spans = split_spans(&chars, &config);
        assert_eq!(spans[0], (0, config.max_chunk_size));
        assert_eq!(spans.last().map(|s| s.1), Some(300));
    }

    #[test]
    fn html_and_boilerplate_are_removed() {
        let html = r#"
            <html><head><style>body { color: red; }</style><script>var x = 1;</script></head>
            <body>
              <nav><a href="/">Home</a></nav>
              <h1>Pipeline Network</h1>
              <p>GAIL operates over 16,000 km of natural gas pipelines &amp; terminals.</p>
              <p>GAIL operates over 16,000 km of natural gas pipelines &amp; terminals.</p>
              <footer><p>Copyright 2024 GAIL. All rights reserved.</p><p>Follow us on social media</p></footer>
            </body></html>
        "#;

        let cleaned = clean_text(html);
        assert!(cleaned.contains("Pipeline Network"));
        assert!(cleaned.contains("pipelines & terminals"));
        assert!(!cleaned.contains("var x"));
        assert!(!cleaned.contains("color: red"));
        assert!(!cleaned.to_lowercase().contains("copyright"));
        assert!(!cleaned.to_lowercase().contains("follow us"));
        assert!(!cleaned.contains("Home"));
        assert_eq!(cleaned.matches("16,000 km").count(), 1);
    }

    #[test]
    fn long_lines_mentioning_policies_are_kept() {
        let text = "The privacy policy of the gas marketing division explains how customer consumption data from city gas networks is stored and processed.";
        assert_eq!(clean_text(text), text);
    }

    #[test]
    fn malformed_documents_are_skipped_not_fatal() {
        let processor = DocumentProcessor::new(ChunkerConfig::default()).unwrap();
        let report = processor.process(&[
            Document::new("", "No url", "Some text that would otherwise be perfectly fine to index."),
            Document::new("https://gailonline.com/empty", "Empty", "   "),
            Document::new("https://gailonline.com/short", "Short", "Too short."),
            Document::new("https://gailonline.com/symbols", "Symbols", "12345 67890 !!!! #### $$$$ %%%% 1111 2222 3333"),
            Document::new(
                "https://gailonline.com/news/q3",
                "Q3",
                "GAIL reported higher gas transmission volumes and marketing margins in the third quarter.",
            ),
        ]);

        assert_eq!(report.documents_processed, 1);
        assert_eq!(report.documents_skipped, 4);
        assert_eq!(report.warnings.len(), 4);
        assert_eq!(report.chunks.len(), 1);
        assert_eq!(report.chunks[0].page_type, PageType::News);
    }

    #[test]
    fn chunk_ids_are_stable_per_url_and_offset() {
        assert_eq!(chunk_id("https://a/x", 0), chunk_id("https://a/x", 0));
        assert_ne!(chunk_id("https://a/x", 0), chunk_id("https://a/x", 1));
        assert_ne!(chunk_id("https://a/x", 0), chunk_id("https://a/y", 0));
        assert_eq!(chunk_id("https://a/x", 0).len(), 32);
    }

    #[test]
    fn page_type_follows_url_path() {
        assert_eq!(PageType::from_url("https://gailonline.com/news/2024"), PageType::News);
        assert_eq!(PageType::from_url("https://gailonline.com/jobs/apply"), PageType::Career);
        assert_eq!(PageType::from_url("https://gailonline.com/investor"), PageType::Investor);
        assert_eq!(PageType::from_url("https://gailonline.com/contact/"), PageType::Contact);
        assert_eq!(PageType::from_url("https://gailonline.com/newsroom"), PageType::General);
    }

    #[test]
    fn config_validation_rejects_inverted_bounds() {
        let mut config = ChunkerConfig::default();
        config.min_chunk_size = 900;
        assert!(config.validate().is_err());
        assert!(DocumentProcessor::new(config).is_err());
    }

    #[test]
    fn documents_deserialize_from_crawler_export() {
        let doc: Document = serde_json::from_value(json!({
            "url": "https://gailonline.com/about",
            "title": "About",
            "content": "GAIL is India's largest gas company.",
            "scraped_at": 1_700_000_000.5
        }))
        .unwrap();
        assert_eq!(doc.raw_text, "GAIL is India's largest gas company.");
        assert_eq!(doc.fetch_timestamp.timestamp(), 1_700_000_000);

        let doc: Document = serde_json::from_value(json!({
            "url": "https://gailonline.com/about",
            "raw_text": "text",
            "fetch_timestamp": "2024-03-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(doc.fetch_timestamp.to_rfc3339(), "2024-03-01T10:00:00+00:00");
        assert!(doc.title.is_empty());
    }

    #[test]
    fn load_documents_accepts_array_and_wrapped_exports() {
        let dir = tempfile::tempdir().unwrap();
        let array_path = dir.path().join("pages.json");
        std::fs::write(
            &array_path,
            json!([
                { "url": "https://gailonline.com/a", "title": "A", "content": "alpha" },
                { "title": "missing url and text" }
            ])
            .to_string(),
        )
        .unwrap();
        let docs = load_documents(&array_path).unwrap();
        assert_eq!(docs.len(), 1);

        let wrapped_path = dir.path().join("wrapped.json");
        std::fs::write(
            &wrapped_path,
            json!({ "pages": [{ "url": "https://gailonline.com/b", "content": "beta" }] }).to_string(),
        )
        .unwrap();
        assert_eq!(load_documents(&wrapped_path).unwrap()[0].url, "https://gailonline.com/b");

        let bad_path = dir.path().join("bad.json");
        std::fs::write(&bad_path, "{ not json").unwrap();
        assert!(matches!(load_documents(&bad_path), Err(RagError::InvalidInput(_))));
    }
}
