//! Loading pages from HTML markup.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use scraper::Html;

use crate::domain::dom::Document;

/// Parse a full HTML document. Parsing is lenient: malformed markup is repaired the way a
/// browser would, so this never fails.
pub fn parse_document(source: &str) -> Document {
    let html = Html::parse_document(source);
    if !html.errors.is_empty() {
        tracing::debug!(errors = html.errors.len(), "markup repaired while parsing");
    }
    Document::from(html)
}

/// Read and parse a saved page from disk.
pub fn load_page(path: &Path) -> Result<Document> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read page: {}", path.display()))?;
    let doc = parse_document(&source);
    tracing::debug!(
        path = %path.display(),
        nodes = doc.traverse(doc.root()).count(),
        "loaded page"
    );
    Ok(doc)
}
