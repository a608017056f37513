//! Source file discovery and text extraction.
//!
//! Every loaded page carries the [`SourceMetadata`] later shown under
//! `Sources:` in the chat output.

use std::path::{Path, PathBuf};

use scraper::{Html, Selector};
use walkdir::WalkDir;

use docchat_types::document::SourceMetadata;

use super::IngestError;

/// Kinds of file the loader understands, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Text,
    Markdown,
    Html,
    Pdf,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "txt" => Some(Self::Text),
            "md" | "markdown" => Some(Self::Markdown),
            "html" | "htm" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// One page of extracted text.
#[derive(Debug, Clone)]
pub struct LoadedPage {
    pub text: String,
    pub kind: SourceKind,
    pub source: SourceMetadata,
}

/// All supported files under `dir`, sorted for a stable ingestion order.
pub fn discover_files(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    if !dir.is_dir() {
        return Err(IngestError::NotADirectory(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!("skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| SourceKind::from_path(p).is_some())
        .collect();

    files.sort();
    Ok(files)
}

/// Extract the pages of one file. Pages with no text are omitted.
pub fn load_file(path: &Path) -> Result<Vec<LoadedPage>, IngestError> {
    let kind = SourceKind::from_path(path)
        .ok_or_else(|| IngestError::Unsupported(path.to_path_buf()))?;

    let pages = match kind {
        SourceKind::Text | SourceKind::Markdown => {
            let text = read_to_string(path)?;
            vec![page(text, kind, path.display().to_string(), 1)]
        }
        SourceKind::Html => {
            let html = read_to_string(path)?;
            let (text, canonical) = extract_html(&html);
            let url = canonical.unwrap_or_else(|| path.display().to_string());
            vec![page(text, kind, url, 1)]
        }
        SourceKind::Pdf => load_pdf(path)?,
    };

    Ok(pages
        .into_iter()
        .filter(|p| !p.text.trim().is_empty())
        .collect())
}

fn page(text: String, kind: SourceKind, url: String, page: u32) -> LoadedPage {
    LoadedPage {
        text,
        kind,
        source: SourceMetadata { url, page },
    }
}

fn read_to_string(path: &Path) -> Result<String, IngestError> {
    let bytes = std::fs::read(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Elements whose text is never rendered.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Visible body text of an HTML document, plus its canonical URL if it
/// declares one (`<link rel="canonical">` or `og:url`).
pub fn extract_html(html: &str) -> (String, Option<String>) {
    let document = Html::parse_document(html);

    let mut text = String::new();
    if let Ok(body_selector) = Selector::parse("body") {
        if let Some(body) = document.select(&body_selector).next() {
            for node in body.descendants() {
                let Some(piece) = node.value().as_text() else {
                    continue;
                };
                let hidden = node.ancestors().any(|a| {
                    a.value()
                        .as_element()
                        .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
                });
                if hidden {
                    continue;
                }
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    if !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(trimmed);
                }
            }
        }
    }

    let canonical = [
        ("link[rel=\"canonical\"]", "href"),
        ("meta[property=\"og:url\"]", "content"),
    ]
    .iter()
    .find_map(|(selector, attr)| {
        let selector = Selector::parse(selector).ok()?;
        document
            .select(&selector)
            .next()?
            .value()
            .attr(attr)
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
    });

    (text, canonical)
}

fn load_pdf(path: &Path) -> Result<Vec<LoadedPage>, IngestError> {
    let bytes = std::fs::read(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc = lopdf::Document::load_mem(&bytes).map_err(|e| IngestError::Pdf {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let url = path.display().to_string();
    let mut pages = Vec::new();
    for page_number in doc.get_pages().keys().copied() {
        match doc.extract_text(&[page_number]) {
            Ok(text) => pages.push(page(text, SourceKind::Pdf, url.clone(), page_number)),
            Err(e) => {
                tracing::debug!(page = page_number, "no text extracted from {url}: {e}");
            }
        }
    }

    if pages.is_empty() {
        tracing::warn!("{url} has no extractable text (image-only or encrypted PDF?)");
    }
    Ok(pages)
}
