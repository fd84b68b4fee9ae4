//! PDF text extraction.
//!
//! Wraps pdf-extract and normalizes the result: whitespace runs collapse to a
//! single space, the ends are trimmed and everything is lowercased.

use std::any::Any;
use std::fmt;
use std::panic;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::ExtractError;

/// Normalized text of the session's document. Cheap to clone, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentText(Arc<str>);

impl DocumentText {
    /// Wrap raw text, normalizing it on the way in.
    pub fn new(raw: &str) -> Self {
        Self(Arc::from(normalize_text(raw)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for DocumentText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collapse whitespace runs, trim and lowercase.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Extract the text of every page, in order, from in-memory PDF bytes.
///
/// pdf-extract panics on some well-formed but unusual files (a content stream
/// naming a font the page does not define, for one). Those panics are caught
/// and reported as [`ExtractError::Parse`] like any other unreadable file.
pub fn extract_from_bytes(bytes: &[u8]) -> Result<DocumentText, ExtractError> {
    let raw = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|payload| {
            let detail = panic_message(payload.as_ref());
            warn!("PDF extraction panicked: {detail}");
            ExtractError::Parse(detail)
        })?
        .map_err(|e| ExtractError::Parse(e.to_string()))?;
    debug!("Extracted {} raw chars from PDF", raw.len());
    Ok(DocumentText::new(&raw))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unsupported PDF structure".to_string()
    }
}

/// Load the document the session answers questions about.
///
/// A document that normalizes to nothing is refused, since no question could
/// ever be submitted against it.
pub fn load_document(path: &Path) -> Result<DocumentText, ExtractError> {
    let bytes = std::fs::read(path).map_err(|source| ExtractError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;

    let text = extract_from_bytes(&bytes)?;
    if text.is_empty() {
        return Err(ExtractError::Empty);
    }

    info!("Loaded {} ({} chars)", path.display(), text.len());
    Ok(text)
}

/// Generated PDFs for tests, shared by the unit and integration suites.
#[doc(hidden)]
pub mod fixture {
    /// Build a minimal single-font PDF with one text line per page.
    pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        let page_count = pages.len();
        let font_id = 3 + 2 * page_count;
        let mut objects: Vec<String> = Vec::new();

        objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
        let kids: Vec<String> = (0..page_count).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
        objects.push(format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            page_count
        ));

        for (i, text) in pages.iter().enumerate() {
            let content_id = 4 + 2 * i;
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 {font_id} 0 R >> >> /Contents {content_id} 0 R >>"
            ));
            let stream = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
            objects.push(format!(
                "<< /Length {} >>\nstream\n{stream}\nendstream",
                stream.len()
            ));
        }

        objects.push(
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
        );

        let mut out = String::from("%PDF-1.4\n");
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.push_str(&format!("{} 0 obj\n{body}\nendobj\n", i + 1));
        }

        let xref_at = out.len();
        out.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
        out.push_str("0000000000 65535 f \n");
        for offset in offsets {
            out.push_str(&format!("{offset:010} 00000 n \n"));
        }
        out.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        ));

        out.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::pdf_with_pages;
    use super::*;

    #[test]
    fn normalize_collapses_trims_and_lowercases() {
        assert_eq!(
            normalize_text("  Water\tBoils \n\n at   100 Degrees  "),
            "water boils at 100 degrees"
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = ["", "   ", "A  b\r\nC", "already normal text", "\u{a0}Mixed\u{2003}SPACE"];
        for input in inputs {
            let once = normalize_text(input);
            assert_eq!(normalize_text(&once), once, "input: {input:?}");
            assert!(!once.contains("  "));
            assert_eq!(once, once.to_lowercase());
        }
    }

    #[test]
    fn extracts_and_normalizes_pdf_text() {
        let pdf = pdf_with_pages(&["Water boils at 100 degrees Celsius."]);
        let text = extract_from_bytes(&pdf).unwrap();
        assert_eq!(text.as_str(), "water boils at 100 degrees celsius.");
    }

    #[test]
    fn pages_are_concatenated_in_order() {
        let pdf = pdf_with_pages(&["First page", "Second page"]);
        let text = extract_from_bytes(&pdf).unwrap();
        let first = text.as_str().find("first page").unwrap();
        let second = text.as_str().find("second page").unwrap();
        assert!(first < second);
    }

    #[test]
    fn garbage_bytes_are_a_parse_error() {
        let result = extract_from_bytes(b"definitely not a pdf");
        assert!(matches!(result, Err(ExtractError::Parse(_))));
    }

    #[test]
    fn undefined_font_is_a_parse_error_not_a_panic() {
        let pdf = String::from_utf8(pdf_with_pages(&["Hello"]))
            .unwrap()
            .replace("/F1 12 Tf", "/F9 12 Tf");
        let result = extract_from_bytes(pdf.as_bytes());
        assert!(matches!(result, Err(ExtractError::Parse(_))), "{result:?}");
    }

    #[test]
    fn header_only_pdf_is_a_parse_error() {
        assert!(matches!(extract_from_bytes(b"%PDF-1.4\n"), Err(ExtractError::Parse(_))));
    }

    #[test]
    fn missing_file_is_a_file_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("science.pdf");
        match load_document(&path) {
            Err(ExtractError::FileAccess { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected FileAccess, got {other:?}"),
        }
    }

    #[test]
    fn load_document_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("science.pdf");
        std::fs::write(&path, pdf_with_pages(&["Plants   need LIGHT"])).unwrap();
        let text = load_document(&path).unwrap();
        assert_eq!(text.as_str(), "plants need light");
    }
}
