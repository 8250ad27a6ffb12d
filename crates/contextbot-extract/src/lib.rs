//! Best-effort document text extraction.
//!
//! Turns an uploaded PDF payload into plain text for the context store.
//! Extraction is lossy by design: pages with no extractable text contribute
//! nothing, and any parser failure degrades to an empty string with a
//! warning instead of propagating to the caller.

use tracing::{debug, warn};

/// Extract plain text from a PDF payload.
///
/// Per-page text arrives newline-separated from the extractor; runs of
/// blank lines left behind by empty pages are collapsed. Never fails: a
/// document with no text layer, or bytes that are not a PDF at all, yield
/// an empty string.
pub fn extract_pdf_text(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) => {
            let cleaned = collapse_blank_runs(&text);
            debug!(chars = cleaned.len(), "PDF text extracted");
            cleaned
        }
        Err(e) => {
            warn!(error = %e, "PDF extraction failed; continuing with empty text");
            String::new()
        }
    }
}

/// Collapse runs of blank lines down to a single blank line and trim the
/// result. Pages that yielded nothing disappear entirely.
fn collapse_blank_runs(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut last_blank = true;
    for line in text.lines() {
        let blank = line.trim().is_empty();
        if blank && last_blank {
            continue;
        }
        out.push(if blank { "" } else { line.trim_end() });
        last_blank = blank;
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload_yields_empty_text() {
        assert_eq!(extract_pdf_text(&[]), "");
    }

    #[test]
    fn test_non_pdf_bytes_degrade_to_empty() {
        assert_eq!(extract_pdf_text(b"this is not a pdf"), "");
    }

    #[test]
    fn test_truncated_header_degrades_to_empty() {
        // Looks like a PDF for the first few bytes, then stops.
        assert_eq!(extract_pdf_text(b"%PDF-1.4\n"), "");
    }

    #[test]
    fn test_collapse_blank_runs() {
        let text = "page one\n\n\n\npage two\n\n";
        assert_eq!(collapse_blank_runs(text), "page one\n\npage two");
    }

    #[test]
    fn test_collapse_leading_blanks() {
        let text = "\n\n\nfirst line\nsecond line";
        assert_eq!(collapse_blank_runs(text), "first line\nsecond line");
    }

    #[test]
    fn test_collapse_all_blank_input() {
        assert_eq!(collapse_blank_runs("\n \n\t\n"), "");
    }

    #[test]
    fn test_collapse_trims_trailing_spaces() {
        assert_eq!(collapse_blank_runs("line one   \nline two\t"), "line one\nline two");
    }
}
