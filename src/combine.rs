//! Merge native and OCR results into the downloadable formats.

use crate::schema::{CombinedResult, NativeResult, OcrResult, NATIVE_SOURCE, OCR_SOURCE};
use serde::Serialize;
use tracing::error;

/// Number of characters kept in each preview.
pub const PREVIEW_CHARS: usize = 500;

const NO_NATIVE_TEXT: &str = "(No native text found)";
const NO_OCR_TEXT: &str = "(No OCR text found)";

/// Build the TXT/Markdown body, the JSON dump and both previews.
pub fn combine_results(native: &NativeResult, ocr: &OcrResult) -> CombinedResult {
    let native_source = label_or(&native.source, NATIVE_SOURCE);
    let ocr_source = label_or(&ocr.source, OCR_SOURCE);
    let native_content = native.content.trim();
    let ocr_content = ocr.content.trim();

    let combined = format!(
        "## {}\n{}\n\n## {}\n{}",
        native_source,
        non_empty_or(native_content, NO_NATIVE_TEXT),
        ocr_source,
        non_empty_or(ocr_content, NO_OCR_TEXT),
    );

    CombinedResult {
        txt: combined.clone(),
        json: to_json(native, ocr),
        md: combined,
        native_preview: preview(native_content),
        ocr_preview: preview(ocr_content),
    }
}

fn label_or<'a>(label: &'a str, default: &'a str) -> &'a str {
    if label.is_empty() {
        default
    } else {
        label
    }
}

fn non_empty_or<'a>(content: &'a str, placeholder: &'a str) -> &'a str {
    if content.is_empty() {
        placeholder
    } else {
        content
    }
}

/// First [`PREVIEW_CHARS`] characters, with `...` appended if anything was cut.
pub fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

/// Pretty-printed `{"native": …, "ocr": …}` with non-ASCII text kept literal.
/// Parses back into [`ExtractionPair`](crate::schema::ExtractionPair).
fn to_json(native: &NativeResult, ocr: &OcrResult) -> String {
    #[derive(Serialize)]
    struct Pair<'a> {
        native: &'a NativeResult,
        ocr: &'a OcrResult,
    }

    serde_json::to_string_pretty(&Pair { native, ocr }).unwrap_or_else(|e| {
        error!("Failed to serialize results: {}", e);
        "{}".to_string()
    })
}
