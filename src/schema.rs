//! Extraction result records.
//!
//! Each record is built once per upload and never mutated afterwards. Optional
//! keys are explicit `Option` fields; `#[serde(default)]` lets a partially
//! populated JSON document deserialize with the same defaults the extractors use.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label carried by every native-text result.
pub const NATIVE_SOURCE: &str = "Native Text";

/// Label carried by every OCR result.
pub const OCR_SOURCE: &str = "OCR Text from Images";

// ============================================================================
// Native text
// ============================================================================

/// Text layer of a single page (always 1-indexed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativePage {
    pub page: u32,
    pub text: String,
    /// Why `text` is empty when the page's text layer could not be decoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Output of the native text extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeResult {
    #[serde(default = "native_source")]
    pub source: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub pages: Vec<NativePage>,
    #[serde(default)]
    pub page_count: usize,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub error: Option<String>,
}

fn native_source() -> String {
    NATIVE_SOURCE.to_string()
}

impl Default for NativeResult {
    fn default() -> Self {
        Self {
            source: native_source(),
            content: String::new(),
            pages: Vec::new(),
            page_count: 0,
            metadata: BTreeMap::new(),
            error: None,
        }
    }
}

impl NativeResult {
    /// Result for an input that could not be processed at all.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Assemble a successful result; `content` and `page_count` derive from `pages`.
    pub fn from_pages(pages: Vec<NativePage>, metadata: BTreeMap<String, String>) -> Self {
        let content = pages
            .iter()
            .map(|p| format!("--- Page {} ---\n{}\n", p.page, p.text))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();

        Self {
            source: native_source(),
            content,
            page_count: pages.len(),
            pages,
            metadata,
            error: None,
        }
    }
}

// ============================================================================
// OCR
// ============================================================================

/// How the OCR'd image was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageMethod {
    /// A raster image object embedded in the page.
    #[default]
    Embedded,
    /// The whole page rasterised because it had no embedded images.
    RenderedPage,
}

/// OCR output for one image on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrImage {
    pub index: u32,
    #[serde(default)]
    pub ocr: String,
    #[serde(default)]
    pub method: ImageMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// All OCR entries for a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrPage {
    pub page: u32,
    #[serde(default)]
    pub images: Vec<OcrImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrDebug {
    #[serde(default)]
    pub pages_total: usize,
}

/// Output of the OCR extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    #[serde(default)]
    pub pages: Vec<OcrPage>,
    #[serde(default)]
    pub image_count: usize,
    #[serde(default)]
    pub content: String,
    #[serde(default = "ocr_source")]
    pub source: String,
    #[serde(default)]
    pub debug: OcrDebug,
    /// Set only when the document could not be processed at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn ocr_source() -> String {
    OCR_SOURCE.to_string()
}

impl Default for OcrResult {
    fn default() -> Self {
        Self {
            pages: Vec::new(),
            image_count: 0,
            content: String::new(),
            source: ocr_source(),
            debug: OcrDebug::default(),
            error: None,
        }
    }
}

impl OcrResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

// ============================================================================
// Combined
// ============================================================================

/// Both raw results, as serialized into the JSON download.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionPair {
    #[serde(default)]
    pub native: NativeResult,
    #[serde(default)]
    pub ocr: OcrResult,
}

/// Presentation formats derived from an [`ExtractionPair`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedResult {
    pub txt: String,
    pub json: String,
    pub md: String,
    pub native_preview: String,
    pub ocr_preview: String,
}
