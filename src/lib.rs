//! # pdf-text-extractor
//!
//! Pull readable text out of arbitrary PDFs, including scans with no text layer.
//!
//! Every upload goes through two independent passes and one merge:
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ native     text layer per page + document metadata (lopdf)
//!  ├─ image_ocr  embedded raster images, or the whole rendered page when a
//!  │             page has none, OCR'd one by one (pdfium + tesseract)
//!  └─ combine    TXT / Markdown / JSON exports and short previews
//! ```
//!
//! Both extractors are total: they always return a result record and report
//! failures through its `error` fields.
//!
//! ```rust,no_run
//! use pdf_text_extractor::{combine_results, extract_text_from_pdf, ByteSource};
//! use pdf_text_extractor::{extract_text_from_images, OcrSettings, PdfiumLocator, TesseractCli};
//!
//! fn main() -> anyhow::Result<()> {
//!     let bytes = std::fs::read("scan.pdf")?;
//!     let native = extract_text_from_pdf(ByteSource::Bytes(&bytes));
//!
//!     let pdfium = PdfiumLocator::default().bind()?;
//!     let engine = TesseractCli::new("tesseract");
//!     let settings = OcrSettings { zoom: 2, lang: None, debug_dir: None };
//!     let ocr = extract_text_from_images(ByteSource::Bytes(&bytes), &pdfium, &engine, &settings);
//!
//!     println!("{}", combine_results(&native, &ocr).md);
//!     Ok(())
//! }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod combine;
pub mod config;
pub mod error;
pub mod image_ocr;
pub mod native;
pub mod ocr;
pub mod pipeline;
pub mod raster;
pub mod run_store;
pub mod schema;
pub mod source;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use combine::combine_results;
pub use config::{AppConfig, RunOptions};
pub use error::{NativeError, OcrError, RasterError, SourceError};
pub use image_ocr::{extract_text_from_images, OcrSettings};
pub use native::extract_text_from_pdf;
pub use ocr::{OcrEngine, TesseractCli};
pub use pipeline::{Pipeline, RunReport};
pub use raster::{PdfiumLocator, RasterBackend, RasterDocument, RasterProvider};
pub use run_store::RunStore;
pub use schema::{CombinedResult, ExtractionPair, ImageMethod, NativeResult, OcrResult};
pub use source::ByteSource;
