//! OCR extraction: embedded images first, whole-page rendering as fallback.

use crate::error::RasterError;
use crate::ocr::{preprocess_image, OcrEngine};
use crate::raster::{RasterBackend, RasterDocument};
use crate::schema::{ImageMethod, OcrDebug, OcrImage, OcrPage, OcrResult, OCR_SOURCE};
use crate::source::ByteSource;
use image::DynamicImage;
use std::path::Path;
use tracing::{debug, info, warn};

/// Per-run OCR knobs.
#[derive(Debug, Clone, Copy)]
pub struct OcrSettings<'a> {
    /// Rasterisation magnification for pages without embedded images.
    pub zoom: u8,
    /// Engine language code; `None` uses the engine default.
    pub lang: Option<&'a str>,
    /// Where rendered fallback pages are saved as `page_<N>.png`.
    pub debug_dir: Option<&'a Path>,
}

/// OCR every page of a PDF.
///
/// Never fails: an unreadable, empty or unopenable document yields a result
/// with a top-level `error`; per-image failures are recorded on the entry and
/// processing moves on to the next image or page.
pub fn extract_text_from_images(
    source: ByteSource<'_>,
    backend: &dyn RasterBackend,
    engine: &dyn OcrEngine,
    settings: &OcrSettings<'_>,
) -> OcrResult {
    let data = match source.read_all() {
        Ok(data) => data,
        Err(e) => return failed(RasterError::from(e)),
    };

    let document = match backend.open(&data) {
        Ok(document) => document,
        Err(e) => return failed(e),
    };

    let mut settings = *settings;
    if let Some(dir) = settings.debug_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!("Cannot create debug dir {}: {}", dir.display(), e);
            settings.debug_dir = None;
        }
    }

    info!(
        "OCR extraction: {} pages (engine={}, zoom={}, lang={})",
        document.page_count(),
        engine.name(),
        settings.zoom,
        settings.lang.unwrap_or("default")
    );
    ocr_document(document.as_ref(), engine, &settings)
}

fn failed(error: RasterError) -> OcrResult {
    warn!("OCR extraction failed: {}", error);
    OcrResult::failed(error.to_string())
}

/// Apply the per-page policy to an opened document.
pub fn ocr_document(
    document: &dyn RasterDocument,
    engine: &dyn OcrEngine,
    settings: &OcrSettings<'_>,
) -> OcrResult {
    let pages_total = document.page_count();
    let mut pages = Vec::with_capacity(pages_total);
    let mut blocks = Vec::new();
    let mut image_count = 0;

    for page_index in 0..pages_total {
        let page = page_index as u32 + 1;

        let embedded = document.embedded_images(page_index).unwrap_or_else(|e| {
            warn!("Page {}: cannot list images, rendering instead: {}", page, e);
            Vec::new()
        });

        let images = if embedded.is_empty() {
            vec![ocr_rendered_page(document, engine, settings, page_index, &mut blocks)]
        } else {
            embedded
                .into_iter()
                .zip(1u32..)
                .map(|(image, index)| {
                    ocr_embedded(engine, settings.lang, page, index, image, &mut blocks)
                })
                .collect()
        };

        image_count += images.len();
        pages.push(OcrPage { page, images });
    }

    OcrResult {
        pages,
        image_count,
        content: blocks.join("\n").trim().to_string(),
        source: OCR_SOURCE.to_string(),
        debug: OcrDebug { pages_total },
        error: None,
    }
}

fn ocr_embedded(
    engine: &dyn OcrEngine,
    lang: Option<&str>,
    page: u32,
    index: u32,
    image: Result<DynamicImage, RasterError>,
    blocks: &mut Vec<String>,
) -> OcrImage {
    let image = match image {
        Ok(image) => image,
        Err(e) => {
            warn!("Page {} image {}: {}", page, index, e);
            return OcrImage {
                index,
                ocr: String::new(),
                method: ImageMethod::Embedded,
                error: Some(e.to_string()),
            };
        }
    };

    let (ocr, error) = run_ocr(engine, &image, lang, page, index);
    blocks.push(format!(
        "--- OCR Page {}, Image {} (embedded) ---\n{}\n",
        page, index, ocr
    ));

    OcrImage {
        index,
        ocr,
        method: ImageMethod::Embedded,
        error,
    }
}

fn ocr_rendered_page(
    document: &dyn RasterDocument,
    engine: &dyn OcrEngine,
    settings: &OcrSettings<'_>,
    page_index: usize,
    blocks: &mut Vec<String>,
) -> OcrImage {
    let page = page_index as u32 + 1;

    let (ocr, error) = match document.render_page(page_index, f32::from(settings.zoom)) {
        Ok(image) => {
            if let Some(dir) = settings.debug_dir {
                if let Err(e) = save_debug_page(&image, dir, page) {
                    warn!("Page {}: {}", page, e);
                }
            }
            run_ocr(engine, &image, settings.lang, page, 1)
        }
        Err(e) => {
            warn!("Page {}: {}", page, e);
            (String::new(), Some(e.to_string()))
        }
    };

    blocks.push(format!("--- OCR Page {}, Rendered Page ---\n{}\n", page, ocr));

    OcrImage {
        index: 1,
        ocr,
        method: ImageMethod::RenderedPage,
        error,
    }
}

fn run_ocr(
    engine: &dyn OcrEngine,
    image: &DynamicImage,
    lang: Option<&str>,
    page: u32,
    index: u32,
) -> (String, Option<String>) {
    let prepared = preprocess_image(image);
    match engine.recognize(&prepared, lang) {
        Ok(text) => {
            debug!("Page {} image {}: {} chars", page, index, text.len());
            (text, None)
        }
        Err(e) => {
            warn!("Page {} image {}: {}", page, index, e);
            (String::new(), Some(e.to_string()))
        }
    }
}

/// Name of the debug image written for a rendered page.
pub fn debug_page_file_name(page: u32) -> String {
    format!("page_{}.png", page)
}

fn save_debug_page(image: &DynamicImage, dir: &Path, page: u32) -> Result<(), RasterError> {
    let path = dir.join(debug_page_file_name(page));
    image
        .save_with_format(&path, image::ImageFormat::Png)
        .map_err(|e| RasterError::DebugSave(format!("{}: {}", path.display(), e)))
}
