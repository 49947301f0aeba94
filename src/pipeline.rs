//! One upload, end to end: native text, OCR, combination.

use crate::combine::combine_results;
use crate::config::RunOptions;
use crate::image_ocr::{extract_text_from_images, OcrSettings};
use crate::native::extract_text_from_pdf;
use crate::ocr::OcrEngine;
use crate::raster::RasterProvider;
use crate::schema::{CombinedResult, ExtractionPair, OcrResult};
use crate::source::ByteSource;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Everything produced by a run, as returned to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub id: String,
    pub filename: String,
    pub size_bytes: usize,
    pub sha256: String,
    pub options: RunOptions,
    #[serde(flatten)]
    pub extraction: ExtractionPair,
    pub native_preview: String,
    pub ocr_preview: String,
    /// Image files present in the debug directory after the run.
    pub debug_images: Vec<String>,
    pub elapsed_ms: u128,
    /// Download bodies; served separately.
    #[serde(skip)]
    pub combined: CombinedResult,
}

/// Runs uploads one at a time against a fixed raster provider, engine and debug dir.
pub struct Pipeline {
    rasters: Arc<dyn RasterProvider>,
    engine: Arc<dyn OcrEngine>,
    debug_dir: PathBuf,
    run_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        rasters: Arc<dyn RasterProvider>,
        engine: Arc<dyn OcrEngine>,
        debug_dir: PathBuf,
    ) -> Self {
        Self {
            rasters,
            engine,
            debug_dir,
            run_lock: Mutex::new(()),
        }
    }

    pub fn debug_dir(&self) -> &Path {
        &self.debug_dir
    }

    /// Extract one document. Blocking; call from a blocking-capable thread.
    pub fn run(&self, filename: &str, data: &[u8], options: &RunOptions) -> RunReport {
        // A panicked run leaves nothing behind that the next run depends on.
        let _guard = self.run_lock.lock().unwrap_or_else(|e| e.into_inner());
        let started = Instant::now();

        let sha256 = format!("{:x}", Sha256::digest(data));
        info!(
            "Run started: {} ({} bytes, sha256={}, zoom={}, save_debug={}, lang={})",
            filename,
            data.len(),
            sha256,
            options.zoom,
            options.save_debug,
            options.lang.as_deref().unwrap_or("default")
        );

        let native = extract_text_from_pdf(ByteSource::Bytes(data));

        let debug_dir = if options.save_debug {
            match clear_debug_dir(&self.debug_dir) {
                Ok(()) => Some(self.debug_dir.as_path()),
                Err(e) => {
                    warn!("Cannot prepare debug dir {}: {}", self.debug_dir.display(), e);
                    None
                }
            }
        } else {
            None
        };

        let settings = OcrSettings {
            zoom: options.zoom,
            lang: options.lang.as_deref(),
            debug_dir,
        };
        let ocr = match self.rasters.backend() {
            Ok(backend) => extract_text_from_images(
                ByteSource::Bytes(data),
                backend.as_ref(),
                self.engine.as_ref(),
                &settings,
            ),
            Err(e) => {
                warn!("OCR extraction failed: {}", e);
                OcrResult::failed(e.to_string())
            }
        };

        let combined = combine_results(&native, &ocr);
        let debug_images = list_debug_images(&self.debug_dir);
        let elapsed_ms = started.elapsed().as_millis();

        info!(
            "Run finished in {} ms: {} native pages, {} OCR images",
            elapsed_ms, native.page_count, ocr.image_count
        );

        RunReport {
            id: Uuid::new_v4().to_string(),
            filename: filename.to_string(),
            size_bytes: data.len(),
            sha256,
            options: options.clone(),
            native_preview: combined.native_preview.clone(),
            ocr_preview: combined.ocr_preview.clone(),
            extraction: ExtractionPair { native, ocr },
            debug_images,
            elapsed_ms,
            combined,
        }
    }
}

/// Remove every file in `dir`, creating it if missing. Files that cannot be
/// removed are logged and left in place.
pub fn clear_debug_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.exists() {
        return std::fs::create_dir_all(dir);
    }

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Cannot remove {}: {}", path.display(), e);
            }
        }
    }
    debug!("Cleared debug dir {}", dir.display());
    Ok(())
}

/// Whether a file name looks like an image the gallery can show.
pub fn is_gallery_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        .unwrap_or(false)
}

/// Sorted names of the gallery images currently in `dir`.
pub fn list_debug_images(dir: &Path) -> Vec<String> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| is_gallery_image(name))
        .collect();
    names.sort();
    names
}
