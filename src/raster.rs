//! PDF rasterisation and embedded-image access.
//!
//! The OCR policy only needs three things from a PDF: how many pages it has,
//! which raster images each page embeds, and a bitmap of a whole page. Those
//! are the [`RasterBackend`] / [`RasterDocument`] traits; pdfium implements
//! them in production.

use crate::error::RasterError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::debug;

/// Opens PDF bytes as a [`RasterDocument`].
pub trait RasterBackend {
    fn open<'a>(&'a self, data: &'a [u8]) -> Result<Box<dyn RasterDocument + 'a>, RasterError>;
}

/// A loaded PDF. Page indices are 0-based.
pub trait RasterDocument {
    fn page_count(&self) -> usize;

    /// Decoded embedded raster images of a page, in listing order. A failure to
    /// decode one image is reported in its own slot.
    fn embedded_images(
        &self,
        page_index: usize,
    ) -> Result<Vec<Result<DynamicImage, RasterError>>, RasterError>;

    /// Rasterise the whole page at `zoom` times its natural size (72 dpi).
    fn render_page(&self, page_index: usize, zoom: f32) -> Result<DynamicImage, RasterError>;
}

/// Hands out a [`RasterBackend`] on the calling thread. Backends themselves
/// need not be `Send`; providers are shared across worker threads.
pub trait RasterProvider: Send + Sync {
    fn backend(&self) -> Result<Box<dyn RasterBackend>, RasterError>;
}

// ============================================================================
// pdfium
// ============================================================================

/// Where to find the pdfium shared library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumLocator {
    lib_dir: Option<PathBuf>,
}

impl PdfiumLocator {
    pub fn new(lib_dir: Option<PathBuf>) -> Self {
        Self { lib_dir }
    }

    /// Bind to the configured directory, or to `./` then the system library.
    pub fn bind(&self) -> Result<Pdfium, RasterError> {
        let bindings = match &self.lib_dir {
            Some(dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| RasterError::Bind(format!("{:?}", e)))?;

        debug!(
            "pdfium bound ({})",
            self.lib_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "system".to_string())
        );
        Ok(Pdfium::new(bindings))
    }
}

impl RasterProvider for PdfiumLocator {
    fn backend(&self) -> Result<Box<dyn RasterBackend>, RasterError> {
        Ok(Box::new(self.bind()?))
    }
}

impl RasterBackend for Pdfium {
    fn open<'a>(&'a self, data: &'a [u8]) -> Result<Box<dyn RasterDocument + 'a>, RasterError> {
        let document = self
            .load_pdf_from_byte_slice(data, None)
            .map_err(|e| RasterError::Open(format!("{:?}", e)))?;
        Ok(Box::new(PdfiumDocument { document }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl PdfiumDocument<'_> {
    /// Load a single page directly; a page that fails to load does not
    /// affect its neighbours.
    fn page(&self, page_index: usize) -> Result<PdfPage<'_>, RasterError> {
        let index = pdfium_page_index(page_index)?;
        self.document
            .pages()
            .get(index)
            .map_err(|e| RasterError::Page {
                page: page_index as u32 + 1,
                detail: format!("{:?}", e),
            })
    }
}

impl RasterDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn embedded_images(
        &self,
        page_index: usize,
    ) -> Result<Vec<Result<DynamicImage, RasterError>>, RasterError> {
        let page = self.page(page_index)?;
        let images: Vec<_> = page
            .objects()
            .iter()
            .filter_map(|object| {
                object.as_image_object().map(|image| {
                    image
                        .get_raw_image()
                        .map_err(|e| RasterError::ExtractImage(format!("{:?}", e)))
                })
            })
            .collect();

        debug!("Page {}: {} embedded images", page_index + 1, images.len());
        Ok(images)
    }

    fn render_page(&self, page_index: usize, zoom: f32) -> Result<DynamicImage, RasterError> {
        let page = self.page(page_index)?;
        let config = PdfRenderConfig::new().scale_page_by_factor(zoom);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| RasterError::Render(format!("{:?}", e)))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} at {}x → {}x{} px",
            page_index + 1,
            zoom,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

fn pdfium_page_index(page_index: usize) -> Result<PdfPageIndex, RasterError> {
    PdfPageIndex::try_from(page_index).map_err(|_| RasterError::Page {
        page: page_index as u32 + 1,
        detail: "page index out of range".to_string(),
    })
}
