//! OCR engine abstraction and image preprocessing.
//!
//! Defines the [`OcrEngine`] trait so the extraction policy can run against the
//! Tesseract CLI in production and a scripted engine in tests.

pub mod preprocess;
pub mod tesseract;

use crate::error::OcrError;
use image::GrayImage;

pub use preprocess::preprocess_image;
pub use tesseract::TesseractCli;

/// Blocking OCR backend. Called once per image, never retried.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Recognise the text in a preprocessed image.
    ///
    /// `lang` is an engine language code such as `eng` or `eng+deu`;
    /// `None` means the engine's default language.
    fn recognize(&self, image: &GrayImage, lang: Option<&str>) -> Result<String, OcrError>;
}
