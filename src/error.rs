//! Typed failures for each extraction step.
//!
//! The extractors never hand these to their callers directly: they are
//! flattened into the `error` strings of the result records. The `Display`
//! output of each variant is the exact string that ends up in those fields.

use thiserror::Error;

/// Failure to obtain the raw bytes of an upload.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("read_error: {0}")]
    Read(#[from] std::io::Error),

    #[error("empty_input_stream")]
    Empty,
}

/// Failure inside the native text-layer extractor.
#[derive(Debug, Error)]
pub enum NativeError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("pdfplumber_open_error: {0}")]
    Open(String),

    #[error("page_text_error: {0}")]
    PageText(String),

    #[error("metadata_error: {0}")]
    Metadata(String),
}

/// Failure inside the rasterising backend.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("pdfium_bind_error: {0}")]
    Bind(String),

    #[error("pdfium_open_error: {0}")]
    Open(String),

    #[error("page_load_error: page {page}: {detail}")]
    Page { page: u32, detail: String },

    #[error("image_extract_error: {0}")]
    ExtractImage(String),

    #[error("render_error: {0}")]
    Render(String),

    #[error("debug_save_error: {0}")]
    DebugSave(String),
}

/// Failure of the OCR engine on a single image.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("ocr_error: failed to write scratch image: {0}")]
    Scratch(String),

    #[error("ocr_error: failed to run {cmd}: {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ocr_error: {cmd} exited with {status}: {stderr}")]
    Failed {
        cmd: String,
        status: String,
        stderr: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_strings_match_result_fields() {
        assert_eq!(SourceError::Empty.to_string(), "empty_input_stream");
        assert_eq!(
            NativeError::from(SourceError::Empty).to_string(),
            "empty_input_stream"
        );
        assert_eq!(
            RasterError::Open("bad header".into()).to_string(),
            "pdfium_open_error: bad header"
        );

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(SourceError::from(io).to_string(), "read_error: gone");
    }
}
