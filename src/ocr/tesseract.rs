//! Tesseract OCR via its command-line executable.

use super::OcrEngine;
use crate::error::OcrError;
use image::{GrayImage, ImageFormat};
use std::process::Command;
use tracing::debug;

pub struct TesseractCli {
    cmd: String,
}

impl TesseractCli {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self { cmd: cmd.into() }
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    /// Run `<cmd> --version` and return its first line.
    ///
    /// Called once at startup so a misconfigured executable path fails loudly
    /// instead of silently producing empty OCR text for every upload.
    pub fn probe(&self) -> Result<String, OcrError> {
        let output = Command::new(&self.cmd)
            .arg("--version")
            .output()
            .map_err(|source| OcrError::Spawn {
                cmd: self.cmd.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(self.failed(&output));
        }

        // Older releases print the version banner on stderr.
        let banner = if output.stdout.is_empty() {
            &output.stderr
        } else {
            &output.stdout
        };
        Ok(String::from_utf8_lossy(banner)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    fn failed(&self, output: &std::process::Output) -> OcrError {
        OcrError::Failed {
            cmd: self.cmd.clone(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

impl OcrEngine for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &GrayImage, lang: Option<&str>) -> Result<String, OcrError> {
        let scratch = tempfile::Builder::new()
            .prefix("ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| OcrError::Scratch(e.to_string()))?;
        image
            .save_with_format(scratch.path(), ImageFormat::Png)
            .map_err(|e| OcrError::Scratch(e.to_string()))?;

        let mut command = Command::new(&self.cmd);
        command.arg(scratch.path()).arg("stdout");
        if let Some(lang) = lang {
            command.arg("-l").arg(lang);
        }

        debug!(
            "Running {} on {}x{} image (lang={})",
            self.cmd,
            image.width(),
            image.height(),
            lang.unwrap_or("default")
        );
        let output = command.output().map_err(|source| OcrError::Spawn {
            cmd: self.cmd.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(self.failed(&output));
        }

        Ok(String::from_utf8_lossy(&output.stdout).replace('\x0c', ""))
    }
}
