//! Process configuration and per-run options.
//!
//! [`AppConfig`] is resolved once at startup from the environment (after
//! `.env` is loaded). [`RunOptions`] comes from the upload form and is
//! validated per request.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_DEBUG_DIR: &str = "debug_pages";
pub const DEFAULT_TESSERACT_CMD: &str = "tesseract";
pub const DEFAULT_MAX_UPLOAD_MB: usize = 100;

pub const MIN_ZOOM: u8 = 1;
pub const MAX_ZOOM: u8 = 4;
pub const DEFAULT_ZOOM: u8 = 2;

/// Settings resolved at process startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub debug_dir: PathBuf,
    /// OCR executable name or path.
    pub tesseract_cmd: String,
    /// Directory holding the pdfium shared library; system library if unset.
    pub pdfium_lib_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let max_upload_mb = match get("MAX_UPLOAD_MB") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("MAX_UPLOAD_MB must be a whole number, got {:?}", raw))?,
            None => DEFAULT_MAX_UPLOAD_MB,
        };
        if max_upload_mb == 0 {
            anyhow::bail!("MAX_UPLOAD_MB must be greater than zero");
        }
        let max_upload_bytes = match max_upload_mb.checked_mul(1024 * 1024) {
            Some(bytes) => bytes,
            None => anyhow::bail!("MAX_UPLOAD_MB is too large: {}", max_upload_mb),
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            debug_dir: get("DEBUG_DIR")
                .unwrap_or_else(|| DEFAULT_DEBUG_DIR.to_string())
                .into(),
            tesseract_cmd: get("TESSERACT_CMD").unwrap_or_else(|| DEFAULT_TESSERACT_CMD.to_string()),
            pdfium_lib_dir: get("PDFIUM_LIB_PATH").map(PathBuf::from),
            max_upload_bytes,
        })
    }
}

/// Options chosen on the upload form for a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Render magnification for pages without embedded images (1–4).
    pub zoom: u8,
    /// Clear the debug directory before the run and save rendered pages into it.
    pub save_debug: bool,
    /// OCR language code; `None` means the engine default.
    pub lang: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            save_debug: true,
            lang: None,
        }
    }
}

impl RunOptions {
    /// Parse the raw form values. Missing fields keep their defaults; an
    /// out-of-range zoom is clamped; a malformed language code is rejected.
    pub fn from_form(
        zoom: Option<&str>,
        save_debug: Option<&str>,
        lang: Option<&str>,
    ) -> Result<Self, String> {
        let mut options = Self::default();

        if let Some(raw) = zoom.map(str::trim).filter(|z| !z.is_empty()) {
            let zoom: i64 = raw
                .parse()
                .map_err(|_| format!("zoom must be an integer, got {:?}", raw))?;
            options.zoom = zoom.clamp(i64::from(MIN_ZOOM), i64::from(MAX_ZOOM)) as u8;
        }

        if let Some(raw) = save_debug {
            options.save_debug = parse_flag(raw)?;
        }

        if let Some(raw) = lang.map(str::trim).filter(|l| !l.is_empty()) {
            if !lang_pattern().is_match(raw) {
                return Err(format!("invalid OCR language code: {:?}", raw));
            }
            options.lang = Some(raw.to_string());
        }

        Ok(options)
    }
}

fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "" | "0" | "false" | "off" | "no" => Ok(false),
        other => Err(format!("save_debug must be a boolean, got {:?}", other)),
    }
}

/// Tesseract-style codes: `eng`, `chi_sim`, `eng+deu`.
fn lang_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_]+(\+[A-Za-z0-9_]+)*$").expect("language pattern is valid")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.debug_dir, PathBuf::from("debug_pages"));
        assert_eq!(config.tesseract_cmd, "tesseract");
        assert!(config.pdfium_lib_dir.is_none());
        assert_eq!(config.max_upload_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn test_overrides_and_blank_values() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TESSERACT_CMD", "/opt/tesseract/bin/tesseract"),
            ("PDFIUM_LIB_PATH", "  "),
            ("MAX_UPLOAD_MB", "5"),
        ]))
        .unwrap();
        assert_eq!(config.tesseract_cmd, "/opt/tesseract/bin/tesseract");
        assert!(config.pdfium_lib_dir.is_none());
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_bad_upload_limit_rejected() {
        assert!(AppConfig::from_lookup(lookup(&[("MAX_UPLOAD_MB", "lots")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("MAX_UPLOAD_MB", "0")])).is_err());
    }

    #[test]
    fn test_oversized_upload_limit_rejected() {
        let huge = (usize::MAX / 1024).to_string();
        let err = AppConfig::from_lookup(lookup(&[("MAX_UPLOAD_MB", huge.as_str())])).unwrap_err();
        assert!(err.to_string().starts_with("MAX_UPLOAD_MB is too large"));
    }

    #[test]
    fn test_run_options_defaults() {
        let options = RunOptions::from_form(None, None, None).unwrap();
        assert_eq!(options, RunOptions::default());
        assert_eq!(options.zoom, 2);
        assert!(options.save_debug);
    }

    #[test]
    fn test_zoom_is_clamped() {
        assert_eq!(RunOptions::from_form(Some("9"), None, None).unwrap().zoom, 4);
        assert_eq!(RunOptions::from_form(Some("0"), None, None).unwrap().zoom, 1);
        assert_eq!(RunOptions::from_form(Some("3"), None, None).unwrap().zoom, 3);
        assert!(RunOptions::from_form(Some("big"), None, None).is_err());
    }

    #[test]
    fn test_lang_validation() {
        let options = RunOptions::from_form(None, Some("off"), Some(" eng+deu ")).unwrap();
        assert_eq!(options.lang.as_deref(), Some("eng+deu"));
        assert!(!options.save_debug);

        assert!(RunOptions::from_form(None, None, Some("   ")).unwrap().lang.is_none());
        assert!(RunOptions::from_form(None, None, Some("eng; rm -rf")).is_err());
    }
}
