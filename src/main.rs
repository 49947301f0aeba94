//! PDF Text Extractor - native text layer plus OCR, served over HTTP.

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use pdf_text_extractor::pipeline;
use pdf_text_extractor::{
    AppConfig, PdfiumLocator, Pipeline, RunOptions, RunReport, RunStore, TesseractCli,
};
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Once};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    runs: RunStore,
    pipeline: Arc<Pipeline>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "pdf_text_extractor=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    install_panic_hook();

    let config = AppConfig::from_env()?;
    info!("Config: {:?}", config);

    // OCR engine and rasteriser must be usable before serving
    let engine = TesseractCli::new(config.tesseract_cmd.clone());
    let version = engine.probe().with_context(|| {
        format!(
            "OCR engine {:?} is not usable; install tesseract or set TESSERACT_CMD",
            engine.cmd()
        )
    })?;
    info!("OCR engine ready: {}", version);

    let rasters = PdfiumLocator::new(config.pdfium_lib_dir.clone());
    rasters
        .bind()
        .context("pdfium library not found; install it or set PDFIUM_LIB_PATH")?;
    info!("pdfium library ready");

    std::fs::create_dir_all(&config.debug_dir)
        .with_context(|| format!("Failed to create debug dir {:?}", config.debug_dir))?;

    let state = AppState {
        runs: RunStore::new(),
        pipeline: Arc::new(Pipeline::new(
            Arc::new(rasters),
            Arc::new(engine),
            config.debug_dir.clone(),
        )),
    };

    let app = router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/extract", post(extract_document))
        .route("/runs/:id", get(get_run))
        .route("/runs/:id/:file", get(download))
        .route("/debug-images", get(list_debug_images))
        .route("/debug-images/:name", get(get_debug_image))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// The upload page.
async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Upload a PDF and run both extractors over it.
async fn extract_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<RunReport>, (StatusCode, String)> {
    let mut filename = String::new();
    let mut content_type = None;
    let mut file_data = None;
    let mut zoom = None;
    let mut save_debug = None;
    let mut lang = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e))
    })? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                filename = field.file_name().unwrap_or("document.pdf").to_string();
                content_type = field.content_type().map(str::to_string);
                file_data = Some(field.bytes().await.map_err(|e| {
                    (StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e))
                })?);
            }
            "zoom" | "save_debug" | "lang" => {
                let value = field.text().await.map_err(|e| {
                    (StatusCode::BAD_REQUEST, format!("Failed to read {}: {}", name, e))
                })?;
                match name.as_str() {
                    "zoom" => zoom = Some(value),
                    "save_debug" => save_debug = Some(value),
                    _ => lang = Some(value),
                }
            }
            _ => {}
        }
    }

    let file_data = file_data.ok_or((StatusCode::BAD_REQUEST, "No file uploaded".to_string()))?;

    if !is_pdf_upload(&filename, content_type.as_deref()) {
        return Err((
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!("Only PDF uploads are accepted, got {:?}", filename),
        ));
    }

    if file_data.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Uploaded file is empty. Try re-uploading.".to_string(),
        ));
    }

    let options = RunOptions::from_form(zoom.as_deref(), save_debug.as_deref(), lang.as_deref())
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    info!("Received file: {} ({} bytes)", filename, file_data.len());

    let pipeline = state.pipeline.clone();
    let report = tokio::task::spawn_blocking(move || {
        run_guarded(|| pipeline.run(&filename, &file_data, &options))
    })
    .await
    .map_err(describe_join_error)
    .and_then(|outcome| outcome)
    .map_err(|detail| {
        error!("Extraction run failed: {}", detail);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("An unexpected error occurred. See details below.\n\n{}", detail),
        )
    })?;

    state.runs.insert(report.clone());

    info!("Extraction complete: {}", report.id);
    Ok(Json(report))
}

/// Get a previous run's report.
async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RunReport>, StatusCode> {
    state.runs.get(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// Download one of a run's export files.
async fn download(
    State(state): State<AppState>,
    Path((id, file)): Path<(String, String)>,
) -> Result<Response, StatusCode> {
    let (body, mime) = state
        .runs
        .with(&id, |report| export_body(report, &file))
        .flatten()
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok((
        [
            (header::CONTENT_TYPE, format!("{}; charset=utf-8", mime)),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file),
            ),
        ],
        body,
    )
        .into_response())
}

/// Names of the images currently in the debug directory.
async fn list_debug_images(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(pipeline::list_debug_images(state.pipeline.debug_dir()))
}

/// Serve one debug image.
async fn get_debug_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, StatusCode> {
    if !is_plain_file_name(&name) || !pipeline::is_gallery_image(&name) {
        return Err(StatusCode::NOT_FOUND);
    }

    let path = state.pipeline.debug_dir().join(&name);
    let bytes = tokio::fs::read(&path).await.map_err(|_| StatusCode::NOT_FOUND)?;
    let mime = if name.to_ascii_lowercase().ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    };

    Ok(([(header::CONTENT_TYPE, mime)], bytes).into_response())
}

// ============================================================================
// Helper functions
// ============================================================================

/// Accept by `.pdf` extension or `application/pdf` MIME type.
fn is_pdf_upload(filename: &str, content_type: Option<&str>) -> bool {
    filename.to_ascii_lowercase().ends_with(".pdf")
        || content_type
            .map(|ct| ct.eq_ignore_ascii_case("application/pdf"))
            .unwrap_or(false)
}

/// The body and MIME type of a named export file.
fn export_body(report: &RunReport, file: &str) -> Option<(String, &'static str)> {
    match file {
        "extracted.txt" => Some((report.combined.txt.clone(), "text/plain")),
        "extracted.json" => Some((report.combined.json.clone(), "application/json")),
        "extracted.md" => Some((report.combined.md.clone(), "text/markdown")),
        _ => None,
    }
}

/// Rejects anything that could escape the debug directory.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && std::path::Path::new(name)
            .file_name()
            .map(|f| f == name)
            .unwrap_or(false)
}

thread_local! {
    static PANIC_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Record a backtrace for every panic on the panicking thread, then defer to
/// the previous hook.
fn install_panic_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let trace = Backtrace::force_capture().to_string();
            PANIC_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

/// Run `f`, turning a panic into its message plus the captured backtrace.
fn run_guarded<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    std::panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let trace = PANIC_TRACE
            .with(|slot| slot.borrow_mut().take())
            .unwrap_or_else(|| "no backtrace captured".to_string());
        format!(
            "extraction worker panicked: {}\n\n{}",
            panic_message(payload.as_ref()),
            trace
        )
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

fn describe_join_error(e: tokio::task::JoinError) -> String {
    if !e.is_panic() {
        return format!("extraction task was cancelled: {}", e);
    }
    format!(
        "extraction worker panicked: {}",
        panic_message(e.into_panic().as_ref())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_upload_filter() {
        assert!(is_pdf_upload("Report.PDF", None));
        assert!(is_pdf_upload("blob", Some("application/pdf")));
        assert!(!is_pdf_upload("notes.txt", Some("text/plain")));
        assert!(!is_pdf_upload("scan.png", None));
    }

    #[test]
    fn test_plain_file_name() {
        assert!(is_plain_file_name("page_1.png"));
        assert!(!is_plain_file_name("../secret.png"));
        assert!(!is_plain_file_name("nested/page_1.png"));
        assert!(!is_plain_file_name(""));
        assert!(!is_plain_file_name(".."));
    }

    #[test]
    fn test_panic_detail_includes_backtrace() {
        install_panic_hook();
        let detail = run_guarded(|| -> u32 { panic!("decoder blew up") }).unwrap_err();

        let (head, trace) = detail.split_once("\n\n").unwrap();
        assert_eq!(head, "extraction worker panicked: decoder blew up");
        assert!(!trace.trim().is_empty());
        assert_ne!(trace, "no backtrace captured");
    }

    #[test]
    fn test_guarded_run_passes_value_through() {
        assert_eq!(run_guarded(|| 7), Ok(7));
    }

    #[tokio::test]
    async fn test_panicking_worker_is_described() {
        let err = tokio::task::spawn_blocking(|| panic!("decoder blew up"))
            .await
            .unwrap_err();
        assert_eq!(
            describe_join_error(err),
            "extraction worker panicked: decoder blew up"
        );
    }
}
