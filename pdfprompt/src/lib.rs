//! # pdfprompt: PDF analysis over HTTP
//!
//! A small web service that accepts a PDF document and a short prompt, hands both to Google's
//! Gemini API and returns the generated answer as an HTML fragment.
//!
//! ## Request flow
//!
//! 1. `POST /upload` receives a multipart form with a `pdfFile` part and a `promptText` part
//! 2. The form is validated; the first failing check produces a 400 with a fixed message
//! 3. The PDF is written to a uniquely named file in the scratch directory
//! 4. The file is uploaded to Gemini, then a generation request is sent with the fixed analysis
//!    instruction, the prompt text and the uploaded file reference
//! 5. The generated text is wrapped in `<h3>Gemini API Response:</h3><p>...</p>`
//!
//! The scratch file is removed on every exit path, including failures of the Gemini calls.
//!
//! ## Modules
//!
//! - [`api`]: HTTP handlers for the form page and the upload endpoint
//! - [`gemini`]: the [`gemini::GenerativeClient`] trait and its REST implementation
//! - [`analysis`]: prompt assembly and response rendering
//! - [`scratch`]: per-request scratch files with cleanup on drop
//! - [`config`]: YAML + environment configuration
//! - [`errors`]: the error type and its HTTP mapping
//! - [`telemetry`]: tracing and optional OTLP export

pub mod analysis;
pub mod api;
pub mod config;
pub mod errors;
pub mod gemini;
mod openapi;
pub mod scratch;
pub mod telemetry;
#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use axum::{Json, Router, extract::DefaultBodyLimit, routing::get, routing::post};
use bon::Builder;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;

use crate::gemini::{GeminiClient, GenerativeClient};
use crate::openapi::ApiDoc;
use crate::scratch::ScratchDir;

/// Install the process-wide rustls crypto provider. Safe to call more than once.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .scratch(scratch)
///     .generator(Arc::new(GeminiClient::new(&config.gemini)?))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub scratch: ScratchDir,
    pub generator: Arc<dyn GenerativeClient>,
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.limits.max_upload_size;

    let router = Router::new()
        .route("/", get(api::handlers::pages::index))
        .route("/healthz", get(|| async { "OK" }))
        .route(
            "/upload",
            post(api::handlers::upload::upload_pdf).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .with_state(state)
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

/// A configured service, ready to bind.
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Prepare the scratch directory and the Gemini client, and build the router.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting pdfprompt with configuration: {:#?}", config);

        let scratch = ScratchDir::create(&config.scratch_dir).await?;
        let generator: Arc<dyn GenerativeClient> = Arc::new(GeminiClient::new(&config.gemini)?);

        let state = AppState::builder()
            .config(config.clone())
            .scratch(scratch)
            .generator(generator)
            .build();

        Ok(Self {
            router: build_router(state),
            config,
        })
    }

    /// Serve until `shutdown` resolves, then flush telemetry.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "pdfprompt listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
