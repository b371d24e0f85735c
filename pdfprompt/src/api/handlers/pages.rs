//! HTTP handlers for the static pages.

use askama::Template;
use axum::{extract::State, response::Html};
use tracing::instrument;

use crate::AppState;
use crate::errors::{Error, Result};

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'a> {
    title: &'a str,
    max_upload_mb: usize,
}

/// Render the upload form
#[utoipa::path(
    get,
    path = "/",
    tag = "pages",
    summary = "Upload form",
    responses(
        (status = 200, description = "HTML form posting `pdfFile` and `promptText` to /upload", content_type = "text/html", body = String)
    )
)]
#[instrument(skip_all)]
pub async fn index(State(state): State<AppState>) -> Result<Html<String>> {
    let template = IndexTemplate {
        title: "Concrete volume estimator",
        max_upload_mb: state.config.limits.max_upload_size.div_ceil(1024 * 1024),
    };

    template.render().map(Html).map_err(|e| Error::Internal {
        operation: format!("render upload form: {e}"),
    })
}
