//! OpenAPI document for the HTTP surface, served at `/api-docs/openapi.json` and browsable at
//! `/docs`.

use utoipa::OpenApi;

use crate::api::handlers;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::upload::upload_pdf, handlers::pages::index),
    tags(
        (name = "analysis", description = "Send a PDF and a prompt to Gemini"),
        (name = "pages", description = "Browser-facing pages"),
    ),
    info(
        title = "pdfprompt",
        description = "Upload a PDF with prompt text and receive Gemini's analysis as an HTML fragment.",
    )
)]
pub struct ApiDoc;
