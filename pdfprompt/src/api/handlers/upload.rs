use crate::analysis::{PDF_MIME_TYPE, build_instruction, render_response};
use crate::errors::{Error, Result};
use crate::gemini::ContentPart;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::{debug, info, instrument};

/// Multipart field carrying the PDF document.
pub const PDF_FILE_FIELD: &str = "pdfFile";
/// Multipart field carrying the caller's prompt text.
pub const PROMPT_TEXT_FIELD: &str = "promptText";

/// A file part as received: the filename may be absent or empty.
#[derive(Debug)]
pub struct FilePart {
    pub filename: Option<String>,
    pub contents: Bytes,
}

/// Multipart fields as received, before validation.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub pdf_file: Option<FilePart>,
    pub prompt_text: Option<String>,
}

/// An upload that passed validation.
#[derive(Debug)]
pub struct UploadRequest {
    pub filename: String,
    pub contents: Bytes,
    pub prompt_text: String,
}

fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge { message: e.body_text() }
    } else {
        Error::BadRequest {
            message: format!("Failed to parse multipart data: {}", e.body_text()),
        }
    }
}

impl UploadForm {
    /// Read every field of the request. Only the first occurrence of each known field is kept;
    /// unknown fields are ignored.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let field_name = field.name().unwrap_or("").to_string();

            match field_name.as_str() {
                PDF_FILE_FIELD if form.pdf_file.is_none() => {
                    let filename = field.file_name().map(|s| s.to_string());
                    let contents = field.bytes().await.map_err(multipart_error)?;
                    debug!(filename = ?filename, size_bytes = contents.len(), "Read PDF file part");
                    form.pdf_file = Some(FilePart { filename, contents });
                }
                PROMPT_TEXT_FIELD if form.prompt_text.is_none() => {
                    form.prompt_text = Some(field.text().await.map_err(multipart_error)?);
                }
                _ => {
                    // Ignore unknown and repeated fields
                }
            }
        }

        Ok(form)
    }

    /// Check the form, in order: file part present, prompt present, filename non-empty, `.pdf`
    /// suffix. The first failing check decides the response.
    pub fn validate(self) -> Result<UploadRequest> {
        let Some(pdf_file) = self.pdf_file else {
            return Err(Error::BadRequest {
                message: "No PDF file part in the request.".to_string(),
            });
        };

        let Some(prompt_text) = self.prompt_text else {
            return Err(Error::BadRequest {
                message: "No prompt text part in the request.".to_string(),
            });
        };

        let filename = match pdf_file.filename {
            Some(filename) if !filename.is_empty() => filename,
            _ => {
                return Err(Error::BadRequest {
                    message: "No selected PDF file.".to_string(),
                });
            }
        };

        if !filename.to_lowercase().ends_with(".pdf") {
            return Err(Error::BadRequest {
                message: "Invalid file type. Only PDF files are allowed.".to_string(),
            });
        }

        Ok(UploadRequest {
            filename,
            contents: pdf_file.contents,
            prompt_text,
        })
    }
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "analysis",
    summary = "Analyze a PDF",
    description = "Upload a PDF together with prompt text. The document and a fixed analysis instruction \
                   followed by the prompt text are sent to Gemini, and the generated text is returned \
                   inside an HTML fragment.",
    request_body(
        content_type = "multipart/form-data",
        description = "`pdfFile`: the PDF document (filename must end in .pdf); `promptText`: free text appended to the instruction"
    ),
    responses(
        (status = 200, description = "Generated analysis", content_type = "text/html", body = String),
        (status = 400, description = "Missing part, empty selection or non-PDF filename", body = String),
        (status = 413, description = "Payload too large", body = String),
        (status = 500, description = "Gemini could not be reached, or the analysis failed", body = String)
    )
)]
pub async fn upload_pdf(State(state): State<AppState>, multipart: std::result::Result<Multipart, MultipartRejection>) -> Response {
    match analyze_upload(&state, multipart).await {
        Ok(html) => html.into_response(),
        Err(e) => e.into_response_with(&state.config.responses),
    }
}

#[instrument(skip_all)]
async fn analyze_upload(state: &AppState, multipart: std::result::Result<Multipart, MultipartRejection>) -> Result<Html<String>> {
    // A body that is not multipart at all has no file part
    let form = match multipart {
        Ok(multipart) => UploadForm::from_multipart(multipart).await?,
        Err(rejection) => {
            debug!("Request is not a multipart form: {}", rejection.body_text());
            UploadForm::default()
        }
    };
    let upload = form.validate()?;

    info!(
        filename = %upload.filename,
        size_bytes = upload.contents.len(),
        "Accepted PDF upload"
    );

    // Removed from disk when dropped, on every path out of this function
    let scratch_file = state.scratch.persist(&upload.contents, "pdf").await?;

    let gemini = &state.config.gemini;
    let document = state.generator.upload_file(scratch_file.path(), PDF_MIME_TYPE).await?;
    let parts = vec![
        ContentPart::Text(build_instruction(&gemini.prompt_template, &upload.prompt_text)),
        ContentPart::File(document),
    ];
    let text = state.generator.generate_content(&gemini.model, parts).await?;
    drop(scratch_file);

    let body = render_response(&text, state.config.responses.escape_html).map_err(|e| Error::Internal {
        operation: format!("render response: {e}"),
    })?;

    info!(response_length = text.len(), "Analysis complete");
    Ok(Html(body))
}
