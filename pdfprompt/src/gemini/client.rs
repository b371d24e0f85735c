//! Gemini REST client.

use async_trait::async_trait;
use reqwest::{Client, Response, header::CONTENT_TYPE};
use std::path::Path;
use tracing::{debug, instrument};
use url::Url;

use super::types::{GenerateContentRequest, GenerateContentResponse, StartUploadFile, StartUploadRequest, UploadFileResponse};
use super::{ContentPart, GeminiError, GenerativeClient, Result, UploadedFile, classify_reqwest_error};
use crate::config::GeminiConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// The concrete implementation of [`GenerativeClient`], backed by `reqwest`.
pub struct GeminiClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> anyhow::Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("Gemini API key is not configured"))?;

        crate::install_crypto_provider();
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: ensure_slash(&config.base_url),
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| GeminiError::Request(format!("invalid URL for {path}: {e}")))
    }
}

/// Makes sure a url has a trailing slash, so that `join` appends rather than replaces the last
/// path segment.
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let path = format!("{}/", new_url.path());
        new_url.set_path(&path);
        new_url
    }
}

/// Turn a non-success response into a service error, keeping the body for diagnostics.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::error!(status = status.as_u16(), "Gemini API request failed");
    Err(GeminiError::Service {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    #[instrument(skip(self), fields(document = %path.display()), err)]
    async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<UploadedFile> {
        let contents = tokio::fs::read(path).await.map_err(|source| GeminiError::Document {
            path: path.display().to_string(),
            source,
        })?;
        let display_name = path.file_name().and_then(|name| name.to_str()).unwrap_or("document.pdf");

        // Resumable upload: the first request announces the file and returns the upload URL
        let start = self
            .client
            .post(self.endpoint("upload/v1beta/files")?)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", contents.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&StartUploadRequest {
                file: StartUploadFile { display_name },
            })
            .send()
            .await
            .map_err(classify_reqwest_error)?;
        let start = check_status(start).await?;

        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| GeminiError::Decode(format!("upload start response is missing the {UPLOAD_URL_HEADER} header")))?
            .to_string();
        debug!(size_bytes = contents.len(), "Upload session started");

        let response = self
            .client
            .post(&upload_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header(CONTENT_TYPE, mime_type)
            .body(contents)
            .send()
            .await
            .map_err(classify_reqwest_error)?;
        let response = check_status(response).await?;

        let body = response.text().await.map_err(classify_reqwest_error)?;
        let uploaded: UploadFileResponse =
            serde_json::from_str(&body).map_err(|e| GeminiError::Decode(format!("invalid file upload response: {e}")))?;

        debug!(file_name = %uploaded.file.name, "Uploaded document");
        Ok(UploadedFile {
            name: uploaded.file.name,
            uri: uploaded.file.uri,
            mime_type: uploaded.file.mime_type.unwrap_or_else(|| mime_type.to_string()),
        })
    }

    #[instrument(skip(self, parts), fields(parts = parts.len()), err)]
    async fn generate_content(&self, model: &str, parts: Vec<ContentPart>) -> Result<String> {
        let url = self.endpoint(&format!("v1beta/models/{model}:generateContent"))?;

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&GenerateContentRequest::user(&parts))
            .send()
            .await
            .map_err(classify_reqwest_error)?;
        let response = check_status(response).await?;

        let body = response.text().await.map_err(classify_reqwest_error)?;
        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| GeminiError::Decode(format!("invalid generateContent response: {e}")))?;

        let block_reason = parsed.prompt_feedback.as_ref().and_then(|f| f.block_reason.clone());
        match parsed.text() {
            Some(text) => {
                debug!(response_length = text.len(), "Generated content");
                Ok(text)
            }
            None => Err(GeminiError::Decode(match block_reason {
                Some(reason) => format!("response has no candidates (prompt blocked: {reason})"),
                None => "response has no candidates".to_string(),
            })),
        }
    }
}
