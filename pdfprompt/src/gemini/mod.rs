//! Generative-content service abstraction.
//!
//! This module defines the [`GenerativeClient`] trait, the two operations the upload handler needs
//! from the external service: uploading a local document and generating content from an ordered
//! list of parts. [`GeminiClient`] implements it against the Gemini REST API; tests substitute
//! in-process fakes.

use async_trait::async_trait;
use std::path::Path;

mod client;
mod types;

pub use client::GeminiClient;

/// Errors from the generative-content service, split by where the failure happened.
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    /// The request never got a response: connection refused, DNS failure, timeout
    #[error("{0}")]
    Transport(String),

    /// The request could not be built locally; nothing was sent
    #[error("Failed to build Gemini request: {0}")]
    Request(String),

    /// The service answered with a non-success status
    #[error("Gemini API returned status {status}: {body}")]
    Service { status: u16, body: String },

    /// The service answered successfully but the body was not usable
    #[error("Failed to decode Gemini response: {0}")]
    Decode(String),

    /// The local document could not be read for upload
    #[error("Failed to read document {path}: {source}")]
    Document {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for generative-content operations
pub type Result<T> = std::result::Result<T, GeminiError>;

/// Handle to a document stored by the service, usable in later generation calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Resource name, e.g. `files/abc-123`
    pub name: String,
    /// URI referenced from `fileData` parts
    pub uri: String,
    pub mime_type: String,
}

/// One element of the ordered content sent for generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    File(UploadedFile),
}

/// The external generative-content service.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Upload the document at `path` and return a handle for use in [`generate_content`].
    ///
    /// [`generate_content`]: GenerativeClient::generate_content
    async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<UploadedFile>;

    /// Generate text from `parts` with the given model.
    async fn generate_content(&self, model: &str, parts: Vec<ContentPart>) -> Result<String>;
}

/// Classify a reqwest failure. Anything that happened before a response arrived is transport.
pub(crate) fn classify_reqwest_error(err: reqwest::Error) -> GeminiError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        GeminiError::Transport(error_chain(&err))
    } else {
        GeminiError::Decode(error_chain(&err))
    }
}

/// Render an error and its sources as `outer: inner: innermost`.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("outer")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn test_error_chain_joins_sources() {
        let err = Outer(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"));
        assert_eq!(error_chain(&err), "outer: connection refused");
    }

    #[test]
    fn test_service_error_display() {
        let err = GeminiError::Service {
            status: 429,
            body: "quota exceeded".to_string(),
        };
        assert_eq!(err.to_string(), "Gemini API returned status 429: quota exceeded");
    }
}
