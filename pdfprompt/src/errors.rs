use crate::config::ResponseConfig;
use crate::gemini::GeminiError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

/// Label prefixed to responses for collaborator transport failures.
pub const TRANSPORT_ERROR_LABEL: &str = "Error connecting to Gemini API";
/// Label prefixed to responses for every other server-side failure.
pub const INTERNAL_ERROR_LABEL: &str = "An internal server error occurred";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Malformed upload: missing parts, wrong file type, empty selection
    #[error("{message}")]
    BadRequest { message: String },

    /// Upload body exceeded the configured size limit
    #[error("{message}")]
    PayloadTooLarge { message: String },

    /// The generative-content service could not be reached (connect, DNS, timeout)
    #[error("{message}")]
    Transport { message: String },

    /// The generative-content service answered, but not with something usable
    #[error("{message}")]
    Upstream { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Transport { .. } | Error::Upstream { .. } | Error::Internal { .. } | Error::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The detail text for this error, including the cause chain for wrapped errors.
    fn detail(&self) -> String {
        match self {
            Error::Other(e) => format!("{e:#}"),
            _ => self.to_string(),
        }
    }

    /// Returns the response body for this error.
    ///
    /// Client errors always carry their message. Server errors carry a fixed label, followed by the
    /// underlying detail only when `expose_detail` is set.
    pub fn user_message(&self, expose_detail: bool) -> String {
        let label = match self {
            Error::BadRequest { message } | Error::PayloadTooLarge { message } => return message.clone(),
            Error::Transport { .. } => TRANSPORT_ERROR_LABEL,
            Error::Upstream { .. } | Error::Internal { .. } | Error::Other(_) => INTERNAL_ERROR_LABEL,
        };

        if expose_detail {
            format!("{label}: {}", self.detail())
        } else {
            format!("{label}.")
        }
    }

    /// Build the HTTP response, honouring the configured detail exposure.
    pub fn into_response_with(self, responses: &ResponseConfig) -> Response {
        match &self {
            Error::Transport { .. } => {
                tracing::error!("Gemini transport error: {}", self.detail());
            }
            Error::Upstream { .. } | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {}", self.detail());
            }
            Error::BadRequest { .. } | Error::PayloadTooLarge { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        (status, self.user_message(responses.expose_error_detail)).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.into_response_with(&ResponseConfig::default())
    }
}

impl From<GeminiError> for Error {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::Transport(message) => Error::Transport { message },
            other => Error::Upstream { message: other.to_string() },
        }
    }
}

/// Type alias for handler results
pub type Result<T> = std::result::Result<T, Error>;
