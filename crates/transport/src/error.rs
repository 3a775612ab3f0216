use model::job::status::ErrorProto;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The service answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        errors: Vec<ErrorProto>,
    },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        TransportError::Http {
            status,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            TransportError::Request(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Builds an `Http` error from a failed response body of the form
    /// `{"error": {"code": .., "message": .., "errors": [..]}}`.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        #[derive(Deserialize)]
        struct Envelope {
            error: ErrorBody,
        }

        #[derive(Deserialize)]
        struct ErrorBody {
            #[serde(default)]
            message: Option<String>,
            #[serde(default)]
            errors: Vec<ErrorProto>,
        }

        match serde_json::from_slice::<Envelope>(body) {
            Ok(envelope) => TransportError::Http {
                status,
                message: envelope
                    .error
                    .message
                    .unwrap_or_else(|| format!("status {status}")),
                errors: envelope.error.errors,
            },
            Err(_) => TransportError::Http {
                status,
                message: String::from_utf8_lossy(body).trim().to_string(),
                errors: Vec::new(),
            },
        }
    }
}
