use model::{
    core::identifiers::JobReference,
    job::status::ErrorProto,
    pagination::{options::QueryResultsOptions, page::QueryResultsResponse},
};
use serde_json::Value as Json;
use thiserror::Error;
use transport::TransportError;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Row has {found} cells but the schema has {expected} fields")]
    CellCount { expected: usize, found: usize },

    #[error("Column '{column}': expected {expected}, found {found}")]
    UnexpectedShape {
        column: String,
        expected: &'static str,
        found: String,
    },

    #[error("Column '{column}': invalid {field_type} value '{raw}'")]
    InvalidValue {
        column: String,
        field_type: String,
        raw: String,
    },
}

/// One rejected row of a streaming insert. `index` is the row's position in
/// the caller's input.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    pub index: usize,
    pub row: Json,
    pub errors: Vec<ErrorProto>,
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Not found: job {job_id}{}", location_suffix(.location))]
    NotFound {
        job_id: String,
        location: Option<String>,
    },

    #[error("Job {job_id} failed: {error}")]
    OperationFailed {
        job_id: String,
        error: ErrorProto,
        errors: Vec<ErrorProto>,
    },

    #[error("The query did not complete before {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("{} row(s) failed to insert", .failures.len())]
    PartialFailure { failures: Vec<RowFailure> },

    #[error("Failed to decode rows: {0}")]
    Decode(#[from] DecodeError),

    #[error("Waiting for the job was cancelled")]
    Cancelled,
}

fn location_suffix(location: &Option<String>) -> String {
    match location {
        Some(location) => format!(" in location {location}"),
        None => String::new(),
    }
}

impl ClientError {
    /// Maps a failed job or results lookup. A 404 becomes `NotFound`, anything
    /// else is passed through unchanged.
    pub fn from_job_lookup(err: TransportError, job: &JobReference) -> Self {
        if err.is_not_found() {
            ClientError::NotFound {
                job_id: job.job_id.clone(),
                location: job.location.clone(),
            }
        } else {
            ClientError::Transport(err)
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout { .. })
    }
}

/// A failed results fetch. The raw response and continuation are kept when
/// the server answered, so callers can inspect statistics or retry.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct FetchError {
    #[source]
    pub error: ClientError,
    pub next_query: Option<QueryResultsOptions>,
    pub response: Option<QueryResultsResponse>,
}

impl FetchError {
    pub(crate) fn bare(error: ClientError) -> Self {
        FetchError {
            error,
            next_query: None,
            response: None,
        }
    }
}

impl From<FetchError> for ClientError {
    fn from(err: FetchError) -> Self {
        err.error
    }
}
