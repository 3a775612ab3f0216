use crate::{
    core::identifiers::JobReference, job::status::ErrorProto, records::row::Row,
    schema::TableSchema,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// Raw response of a query-results fetch (also the shape of a synchronous
/// query response). `rows` holds the undecoded `{"f": [{"v": ...}]}` payload
/// and is stripped before the response is handed back to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultsResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_reference: Option<JobReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<TableSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Json>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_complete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_bytes_processed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_hit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_dml_affected_rows: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorProto>,
    #[serde(flatten)]
    pub extra: Map<String, Json>,
}

impl QueryResultsResponse {
    /// True only when the service explicitly reports the job as still running.
    pub fn is_incomplete(&self) -> bool {
        self.job_complete == Some(false)
    }

    pub fn total_rows(&self) -> Option<u64> {
        self.total_rows.as_deref().and_then(|n| n.parse().ok())
    }
}

/// First page returned inline by the submitting call. Handed to exactly one
/// fetch, which returns it without a network round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPage {
    pub rows: Vec<Row>,
    pub response: QueryResultsResponse,
}
