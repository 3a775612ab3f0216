use model::pagination::options::DecodeOptions;
use serde_json::{Map, Value as Json, json};
use std::collections::BTreeMap;

/// A query submitted through `jobs.insert`. The job ID is `job_id` when
/// given, otherwise `job_prefix` followed by a random UUID.
#[derive(Debug, Clone, Default)]
pub struct QueryJobRequest {
    pub query: String,
    pub job_id: Option<String>,
    pub job_prefix: Option<String>,
    pub location: Option<String>,
    pub use_legacy_sql: bool,
    pub use_query_cache: Option<bool>,
    pub dry_run: bool,
    pub maximum_bytes_billed: Option<u64>,
    pub labels: BTreeMap<String, String>,
}

impl QueryJobRequest {
    pub fn new(query: impl Into<String>) -> Self {
        QueryJobRequest {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn with_job_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.job_prefix = Some(prefix.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub(crate) fn to_body(&self, project_id: &str, job_id: &str, location: Option<&str>) -> Json {
        let mut query = Map::new();
        query.insert("query".into(), json!(self.query));
        query.insert("useLegacySql".into(), json!(self.use_legacy_sql));
        if let Some(use_cache) = self.use_query_cache {
            query.insert("useQueryCache".into(), json!(use_cache));
        }
        if let Some(bytes) = self.maximum_bytes_billed {
            query.insert("maximumBytesBilled".into(), json!(bytes.to_string()));
        }

        let mut configuration = Map::new();
        configuration.insert("query".into(), Json::Object(query));
        if self.dry_run {
            configuration.insert("dryRun".into(), json!(true));
        }
        if !self.labels.is_empty() {
            configuration.insert("labels".into(), json!(self.labels));
        }

        let mut reference = Map::new();
        reference.insert("projectId".into(), json!(project_id));
        reference.insert("jobId".into(), json!(job_id));
        if let Some(location) = location {
            reference.insert("location".into(), json!(location));
        }

        json!({
            "jobReference": reference,
            "configuration": configuration,
        })
    }
}

/// A query submitted through `jobs.query`, which may answer with the first
/// page of rows inline.
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub query: String,
    pub location: Option<String>,
    pub use_legacy_sql: bool,
    pub use_query_cache: Option<bool>,
    pub dry_run: bool,
    /// Page size for the inline page and later pages.
    pub max_results: Option<u32>,
    /// How long the service may hold the call open waiting for the job.
    pub timeout_ms: Option<u64>,
    pub labels: BTreeMap<String, String>,
    pub decode: DecodeOptions,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        QueryRequest {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_decode(mut self, decode: DecodeOptions) -> Self {
        self.decode = decode;
        self
    }

    pub(crate) fn to_body(&self, location: Option<&str>, request_id: &str) -> Json {
        let mut body = Map::new();
        body.insert("query".into(), json!(self.query));
        body.insert("useLegacySql".into(), json!(self.use_legacy_sql));
        body.insert("requestId".into(), json!(request_id));
        body.insert(
            "formatOptions".into(),
            json!({"useInt64Timestamp": self.decode.int64_timestamp}),
        );
        if let Some(location) = location {
            body.insert("location".into(), json!(location));
        }
        if let Some(use_cache) = self.use_query_cache {
            body.insert("useQueryCache".into(), json!(use_cache));
        }
        if self.dry_run {
            body.insert("dryRun".into(), json!(true));
        }
        if let Some(max_results) = self.max_results {
            body.insert("maxResults".into(), json!(max_results));
        }
        if let Some(timeout_ms) = self.timeout_ms {
            body.insert("timeoutMs".into(), json!(timeout_ms));
        }
        if !self.labels.is_empty() {
            body.insert("labels".into(), json!(self.labels));
        }
        Json::Object(body)
    }
}
