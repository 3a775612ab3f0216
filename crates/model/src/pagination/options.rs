use crate::core::identifiers::JobReference;

/// How raw cells are turned into [`crate::core::value::Value`]s. Never sent to
/// the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Keep INT64 cells as exact text instead of narrowing to `i64`.
    pub wrap_integers: bool,
    /// Parse JSON columns into structured values instead of leaving them as text.
    pub parse_json: bool,
    /// TIMESTAMP cells arrive as int64 microseconds rather than float seconds.
    pub int64_timestamp: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            wrap_integers: false,
            parse_json: false,
            int64_timestamp: true,
        }
    }
}

/// Options for one query-results fetch. A value of this type returned as
/// `next_query` is the continuation request: feed it back to fetch the next
/// page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResultsOptions {
    pub job: JobReference,
    /// Bounds how long this single fetch waits for the job to finish.
    pub timeout_ms: Option<u64>,
    pub page_token: Option<String>,
    pub start_index: Option<u64>,
    pub max_results: Option<u32>,
    pub decode: DecodeOptions,
}

impl QueryResultsOptions {
    pub fn for_job(job: JobReference) -> Self {
        QueryResultsOptions {
            job,
            ..Default::default()
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn with_start_index(mut self, start_index: u64) -> Self {
        self.start_index = Some(start_index);
        self
    }

    pub fn with_page_token(mut self, page_token: impl Into<String>) -> Self {
        self.page_token = Some(page_token.into());
        self
    }

    pub fn with_decode(mut self, decode: DecodeOptions) -> Self {
        self.decode = decode;
        self
    }

    /// Path of the query-results resource relative to the API root.
    pub fn path(&self) -> String {
        format!(
            "projects/{}/queries/{}",
            self.job.project_id, self.job.job_id
        )
    }

    /// Query parameters sent to the service. Decode policy stays client-side.
    pub fn wire_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(location) = &self.job.location {
            params.push(("location".to_string(), location.clone()));
        }
        if let Some(timeout_ms) = self.timeout_ms {
            params.push(("timeoutMs".to_string(), timeout_ms.to_string()));
        }
        if let Some(page_token) = &self.page_token {
            params.push(("pageToken".to_string(), page_token.clone()));
        }
        if let Some(start_index) = self.start_index {
            params.push(("startIndex".to_string(), start_index.to_string()));
        }
        if let Some(max_results) = self.max_results {
            params.push(("maxResults".to_string(), max_results.to_string()));
        }
        params.push((
            "formatOptions.useInt64Timestamp".to_string(),
            self.decode.int64_timestamp.to_string(),
        ));
        params
    }

    /// Continuation for the page after the one `page_token` points at.
    /// Page tokens and start indexes are exclusive; the token wins.
    pub fn continue_with_token(&self, page_token: &str) -> Self {
        let mut next = self.clone();
        next.page_token = Some(page_token.to_string());
        next.start_index = None;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> QueryResultsOptions {
        QueryResultsOptions::for_job(
            JobReference::new("proj", "job_1").with_location(Some("EU".to_string())),
        )
    }

    #[test]
    fn wire_params_exclude_decode_policy() {
        let options = options()
            .with_timeout_ms(1000)
            .with_max_results(50)
            .with_decode(DecodeOptions {
                wrap_integers: true,
                parse_json: true,
                int64_timestamp: true,
            });

        let params = options.wire_params();
        let keys: Vec<_> = params.iter().map(|(k, _)| k.as_str()).collect();

        assert_eq!(
            keys,
            vec![
                "location",
                "timeoutMs",
                "maxResults",
                "formatOptions.useInt64Timestamp"
            ]
        );
        assert!(!keys.iter().any(|k| k.contains("wrap") || k.contains("parse")));
        assert_eq!(options.path(), "projects/proj/queries/job_1");
    }

    #[test]
    fn token_continuation_drops_start_index() {
        let options = options().with_start_index(100).with_max_results(10);
        let next = options.continue_with_token("tok-2");

        assert_eq!(next.page_token.as_deref(), Some("tok-2"));
        assert_eq!(next.start_index, None);
        assert_eq!(next.max_results, Some(10));
        assert_eq!(next.job, options.job);
    }
}
