use crate::{request::ApiRequest, retry::RetryPolicy};
use std::time::Duration;

pub const DEFAULT_API_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Extra time a long-poll request gets beyond its server-side `timeoutMs`.
pub const LONG_POLL_MARGIN: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub api_endpoint: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for TransportSettings {
    fn default() -> Self {
        TransportSettings {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            user_agent: concat!("bqjobs/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

impl TransportSettings {
    /// Absolute URL for a path relative to the API root.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Client-side deadline for one attempt of `req`. Requests that ask the
    /// server to wait (`timeoutMs`) get at least that wait plus
    /// [`LONG_POLL_MARGIN`], so the server answers before the client gives up.
    pub fn timeout_for(&self, req: &ApiRequest) -> Duration {
        req.query_value("timeoutMs")
            .and_then(|ms| ms.parse::<u64>().ok())
            .map(|ms| Duration::from_millis(ms).saturating_add(LONG_POLL_MARGIN))
            .map_or(self.request_timeout, |wait| wait.max(self.request_timeout))
    }
}
