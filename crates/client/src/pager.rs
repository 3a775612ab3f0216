use engine_core::{FetchError, QueryResultsPage, fetch_query_results};
use futures::{
    StreamExt, TryStreamExt,
    stream::{self, BoxStream},
};
use model::{
    pagination::{
        options::QueryResultsOptions,
        page::{CachedPage, QueryResultsResponse},
    },
    records::row::Row,
};
use std::sync::Arc;
use tracing::debug;
use transport::Transport;

/// Caps for auto-pagination. `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PagerLimits {
    pub max_api_calls: Option<u32>,
    pub max_rows: Option<u64>,
}

impl PagerLimits {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_max_api_calls(mut self, calls: u32) -> Self {
        self.max_api_calls = Some(calls);
        self
    }

    pub fn with_max_rows(mut self, rows: u64) -> Self {
        self.max_rows = Some(rows);
        self
    }
}

/// Drives `fetch_query_results` with each `next_query` until the result set
/// is exhausted or a limit is hit.
pub struct Pager {
    transport: Arc<dyn Transport>,
    next: Option<QueryResultsOptions>,
    cached: Option<CachedPage>,
    limits: PagerLimits,
    api_calls: u32,
    rows_returned: u64,
    last_response: Option<QueryResultsResponse>,
}

impl Pager {
    pub fn new(
        transport: Arc<dyn Transport>,
        options: QueryResultsOptions,
        cached: Option<CachedPage>,
        limits: PagerLimits,
    ) -> Self {
        Pager {
            transport,
            next: Some(options),
            cached,
            limits,
            api_calls: 0,
            rows_returned: 0,
            last_response: None,
        }
    }

    /// Number of fetches issued so far. A cached first page counts as one.
    pub fn api_calls(&self) -> u32 {
        self.api_calls
    }

    pub fn rows_returned(&self) -> u64 {
        self.rows_returned
    }

    pub fn last_response(&self) -> Option<&QueryResultsResponse> {
        self.last_response.as_ref()
    }

    /// The continuation for the next page, if any remains.
    pub fn next_query(&self) -> Option<&QueryResultsOptions> {
        self.next.as_ref()
    }

    fn limit_reached(&self) -> bool {
        self.limits
            .max_api_calls
            .is_some_and(|max| self.api_calls >= max)
            || self
                .limits
                .max_rows
                .is_some_and(|max| self.rows_returned >= max)
    }

    /// Fetches the next page, or `None` once exhausted or limited. After a
    /// timeout the continuation is kept, so calling again resumes.
    pub async fn next_page(&mut self) -> Result<Option<QueryResultsPage>, FetchError> {
        if self.limit_reached() {
            if self.next.is_some() {
                debug!(api_calls = self.api_calls, rows = self.rows_returned, "Pagination limit reached");
            }
            return Ok(None);
        }
        let Some(options) = self.next.take() else {
            return Ok(None);
        };

        self.api_calls += 1;
        let mut page = match fetch_query_results(self.transport.as_ref(), &options, self.cached.take()).await {
            Ok(page) => page,
            Err(err) => {
                self.next = err.next_query.clone();
                return Err(err);
            }
        };

        if let Some(max_rows) = self.limits.max_rows {
            let remaining = max_rows.saturating_sub(self.rows_returned);
            page.rows.truncate(usize::try_from(remaining).unwrap_or(usize::MAX));
        }

        self.rows_returned += page.rows.len() as u64;
        self.next = page.next_query.clone();
        self.last_response = Some(page.response.clone());
        Ok(Some(page))
    }

    /// Collects every remaining row.
    pub async fn all(&mut self) -> Result<Vec<Row>, FetchError> {
        let mut rows = Vec::new();
        while let Some(page) = self.next_page().await? {
            rows.extend(page.rows);
        }
        Ok(rows)
    }

    /// Yields rows lazily, fetching a page whenever the previous one is used
    /// up.
    pub fn into_stream(self) -> BoxStream<'static, Result<Row, FetchError>> {
        stream::try_unfold(self, |mut pager| async move {
            match pager.next_page().await? {
                Some(page) => {
                    let rows = stream::iter(page.rows.into_iter().map(Ok::<Row, FetchError>));
                    Ok::<_, FetchError>(Some((rows, pager)))
                }
                None => Ok(None),
            }
        })
        .try_flatten()
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::identifiers::JobReference;
    use serde_json::json;
    use transport::{Method, testing::ScriptedTransport};

    const PATH: &str = "projects/p/queries/j";

    fn page(values: &[&str], token: Option<&str>) -> serde_json::Value {
        let rows: Vec<_> = values.iter().map(|v| json!({"f": [{"v": v}]})).collect();
        let mut body = json!({
            "jobComplete": true,
            "schema": {"fields": [{"name": "n", "type": "INTEGER"}]},
            "rows": rows,
            "totalRows": "5"
        });
        if let Some(token) = token {
            body["pageToken"] = json!(token);
        }
        body
    }

    fn pager(transport: &Arc<ScriptedTransport>, limits: PagerLimits) -> Pager {
        let transport: Arc<dyn Transport> = transport.clone();
        Pager::new(
            transport,
            QueryResultsOptions::for_job(JobReference::new("p", "j")).with_max_results(2),
            None,
            limits,
        )
    }

    fn scripted() -> Arc<ScriptedTransport> {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .push(Method::Get, PATH, page(&["1", "2"], Some("t1")))
            .push(Method::Get, PATH, page(&["3", "4"], Some("t2")))
            .push(Method::Get, PATH, page(&["5"], None));
        transport
    }

    fn numbers(rows: &[Row]) -> Vec<i64> {
        rows.iter()
            .filter_map(|r| r.get("n").and_then(|v| v.as_i64()))
            .collect()
    }

    #[tokio::test]
    async fn all_walks_every_page() {
        let transport = scripted();
        let mut pager = pager(&transport, PagerLimits::unlimited());

        let rows = pager.all().await.unwrap();

        assert_eq!(numbers(&rows), vec![1, 2, 3, 4, 5]);
        assert_eq!(pager.api_calls(), 3);
        assert!(pager.next_query().is_none());

        let tokens: Vec<_> = transport
            .requests()
            .iter()
            .map(|r| r.query_value("pageToken").map(str::to_string))
            .collect();
        assert_eq!(tokens, vec![None, Some("t1".into()), Some("t2".into())]);
    }

    #[tokio::test]
    async fn respects_row_and_call_limits() {
        let transport = scripted();
        let mut limited = pager(&transport, PagerLimits::unlimited().with_max_rows(3));
        assert_eq!(numbers(&limited.all().await.unwrap()), vec![1, 2, 3]);
        assert_eq!(limited.api_calls(), 2);

        let transport = scripted();
        let mut limited = pager(&transport, PagerLimits::unlimited().with_max_api_calls(1));
        assert_eq!(numbers(&limited.all().await.unwrap()), vec![1, 2]);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn stream_yields_rows_in_order() {
        let transport = scripted();
        let rows: Vec<Row> = pager(&transport, PagerLimits::unlimited())
            .into_stream()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(numbers(&rows), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn keeps_continuation_after_timeout() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .push(Method::Get, PATH, json!({"jobComplete": false}))
            .push(Method::Get, PATH, page(&["1"], None));
        let dyn_transport: Arc<dyn Transport> = transport.clone();
        let options = QueryResultsOptions::for_job(JobReference::new("p", "j")).with_timeout_ms(10);
        let mut pager = Pager::new(dyn_transport, options, None, PagerLimits::unlimited());

        let err = pager.next_page().await.unwrap_err();
        assert!(err.error.is_timeout());
        assert!(pager.next_query().is_some());

        let page = pager.next_page().await.unwrap().unwrap();
        assert_eq!(numbers(&page.rows), vec![1]);
    }
}
