pub mod decode;

use crate::error::{ClientError, FetchError};
use decode::merge_schema_with_rows;
use model::{
    pagination::{
        options::QueryResultsOptions,
        page::{CachedPage, QueryResultsResponse},
    },
    records::row::Row,
};
use tracing::{debug, warn};
use transport::{ApiRequest, Transport, TransportError};

/// One page of decoded rows. `next_query` is `None` once the result set is
/// exhausted; `response` never carries the raw rows.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResultsPage {
    pub rows: Vec<Row>,
    pub next_query: Option<QueryResultsOptions>,
    pub response: QueryResultsResponse,
}

impl QueryResultsPage {
    pub fn is_last(&self) -> bool {
        self.next_query.is_none()
    }
}

/// Fetches a single page of query results.
///
/// A `cached` page (rows returned inline by the submitting call) is handed
/// back without touching the network. It is taken by value, so it can only
/// be served once.
pub async fn fetch_query_results(
    transport: &dyn Transport,
    options: &QueryResultsOptions,
    cached: Option<CachedPage>,
) -> Result<QueryResultsPage, FetchError> {
    if let Some(CachedPage { rows, mut response }) = cached {
        response.rows = None;
        let next_query = options
            .page_token
            .as_deref()
            .or(response.page_token.as_deref())
            .map(|token| options.continue_with_token(token));

        debug!(
            job_id = %options.job.job_id,
            rows = rows.len(),
            has_next = next_query.is_some(),
            "Serving cached first page"
        );
        return Ok(QueryResultsPage {
            rows,
            next_query,
            response,
        });
    }

    let request = ApiRequest::get(options.path()).with_query_pairs(options.wire_params());
    let raw = transport
        .request(request)
        .await
        .map_err(|err| FetchError::bare(ClientError::from_job_lookup(err, &options.job)))?;

    let mut response: QueryResultsResponse = serde_json::from_value(raw)
        .map_err(|err| FetchError::bare(TransportError::from(err).into()))?;
    let raw_rows = response.rows.take().unwrap_or_default();

    if response.is_incomplete() {
        let next_query = Some(options.clone());
        if let Some(timeout_ms) = options.timeout_ms {
            warn!(job_id = %options.job.job_id, timeout_ms, "Query did not complete in time");
            return Err(FetchError {
                error: ClientError::Timeout { timeout_ms },
                next_query,
                response: Some(response),
            });
        }

        debug!(job_id = %options.job.job_id, "Query still running");
        return Ok(QueryResultsPage {
            rows: Vec::new(),
            next_query,
            response,
        });
    }

    let rows = match &response.schema {
        Some(schema) if !raw_rows.is_empty() => {
            match merge_schema_with_rows(schema, &raw_rows, options.decode) {
                Ok(rows) => rows,
                Err(err) => {
                    return Err(FetchError {
                        error: err.into(),
                        next_query: None,
                        response: Some(response),
                    });
                }
            }
        }
        _ => Vec::new(),
    };

    let next_query = response
        .page_token
        .as_deref()
        .map(|token| options.continue_with_token(token));

    debug!(
        job_id = %options.job.job_id,
        rows = rows.len(),
        total_rows = ?response.total_rows(),
        has_next = next_query.is_some(),
        "Fetched results page"
    );

    Ok(QueryResultsPage {
        rows,
        next_query,
        response,
    })
}
