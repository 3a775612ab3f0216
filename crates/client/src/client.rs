use crate::{
    config::ClientConfig,
    pager::{Pager, PagerLimits},
    query::{QueryJobRequest, QueryRequest},
};
use engine_core::{
    ClientError, Job,
    insert::{InsertOptions, insert_rows},
    results::decode::merge_schema_with_rows,
};
use model::{
    core::identifiers::{JobReference, TableReference},
    insert::InsertAllResponse,
    job::metadata::JobMetadata,
    pagination::{
        options::QueryResultsOptions,
        page::{CachedPage, QueryResultsResponse},
    },
    records::row::Row,
};
use serde_json::Value as Json;
use std::sync::Arc;
use tracing::{debug, info};
use transport::{
    ApiRequest, Transport, TransportError,
    http::HttpTransport,
    middleware::{BearerAuth, Middleware, RequestLogging},
};
use uuid::Uuid;

/// What `Client::query` hands back: the job handle, the options to page
/// through its results, and the inline first page when the service sent one.
#[derive(Debug)]
pub struct QueryOutcome {
    pub job: Job,
    pub options: QueryResultsOptions,
    pub cached: Option<CachedPage>,
    /// The submission response, without rows.
    pub response: QueryResultsResponse,
}

impl QueryOutcome {
    /// Pager starting at the first page; the inline page, if any, is served
    /// without a request.
    pub fn into_pager(self, transport: Arc<dyn Transport>, limits: PagerLimits) -> Pager {
        Pager::new(transport, self.options, self.cached, limits)
    }
}

#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl Client {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Client { config, transport }
    }

    /// Builds an HTTP transport from the config. Middleware is fixed here, at
    /// construction.
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let mut middleware: Vec<Arc<dyn Middleware>> = vec![Arc::new(RequestLogging)];
        if let Some(token) = &config.access_token {
            middleware.push(Arc::new(BearerAuth::new(token.clone())));
        }

        let transport = HttpTransport::new(config.transport_settings(), middleware)?;
        Ok(Client::new(config, Arc::new(transport)))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn project_id(&self) -> &str {
        &self.config.project_id
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// Handle for an existing job. Falls back to the configured location.
    pub fn job(&self, job_id: impl Into<String>, location: Option<String>) -> Job {
        let reference = JobReference::new(self.config.project_id.clone(), job_id)
            .with_location(location.or_else(|| self.config.location.clone()));
        Job::new(self.transport(), reference).with_poll_interval(self.config.poll_interval)
    }

    /// Pager over the results of an existing job.
    pub fn pager(&self, options: QueryResultsOptions, limits: PagerLimits) -> Pager {
        Pager::new(self.transport(), options, None, limits)
    }

    /// Inserts a query job and returns its handle with the job resource the
    /// service sent back.
    pub async fn create_query_job(
        &self,
        request: QueryJobRequest,
    ) -> Result<(Job, JobMetadata), ClientError> {
        let job_id = match &request.job_id {
            Some(job_id) => job_id.clone(),
            None => format!(
                "{}{}",
                request.job_prefix.as_deref().unwrap_or_default(),
                Uuid::new_v4()
            ),
        };
        let location = request
            .location
            .clone()
            .or_else(|| self.config.location.clone());

        let body = request.to_body(&self.config.project_id, &job_id, location.as_deref());
        let raw = self
            .transport
            .request(
                ApiRequest::post(format!("projects/{}/jobs", self.config.project_id))
                    .with_body(body),
            )
            .await?;
        let metadata: JobMetadata = serde_json::from_value(raw).map_err(TransportError::from)?;

        if let Some(error) = metadata.error_result() {
            return Err(ClientError::OperationFailed {
                job_id,
                error: error.clone(),
                errors: metadata.status.errors.clone(),
            });
        }

        let reference = metadata.job_reference.clone().unwrap_or_else(|| {
            JobReference::new(self.config.project_id.clone(), job_id.clone()).with_location(location)
        });
        info!(job_id = %reference.job_id, location = ?reference.location, state = metadata.state_str(), "Created query job");

        let job = Job::with_metadata(self.transport(), reference, metadata.clone())
            .with_poll_interval(self.config.poll_interval);
        Ok((job, metadata))
    }

    /// Runs a query through `jobs.query`. When the job finished within the
    /// call, the inline rows become the one-shot cached first page.
    pub async fn query(&self, request: QueryRequest) -> Result<QueryOutcome, ClientError> {
        let location = request
            .location
            .clone()
            .or_else(|| self.config.location.clone());
        let request_id = Uuid::new_v4().to_string();
        let body = request.to_body(location.as_deref(), &request_id);

        let raw = self
            .transport
            .request(
                ApiRequest::post(format!("projects/{}/queries", self.config.project_id))
                    .with_body(body),
            )
            .await?;
        let mut response: QueryResultsResponse =
            serde_json::from_value(raw).map_err(TransportError::from)?;

        let mut reference = response.job_reference.clone().ok_or_else(|| {
            TransportError::InvalidRequest("query response carried no jobReference".into())
        })?;
        if reference.location.is_none() {
            reference.location = location;
        }

        let raw_rows = response.rows.take();
        let cached = if response.job_complete == Some(true)
            && (raw_rows.is_some() || response.schema.is_some())
        {
            let raw_rows = raw_rows.unwrap_or_default();
            let rows = match &response.schema {
                Some(schema) if !raw_rows.is_empty() => {
                    merge_schema_with_rows(schema, &raw_rows, request.decode)?
                }
                _ => Vec::new(),
            };
            Some(CachedPage {
                rows,
                response: response.clone(),
            })
        } else {
            None
        };

        debug!(
            job_id = %reference.job_id,
            job_complete = ?response.job_complete,
            cached_rows = cached.as_ref().map(|c| c.rows.len()),
            "Query submitted"
        );

        let mut options = QueryResultsOptions::for_job(reference.clone()).with_decode(request.decode);
        options.max_results = request.max_results;

        let job = Job::new(self.transport(), reference).with_poll_interval(self.config.poll_interval);
        Ok(QueryOutcome {
            job,
            options,
            cached,
            response,
        })
    }

    /// `query` followed by auto-pagination over every page.
    pub async fn query_all(
        &self,
        request: QueryRequest,
        limits: PagerLimits,
    ) -> Result<Vec<Row>, ClientError> {
        let outcome = self.query(request).await?;
        let mut pager = outcome.into_pager(self.transport(), limits);
        Ok(pager.all().await?)
    }

    pub async fn insert_rows(
        &self,
        table: &TableReference,
        rows: Vec<Json>,
        options: &InsertOptions,
    ) -> Result<InsertAllResponse, ClientError> {
        insert_rows(self.transport.as_ref(), table, rows, options).await
    }

    pub fn table(&self, dataset_id: &str, table_id: &str) -> TableReference {
        TableReference::new(self.config.project_id.clone(), dataset_id, table_id)
    }
}
