pub mod driver;
pub mod poll;
pub mod watch;

use crate::{
    error::{ClientError, FetchError},
    results::{QueryResultsPage, fetch_query_results},
};
use model::{
    core::identifiers::JobReference,
    job::metadata::JobMetadata,
    pagination::{options::QueryResultsOptions, page::CachedPage},
};
use poll::PollOutcome;
use serde::Deserialize;
use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info};
use transport::{ApiRequest, Transport, TransportError};
use watch::{CompletionListener, JobEvent, ListenerRegistry};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Client-side handle to a server-side job.
///
/// Each handle keeps its own metadata and its own polling state. Two handles
/// for the same job ID poll independently. The background poller started by
/// [`Job::on_complete`] writes into the handle's metadata cache, so the
/// handle observes the terminal state it reports.
pub struct Job {
    transport: Arc<dyn Transport>,
    reference: JobReference,
    metadata: Arc<Mutex<Option<JobMetadata>>>,
    poll_interval: Duration,
    listeners: Arc<ListenerRegistry>,
}

impl Job {
    pub fn new(transport: Arc<dyn Transport>, reference: JobReference) -> Self {
        Job {
            transport,
            reference,
            metadata: Arc::new(Mutex::new(None)),
            poll_interval: DEFAULT_POLL_INTERVAL,
            listeners: Arc::new(ListenerRegistry::default()),
        }
    }

    /// A handle seeded with metadata the caller already has, e.g. the job
    /// resource returned by an insert.
    pub fn with_metadata(
        transport: Arc<dyn Transport>,
        reference: JobReference,
        metadata: JobMetadata,
    ) -> Self {
        let job = Job::new(transport, reference);
        job.replace_metadata(metadata);
        job
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn id(&self) -> &str {
        &self.reference.job_id
    }

    /// The configured location, or the one the service reported for the job.
    pub fn location(&self) -> Option<String> {
        self.reference.location.clone().or_else(|| {
            self.cached()
                .as_ref()
                .and_then(|m| m.job_reference.as_ref())
                .and_then(|r| r.location.clone())
        })
    }

    pub fn reference(&self) -> JobReference {
        JobReference {
            location: self.location(),
            ..self.reference.clone()
        }
    }

    /// Last-fetched job resource, shared with the completion poller.
    pub fn metadata(&self) -> Option<JobMetadata> {
        self.cached().clone()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn is_done(&self) -> bool {
        self.cached().as_ref().is_some_and(JobMetadata::is_done)
    }

    /// Fetches the job resource once and replaces the cached metadata.
    pub async fn get_metadata(&mut self) -> Result<JobMetadata, ClientError> {
        let reference = self.reference();
        let request = ApiRequest::get(reference.path())
            .with_opt_query("location", reference.location.as_deref());

        let raw = self
            .transport
            .request(request)
            .await
            .map_err(|err| ClientError::from_job_lookup(err, &reference))?;
        let metadata: JobMetadata = serde_json::from_value(raw).map_err(TransportError::from)?;

        self.replace_metadata(metadata.clone());
        debug!(
            job_id = %reference.job_id,
            location = ?self.location(),
            state = metadata.state_str(),
            "Fetched job metadata"
        );
        Ok(metadata)
    }

    /// One status check. A handle that has already seen `DONE` answers from
    /// its cached metadata.
    pub async fn poll(&mut self) -> PollOutcome {
        if let Some(metadata) = self.metadata().filter(JobMetadata::is_done) {
            return PollOutcome::from_metadata(&self.reference.job_id, metadata);
        }

        match self.get_metadata().await {
            Ok(metadata) => PollOutcome::from_metadata(&self.reference.job_id, metadata),
            Err(err) => PollOutcome::Failed(err),
        }
    }

    /// Asks the service to cancel the job. Acceptance does not mean the job
    /// has stopped; keep polling to observe the terminal state.
    pub async fn cancel(&mut self) -> Result<(), ClientError> {
        #[derive(Deserialize)]
        struct CancelResponse {
            job: Option<JobMetadata>,
        }

        let reference = self.reference();
        let request = ApiRequest::post(format!("{}/cancel", reference.path()))
            .with_opt_query("location", reference.location.as_deref());
        let raw = self
            .transport
            .request(request)
            .await
            .map_err(|err| ClientError::from_job_lookup(err, &reference))?;

        let response: CancelResponse =
            serde_json::from_value(raw).map_err(TransportError::from)?;
        if let Some(metadata) = response.job {
            self.replace_metadata(metadata);
        }

        info!(job_id = %reference.job_id, location = ?reference.location, "Job cancellation requested");
        Ok(())
    }

    /// Deletes the job's server-side record. Does not touch client-side
    /// polling.
    pub async fn delete(&self) -> Result<(), ClientError> {
        let reference = self.reference();
        let request = ApiRequest::delete(format!("{}/delete", reference.path()))
            .with_opt_query("location", reference.location.as_deref());
        self.transport
            .request(request)
            .await
            .map_err(|err| ClientError::from_job_lookup(err, &reference))?;

        info!(job_id = %reference.job_id, location = ?reference.location, "Job deleted");
        Ok(())
    }

    pub async fn exists(&mut self) -> Result<bool, ClientError> {
        match self.get_metadata().await {
            Ok(_) => Ok(true),
            Err(ClientError::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Fetches one page of this job's results. The job reference in
    /// `options` is replaced with this handle's.
    pub async fn get_query_results(
        &self,
        mut options: QueryResultsOptions,
        cached: Option<CachedPage>,
    ) -> Result<QueryResultsPage, FetchError> {
        options.job = self.reference();
        fetch_query_results(self.transport.as_ref(), &options, cached).await
    }

    /// Polls until the job finishes, fails, or `cancel` fires.
    pub async fn wait_for_completion(
        &mut self,
        cancel: CancellationToken,
    ) -> Result<JobMetadata, ClientError> {
        driver::run_until_terminal(self, &cancel).await
    }

    /// Registers a completion listener. The first listener starts a polling
    /// task on the current tokio runtime; every listener then receives the
    /// same single terminal event.
    pub fn on_complete(&self) -> CompletionListener {
        let (sender, events) = mpsc::unbounded_channel();
        let registration = self.listeners.subscribe(sender);

        if let Some(token) = registration.start_poller {
            let mut job = self.fork();
            let registry = Arc::clone(&self.listeners);
            let poller = async move {
                let event = match driver::run_until_terminal(&mut job, &token).await {
                    Ok(metadata) => JobEvent::Complete(metadata),
                    Err(ClientError::Cancelled) => return,
                    Err(err) => JobEvent::Error(Arc::new(err)),
                };
                registry.publish(&token, event);
            };
            tokio::spawn(poller.in_current_span());
        }

        CompletionListener::new(registration.id, Arc::clone(&self.listeners), events)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.subscriber_count()
    }

    /// Whether a completion poller is currently running for this handle.
    pub fn is_polling(&self) -> bool {
        self.listeners.is_polling()
    }

    fn cached(&self) -> MutexGuard<'_, Option<JobMetadata>> {
        self.metadata
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn replace_metadata(&self, metadata: JobMetadata) {
        *self.cached() = Some(metadata);
    }

    /// Copy used by the background poller. It shares the metadata cache but
    /// never the listeners.
    fn fork(&self) -> Job {
        Job {
            transport: Arc::clone(&self.transport),
            reference: self.reference.clone(),
            metadata: Arc::clone(&self.metadata),
            poll_interval: self.poll_interval,
            listeners: Arc::new(ListenerRegistry::default()),
        }
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("reference", &self.reference)
            .field("state", &self.metadata().as_ref().map(JobMetadata::state_str))
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}
