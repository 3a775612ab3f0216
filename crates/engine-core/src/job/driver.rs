use crate::{
    error::ClientError,
    job::{Job, poll::PollOutcome},
};
use model::job::metadata::JobMetadata;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Polls until the job reaches a terminal state, one request at a time, with
/// `poll_interval` between ticks. Fetch errors end the loop; they are not
/// retried here.
pub(crate) async fn run_until_terminal(
    job: &mut Job,
    cancel: &CancellationToken,
) -> Result<JobMetadata, ClientError> {
    let interval = job.poll_interval();
    let mut polls: u32 = 0;

    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(job_id = %job.id(), polls, "Completion wait cancelled");
                return Err(ClientError::Cancelled);
            }
            outcome = job.poll() => outcome,
        };
        polls += 1;

        match outcome {
            PollOutcome::Complete(metadata) => {
                info!(job_id = %job.id(), location = ?job.location(), polls, "Job completed");
                return Ok(metadata);
            }
            PollOutcome::Failed(err) => {
                warn!(job_id = %job.id(), location = ?job.location(), polls, error = %err, "Job failed");
                return Err(err);
            }
            PollOutcome::Incomplete => {
                let metadata = job.metadata();
                debug!(
                    job_id = %job.id(),
                    state = metadata.as_ref().map_or("UNKNOWN", |m| m.state_str()),
                    polls,
                    "Job still running"
                );
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(job_id = %job.id(), polls, "Completion wait cancelled");
                return Err(ClientError::Cancelled);
            }
            _ = sleep(interval) => {}
        }
    }
}
