use crate::error::ClientError;
use model::job::metadata::JobMetadata;

/// Result of a single status check.
#[derive(Debug)]
pub enum PollOutcome {
    /// The job has not reached `DONE` yet.
    Incomplete,
    Complete(JobMetadata),
    /// Either the status fetch failed or the job finished with an error result.
    Failed(ClientError),
}

impl PollOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollOutcome::Incomplete)
    }

    /// Classifies freshly fetched metadata. An `errorResult` wins over the
    /// state: a successful fetch can still describe a failed job.
    pub(crate) fn from_metadata(job_id: &str, metadata: JobMetadata) -> Self {
        if let Some(error) = metadata.error_result() {
            return PollOutcome::Failed(ClientError::OperationFailed {
                job_id: job_id.to_string(),
                error: error.clone(),
                errors: metadata.status.errors.clone(),
            });
        }

        if metadata.is_done() {
            PollOutcome::Complete(metadata)
        } else {
            PollOutcome::Incomplete
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(status: serde_json::Value) -> JobMetadata {
        serde_json::from_value(json!({ "status": status })).unwrap()
    }

    #[test]
    fn classifies_states() {
        let running = PollOutcome::from_metadata("j", metadata(json!({"state": "RUNNING"})));
        assert!(matches!(running, PollOutcome::Incomplete));

        let done = PollOutcome::from_metadata("j", metadata(json!({"state": "DONE"})));
        assert!(matches!(done, PollOutcome::Complete(_)));

        let lowercase = PollOutcome::from_metadata("j", metadata(json!({"state": "done"})));
        assert!(!lowercase.is_terminal());
    }

    #[test]
    fn error_result_fails_even_when_done() {
        let outcome = PollOutcome::from_metadata(
            "j",
            metadata(json!({
                "state": "DONE",
                "errorResult": {"reason": "invalidQuery", "message": "Syntax error"},
                "errors": [{"reason": "invalidQuery", "message": "Syntax error"}]
            })),
        );

        match outcome {
            PollOutcome::Failed(ClientError::OperationFailed { error, errors, .. }) => {
                assert_eq!(error.reason.as_deref(), Some("invalidQuery"));
                assert_eq!(errors.len(), 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
