use crate::{
    core::identifiers::JobReference,
    job::status::{ErrorProto, JobStatus},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// Last-fetched job resource. Replaced wholesale on every fetch; fields the
/// client does not model are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_reference: Option<JobReference>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Json>,
}

impl JobMetadata {
    pub fn is_done(&self) -> bool {
        self.status.is_done()
    }

    pub fn error_result(&self) -> Option<&ErrorProto> {
        self.status.error_result.as_ref()
    }

    pub fn state_str(&self) -> &str {
        self.status.state.as_deref().unwrap_or("UNKNOWN")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::status::JobState;

    #[test]
    fn decodes_job_resource_and_keeps_unknown_fields() {
        let metadata: JobMetadata = serde_json::from_value(serde_json::json!({
            "kind": "bigquery#job",
            "id": "proj:US.job_1",
            "jobReference": {"projectId": "proj", "jobId": "job_1", "location": "US"},
            "status": {"state": "RUNNING"},
            "statistics": {"creationTime": "1700000000000"},
            "principal_subject": "user:someone@example.com"
        }))
        .unwrap();

        assert_eq!(metadata.status.state(), Some(JobState::Running));
        assert!(!metadata.is_done());
        assert_eq!(
            metadata.job_reference.as_ref().unwrap().location(),
            Some("US")
        );
        assert!(metadata.extra.contains_key("principal_subject"));
    }

    #[test]
    fn done_requires_exact_state() {
        let done: JobMetadata =
            serde_json::from_value(serde_json::json!({"status": {"state": "DONE"}})).unwrap();
        let lower: JobMetadata =
            serde_json::from_value(serde_json::json!({"status": {"state": "done"}})).unwrap();
        let missing: JobMetadata = serde_json::from_value(serde_json::json!({})).unwrap();

        assert!(done.is_done());
        assert!(!lower.is_done());
        assert!(!missing.is_done());
    }

    #[test]
    fn surfaces_error_result() {
        let metadata: JobMetadata = serde_json::from_value(serde_json::json!({
            "status": {
                "state": "DONE",
                "errorResult": {"reason": "invalidQuery", "message": "Syntax error"},
                "errors": [{"reason": "invalidQuery", "message": "Syntax error"}]
            }
        }))
        .unwrap();

        let error = metadata.error_result().unwrap();
        assert_eq!(error.reason.as_deref(), Some("invalidQuery"));
        assert_eq!(error.to_string(), "Syntax error (invalidQuery)");
        assert_eq!(metadata.status.errors.len(), 1);
    }
}
