use engine_core::Job;
use model::{core::identifiers::JobReference, records::row::Row};
use serde_json::{Value as Json, json};
use std::{sync::Arc, time::Duration};
use transport::{Transport, testing::ScriptedTransport};

pub const PROJECT: &str = "proj";
pub const JOB_ID: &str = "job_42";
pub const LOCATION: &str = "EU";

/// Poll interval for scenario tests; keeps loops fast without busy-spinning.
pub const FAST_POLL: Duration = Duration::from_millis(2);

pub fn job_path(job_id: &str) -> String {
    format!("projects/{PROJECT}/jobs/{job_id}")
}

pub fn results_path(job_id: &str) -> String {
    format!("projects/{PROJECT}/queries/{job_id}")
}

pub fn reference() -> JobReference {
    JobReference::new(PROJECT, JOB_ID).with_location(Some(LOCATION.to_string()))
}

pub fn scripted() -> Arc<ScriptedTransport> {
    Arc::new(ScriptedTransport::new())
}

pub fn as_dyn(transport: &Arc<ScriptedTransport>) -> Arc<dyn Transport> {
    transport.clone()
}

pub fn job(transport: &Arc<ScriptedTransport>) -> Job {
    Job::new(as_dyn(transport), reference()).with_poll_interval(FAST_POLL)
}

/// A job resource in `state`, tagged with `poll` in its statistics so tests
/// can tell which response produced an event.
pub fn job_status(state: &str, poll: u32) -> Json {
    json!({
        "kind": "bigquery#job",
        "jobReference": {"projectId": PROJECT, "jobId": JOB_ID, "location": LOCATION},
        "status": {"state": state},
        "statistics": {"poll": poll}
    })
}

pub fn failed_status(reason: &str, message: &str) -> Json {
    json!({
        "jobReference": {"projectId": PROJECT, "jobId": JOB_ID, "location": LOCATION},
        "status": {
            "state": "DONE",
            "errorResult": {"reason": reason, "message": message},
            "errors": [{"reason": reason, "message": message}]
        }
    })
}

/// A complete results page holding the integers in `values`.
pub fn results_page(values: impl IntoIterator<Item = i64>, total: usize, token: Option<&str>) -> Json {
    let rows: Vec<Json> = values
        .into_iter()
        .map(|v| json!({"f": [{"v": v.to_string()}]}))
        .collect();
    let mut page = json!({
        "kind": "bigquery#getQueryResultsResponse",
        "jobComplete": true,
        "schema": {"fields": [{"name": "n", "type": "INTEGER", "mode": "REQUIRED"}]},
        "rows": rows,
        "totalRows": total.to_string()
    });
    if let Some(token) = token {
        page["pageToken"] = json!(token);
    }
    page
}

/// Scripts `total` rows split into pages of `page_size`, chained by tokens.
pub fn script_pages(transport: &ScriptedTransport, total: i64, page_size: i64) {
    let mut start = 0;
    let mut page = 0;
    while start < total {
        let end = (start + page_size).min(total);
        let token = (end < total).then(|| format!("page-{}", page + 1));
        transport.push(
            transport::Method::Get,
            results_path(JOB_ID),
            results_page(start..end, total as usize, token.as_deref()),
        );
        start = end;
        page += 1;
    }
}

pub fn ints(rows: &[Row]) -> Vec<i64> {
    rows.iter()
        .map(|row| row.get("n").and_then(|v| v.as_i64()).unwrap_or(-1))
        .collect()
}
