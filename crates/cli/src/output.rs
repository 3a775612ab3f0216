use crate::error::CliError;
use engine_core::QueryResultsPage;
use model::{job::metadata::JobMetadata, records::row::Row};

pub fn print_row(row: &Row) -> Result<(), CliError> {
    println!("{}", serde_json::to_string(&row.to_json())?);
    Ok(())
}

pub fn print_metadata(metadata: &JobMetadata, as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(metadata)?);
        return Ok(());
    }

    let job_id = metadata
        .job_reference
        .as_ref()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "n/a".to_string());
    println!("{:<12} {}", "Job", job_id);
    println!("{:<12} {}", "State", metadata.state_str());
    if let Some(error) = metadata.error_result() {
        println!("{:<12} {}", "Error", error);
    }
    for error in &metadata.status.errors {
        println!("{:<12} {}", "", error);
    }
    Ok(())
}

/// Rows as JSON lines, then the continuation on stderr so stdout stays
/// machine-readable.
pub fn print_page(page: &QueryResultsPage) -> Result<(), CliError> {
    for row in &page.rows {
        print_row(row)?;
    }

    if let Some(total) = page.response.total_rows() {
        eprintln!("total rows: {total}");
    }
    match page.next_query.as_ref() {
        Some(next) => match &next.page_token {
            Some(token) => eprintln!("next page token: {token}"),
            None => eprintln!("job still running; repeat the same request"),
        },
        None => eprintln!("no more pages"),
    }
    Ok(())
}
