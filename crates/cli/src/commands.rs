use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect or control an existing job
    Job {
        #[command(subcommand)]
        command: JobCommand,
    },
    /// Run a query and print its rows as JSON lines
    Query {
        /// SQL text; use --file to read it from disk instead
        sql: Option<String>,

        #[arg(long, help = "Read the query text from this file")]
        file: Option<String>,

        #[arg(long, help = "Page size requested from the service")]
        max_results: Option<u32>,

        #[arg(long, help = "Stop after this many rows")]
        max_rows: Option<u64>,

        #[arg(long, help = "Stop after this many result requests")]
        max_api_calls: Option<u32>,

        #[command(flatten)]
        decode: DecodeArgs,
    },
    /// Fetch a single page of a job's results
    Results {
        job_id: String,

        #[arg(long, help = "Continuation token printed by a previous call")]
        page_token: Option<String>,

        #[arg(long, help = "Zero-based row to start from (ignored with --page-token)")]
        start_index: Option<u64>,

        #[arg(long)]
        max_results: Option<u32>,

        #[arg(
            long,
            help = "Fail if the job has not finished within this many milliseconds"
        )]
        timeout_ms: Option<u64>,

        #[command(flatten)]
        decode: DecodeArgs,
    },
    /// Print the effective BQJOBS_* settings with secrets masked
    Config,
}

#[derive(Subcommand)]
pub enum JobCommand {
    /// Fetch the job resource once
    Status {
        job_id: String,

        #[arg(long, help = "Print the full job resource as JSON")]
        json: bool,
    },
    /// Poll until the job finishes
    Wait { job_id: String },
    /// Request cancellation; with --wait, keep polling until the job stops
    Cancel {
        job_id: String,

        #[arg(long)]
        wait: bool,
    },
    /// Delete the job's server-side record
    Delete { job_id: String },
    /// Exit with status 0 if the job exists, 2 otherwise
    Exists { job_id: String },
}

#[derive(Args, Clone, Copy)]
pub struct DecodeArgs {
    #[arg(long, help = "Keep INTEGER values as exact decimal strings")]
    pub wrap_integers: bool,

    #[arg(long, help = "Parse JSON columns instead of returning their text")]
    pub parse_json: bool,
}
