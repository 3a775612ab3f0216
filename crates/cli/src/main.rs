use crate::{
    commands::{Commands, DecodeArgs, JobCommand},
    env::EnvManager,
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use client::{Client, ClientConfig, PagerLimits, QueryRequest};
use futures_util::TryStreamExt;
use model::pagination::options::{DecodeOptions, QueryResultsOptions};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod env;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(name = "bqjobs", version, about = "Inspect query jobs and page through their results")]
struct Cli {
    #[arg(long, global = true, help = "Load BQJOBS_* settings from this .env file")]
    env_file: Option<String>,

    #[arg(long, global = true, help = "Project ID (overrides BQJOBS_PROJECT)")]
    project: Option<String>,

    #[arg(long, global = true, help = "Job location (overrides BQJOBS_LOCATION)")]
    location: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let code = match run(cli, &shutdown).await {
        Ok(code) => code,
        Err(err) if err.is_shutdown() || shutdown.is_shutdown_requested() => {
            info!("Interrupted");
            ExitCode::ShutdownRequested
        }
        Err(err) => {
            error!("{err}");
            ExitCode::GeneralError
        }
    };

    std::process::exit(code.as_i32());
}

async fn run(cli: Cli, shutdown: &ShutdownCoordinator) -> Result<ExitCode, CliError> {
    let mut env = EnvManager::new();
    if let Some(path) = &cli.env_file {
        env.load_from_file(path)?;
    }
    if let Some(project) = &cli.project {
        env.set(client::config::ENV_PROJECT, project);
    }
    if let Some(location) = &cli.location {
        env.set(client::config::ENV_LOCATION, location);
    }

    if let Commands::Config = cli.command {
        for line in env.describe("BQJOBS_") {
            println!("{line}");
        }
        return Ok(ExitCode::Success);
    }

    let config = ClientConfig::from_env(env.all())?;
    let client = Client::from_config(config)?;

    match cli.command {
        Commands::Job { command } => run_job_command(&client, command, shutdown).await,
        Commands::Query {
            sql,
            file,
            max_results,
            max_rows,
            max_api_calls,
            decode,
        } => {
            let sql = match (sql, file) {
                (Some(sql), _) => sql,
                (None, Some(path)) => tokio::fs::read_to_string(path).await?,
                (None, None) => {
                    return Err(CliError::Config("Provide the SQL text or --file".into()));
                }
            };

            let mut request = QueryRequest::new(sql).with_decode(decode_options(decode));
            request.max_results = max_results;

            let limits = PagerLimits {
                max_api_calls,
                max_rows,
            };
            let outcome = client.query(request).await?;
            info!(job_id = %outcome.job.id(), "Query submitted");

            let mut rows = outcome.into_pager(client.transport(), limits).into_stream();
            while let Some(row) = rows.try_next().await? {
                output::print_row(&row)?;
                if shutdown.is_shutdown_requested() {
                    return Err(CliError::ShutdownRequested);
                }
            }
            Ok(ExitCode::Success)
        }
        Commands::Results {
            job_id,
            page_token,
            start_index,
            max_results,
            timeout_ms,
            decode,
        } => {
            let job = client.job(job_id, None);
            let options = QueryResultsOptions {
                job: job.reference(),
                timeout_ms,
                page_token,
                start_index,
                max_results,
                decode: decode_options(decode),
            };

            let page = job.get_query_results(options, None).await?;
            output::print_page(&page)?;
            Ok(ExitCode::Success)
        }
        Commands::Config => Ok(ExitCode::Success),
    }
}

async fn run_job_command(
    client: &Client,
    command: JobCommand,
    shutdown: &ShutdownCoordinator,
) -> Result<ExitCode, CliError> {
    match command {
        JobCommand::Status { job_id, json } => {
            let mut job = client.job(job_id, None);
            let metadata = job.get_metadata().await?;
            output::print_metadata(&metadata, json)?;
        }
        JobCommand::Wait { job_id } => {
            let mut job = client.job(job_id, None);
            let metadata = job.wait_for_completion(shutdown.cancel_token()).await?;
            output::print_metadata(&metadata, false)?;
        }
        JobCommand::Cancel { job_id, wait } => {
            let mut job = client.job(job_id, None);
            job.cancel().await?;
            info!(job_id = %job.id(), "Cancellation requested");
            if wait {
                // The job may still finish successfully or fail with a
                // cancellation error result.
                match job.wait_for_completion(shutdown.cancel_token()).await {
                    Ok(metadata) => output::print_metadata(&metadata, false)?,
                    Err(engine_core::ClientError::OperationFailed { error, .. }) => {
                        println!("{:<12} {}", "Stopped", error);
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }
        JobCommand::Delete { job_id } => {
            let job = client.job(job_id, None);
            job.delete().await?;
            println!("deleted {}", job.id());
        }
        JobCommand::Exists { job_id } => {
            let mut job = client.job(job_id, None);
            if !job.exists().await? {
                println!("false");
                return Ok(ExitCode::NotFound);
            }
            println!("true");
        }
    }

    Ok(ExitCode::Success)
}

fn decode_options(args: DecodeArgs) -> DecodeOptions {
    DecodeOptions {
        wrap_integers: args.wrap_integers,
        parse_json: args.parse_json,
        ..Default::default()
    }
}
