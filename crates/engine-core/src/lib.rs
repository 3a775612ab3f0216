//! The job engine: job handles with status polling and completion events,
//! paged query-results fetching, and streaming inserts.

pub mod error;
pub mod insert;
pub mod job;
pub mod results;

pub use error::{ClientError, DecodeError, FetchError, RowFailure};
pub use job::{
    Job,
    poll::PollOutcome,
    watch::{CompletionListener, JobEvent},
};
pub use results::{QueryResultsPage, fetch_query_results};
