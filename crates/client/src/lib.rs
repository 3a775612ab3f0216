//! High-level entry point: submit query jobs, read their results page by
//! page or all at once, and stream rows into tables.

pub mod client;
pub mod config;
pub mod pager;
pub mod query;

pub use client::{Client, QueryOutcome};
pub use config::{ClientConfig, ConfigError};
pub use pager::{Pager, PagerLimits};
pub use query::{QueryJobRequest, QueryRequest};
