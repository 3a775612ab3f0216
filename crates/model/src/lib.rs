//! Wire and domain types shared by the job engine and the client.
//!
//! Field names follow the service's JSON contract (`jobComplete`, `pageToken`,
//! `startIndex`, `status.state`, `status.errorResult`) and must not be renamed.

pub mod core;
pub mod insert;
pub mod job;
pub mod pagination;
pub mod records;
pub mod schema;
