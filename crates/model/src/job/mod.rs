pub mod metadata;
pub mod status;
