pub mod options;
pub mod page;
