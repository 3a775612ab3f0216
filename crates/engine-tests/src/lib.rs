#![allow(dead_code)]

pub mod paging;
pub mod polling;
pub mod utils;
