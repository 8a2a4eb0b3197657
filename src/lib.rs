#![crate_type = "lib"]
#![crate_name = "rustydoc"]

pub mod common;
pub mod config;
pub mod query;
pub mod shell;
pub mod storage;
pub mod types;
