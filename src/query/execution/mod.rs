//! Pipeline execution. Documents stream between stages as boxed iterators.
mod aggregate;
mod execute;
mod source;
mod transform;

pub use execute::{execute_pipeline, execute_plan, ExecutionResult};
