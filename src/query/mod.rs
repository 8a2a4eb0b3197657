//! Parses, plans and executes shell statements against document collections.
pub mod engine;
pub mod execution;
pub mod parser;
pub mod planner;
