pub mod engine;
pub mod memory;
pub mod simple;

pub use engine::{Engine, Namespace, ScanIterator, Status};
pub use memory::Memory;
