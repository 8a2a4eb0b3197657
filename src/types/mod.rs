mod document;
mod value;

pub use document::{Document, DocumentIterator, Documents};
pub use value::Value;
