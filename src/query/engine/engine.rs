use crate::common::Result;
use crate::storage::{Namespace, Status};
use crate::types::{Document, Documents, Value};

/// A document query engine.
///
/// Executes statements against the collections of its underlying store.
pub trait Engine<'a>: Sized {
    /// The engine's transaction type. It provides access to documents and
    /// collections, and does not outlive the engine.
    type Transaction: Transaction + Catalog + 'a;

    /// Begins a read-write transaction.
    fn begin(&'a self) -> Result<Self::Transaction>;
}

/// A document transaction.
///
/// Currently, all statements of a session run in a single transaction.
pub trait Transaction {
    /// Inserts documents in order and returns their _ids. Stops at the first
    /// failure; documents inserted before it remain.
    fn insert(&self, ns: &Namespace, documents: Vec<Document>) -> Result<Vec<Value>>;
    /// Deletes documents by _id, returning how many existed.
    fn delete(&self, ns: &Namespace, ids: &[Value]) -> Result<u64>;
    /// Scans a collection's documents in insertion order.
    fn scan(&self, ns: &Namespace) -> Result<Documents>;
}

/// Manages collections.
pub trait Catalog {
    /// Creates a collection. Returns false if it already exists.
    fn create_collection(&self, ns: &Namespace) -> Result<bool>;
    /// Drops a collection. Returns true if it existed.
    fn drop_collection(&self, ns: &Namespace) -> Result<bool>;
    /// Lists a database's collection names.
    fn list_collections(&self, database: &str) -> Result<Vec<String>>;
    /// Returns a database's status.
    fn status(&self, database: &str) -> Result<Status>;
}
