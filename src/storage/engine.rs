use crate::common::Result;
use crate::types::{Document, Value};
use serde::{Deserialize, Serialize};

/// A fully qualified collection name, e.g. `ecommerce.sales`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: &str, collection: &str) -> Namespace {
        Self {
            database: database.to_string(),
            collection: collection.to_string(),
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// A document storage engine.
///
/// Documents are addressed by namespace and _id. Collections are created
/// implicitly by the first insert, and scans return documents in insertion
/// order.
pub trait Engine: Send {
    /// The iterator returned by scan()
    type ScanIterator<'a>: ScanIterator + 'a
    where
        Self: Sized + 'a;

    /// Creates a collection. Returns false if it already existed.
    fn create_collection(&mut self, ns: &Namespace) -> Result<bool>;

    /// Drops a collection. Returns true if it existed and false otherwise.
    fn drop_collection(&mut self, ns: &Namespace) -> Result<bool>;

    /// Lists the collection names of a database, in name order.
    fn list_collections(&mut self, database: &str) -> Result<Vec<String>>;

    /// Inserts a document and returns its _id. Documents without an _id are
    /// assigned a generated one. Errors if the _id is already taken.
    fn insert(&mut self, ns: &Namespace, document: Document) -> Result<Value>;

    /// Deletes the document with the given _id. Returns true if it existed.
    fn delete(&mut self, ns: &Namespace, id: &Value) -> Result<bool>;

    /// Creates an iterator over the collection's documents. A missing
    /// collection yields nothing.
    fn scan(&mut self, ns: &Namespace) -> Self::ScanIterator<'_>
    where
        Self: Sized;

    /// Returns database status.
    fn status(&mut self, database: &str) -> Result<Status>;
}

/// A scan iterator over a collection
pub trait ScanIterator: Iterator<Item = Result<Document>> {}
/// Blanket implementation of ScanIterator for any `I` satisfying the trait bound.
impl<I: Iterator<Item = Result<Document>>> ScanIterator for I {}

/// Database status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Status {
    /// The name of the storage engine.
    pub name: String,
    /// The database the status describes.
    pub database: String,
    /// The number of collections in the database.
    pub collections: u64,
    /// The number of documents across those collections.
    pub documents: u64,
}

impl From<Status> for Document {
    fn from(status: Status) -> Self {
        crate::doc! {
            "db" => status.database,
            "engine" => status.name,
            "collections" => status.collections as i64,
            "objects" => status.documents as i64,
        }
    }
}
