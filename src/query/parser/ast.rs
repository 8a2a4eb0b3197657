use crate::types::Value;

/// A shell statement. Literal arguments are parsed straight into values,
/// since the literal syntax maps one-to-one onto documents and arrays.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    /// use("name") or use name: switches the current database.
    Use(String),
    /// show collections: lists the collections of the current database.
    ShowCollections,
    /// db.method(args), e.g. db.getCollectionNames() or db.stats().
    Database(Call),
    /// db.collection.method(args), e.g. db.sales.aggregate([...]), followed
    /// by any chained cursor calls, e.g. .sort({ price: -1 }).limit(2).
    Collection {
        collection: String,
        call: Call,
        cursor: Vec<Call>,
    },
}

/// A method call with literal arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub method: String,
    pub args: Vec<Value>,
}

impl Call {
    pub fn new(method: &str, args: Vec<Value>) -> Self {
        Self {
            method: method.to_string(),
            args,
        }
    }
}
