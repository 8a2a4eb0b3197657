use crate::common::Result;
use crate::query::engine::{Catalog, Session};
use crate::storage::simple::{self, Simple};
use crate::storage::{self, Namespace, Status};
use crate::types::{Document, Documents, Value};
use log::info;

/// A query engine using local storage. This is a single-transaction,
/// basic execution engine without concurrency support.
pub struct Local<E: storage::Engine + 'static> {
    /// The local non-concurrent storage engine.
    pub simple: Simple<E>,
}

impl<'a, E: storage::Engine + 'static> Local<E> {
    /// Creates a new local query engine using the given storage engine.
    pub fn new(engine: E) -> Self {
        Self {
            simple: Simple::new(engine),
        }
    }

    /// Creates a session which executes shell statements, starting in the
    /// given database. Does not outlive the engine.
    pub fn session(&'a self, database: &str) -> Result<Session<'a, Self>> {
        Session::new(self, database)
    }
}

impl<'a, E: storage::Engine + 'static> super::Engine<'a> for Local<E> {
    type Transaction = Transaction<E>;

    fn begin(&'a self) -> Result<Self::Transaction> {
        Ok(Transaction::new(self.simple.begin()?))
    }
}

/// A query transaction, wrapping a simple transaction.
pub struct Transaction<E: storage::Engine + 'static> {
    txn: simple::Transaction<E>,
}

impl<E: storage::Engine + 'static> Transaction<E> {
    fn new(txn: simple::Transaction<E>) -> Self {
        Self { txn }
    }
}

/// See `[super::Transaction]` for method documentation.
impl<E: storage::Engine + 'static> super::Transaction for Transaction<E> {
    fn insert(&self, ns: &Namespace, documents: Vec<Document>) -> Result<Vec<Value>> {
        documents.into_iter().map(|doc| self.txn.insert(ns, doc)).collect()
    }

    fn delete(&self, ns: &Namespace, ids: &[Value]) -> Result<u64> {
        let mut count = 0;
        for id in ids {
            if self.txn.delete(ns, id)? {
                count += 1;
            }
        }
        Ok(count)
    }

    fn scan(&self, ns: &Namespace) -> Result<Documents> {
        Ok(Box::new(self.txn.scan(ns)))
    }
}

/// See `[super::Catalog]` for method documentation.
impl<E: storage::Engine + 'static> Catalog for Transaction<E> {
    fn create_collection(&self, ns: &Namespace) -> Result<bool> {
        let created = self.txn.create_collection(ns)?;
        if created {
            info!("Created collection {ns}");
        }
        Ok(created)
    }

    fn drop_collection(&self, ns: &Namespace) -> Result<bool> {
        let existed = self.txn.drop_collection(ns)?;
        if existed {
            info!("Dropped collection {ns}");
        }
        Ok(existed)
    }

    fn list_collections(&self, database: &str) -> Result<Vec<String>> {
        self.txn.list_collections(database)
    }

    fn status(&self, database: &str) -> Result<Status> {
        self.txn.status(database)
    }
}
