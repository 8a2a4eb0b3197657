use crate::common::Result;
use crate::storage::engine::{Engine, Namespace, Status};
use crate::types::{Document, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A serial transactional document engine. It wraps an underlying storage
/// engine for raw document storage.
///
/// It does not execute any transactions concurrently.
pub struct Simple<E: Engine> {
    pub engine: Arc<Mutex<E>>,
}

impl<E: Engine> Simple<E> {
    /// Creates a new simple engine with the given storage engine.
    pub fn new(engine: E) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    /// Begins a new read-write transaction.
    pub fn begin(&self) -> Result<Transaction<E>> {
        Transaction::begin(self.engine.clone())
    }
}

/// A simple transaction
pub struct Transaction<E: Engine> {
    /// The underlying storage engine, shared by all transactions
    engine: Arc<Mutex<E>>,
}

impl<E: Engine> Transaction<E> {
    /// Begins a new transaction in read-write mode. Transactions run
    /// serially, each call takes the engine lock for its duration.
    fn begin(engine: Arc<Mutex<E>>) -> Result<Self> {
        drop(engine.lock()?);
        Ok(Self { engine })
    }

    pub fn create_collection(&self, ns: &Namespace) -> Result<bool> {
        self.engine.lock()?.create_collection(ns)
    }

    pub fn drop_collection(&self, ns: &Namespace) -> Result<bool> {
        self.engine.lock()?.drop_collection(ns)
    }

    pub fn list_collections(&self, database: &str) -> Result<Vec<String>> {
        self.engine.lock()?.list_collections(database)
    }

    /// Inserts a document, returning its _id.
    pub fn insert(&self, ns: &Namespace, document: Document) -> Result<Value> {
        self.engine.lock()?.insert(ns, document)
    }

    /// Deletes the document with the given _id, if any.
    pub fn delete(&self, ns: &Namespace, id: &Value) -> Result<bool> {
        self.engine.lock()?.delete(ns, id)
    }

    pub fn status(&self, database: &str) -> Result<Status> {
        self.engine.lock()?.status(database)
    }

    /// Returns an iterator over the documents of the collection.
    pub fn scan(&self, ns: &Namespace) -> ScanIterator<E> {
        ScanIterator::new(Arc::clone(&self.engine), ns)
    }
}

/// An iterator over a collection's documents.
///
/// The engine is protected by a mutex, and holding the mutex for the duration
/// of the iteration would deadlock any write issued while a pipeline is still
/// pulling documents. Instead, we pull and buffer a batch of documents at a
/// time, and release the mutex in between.
pub struct ScanIterator<E: Engine> {
    /// The engine.
    engine: Arc<Mutex<E>>,
    /// A buffer of documents to emit.
    buffer: VecDeque<Document>,
    /// The collection this iterates over.
    ns: Namespace,
    /// The number of documents pulled from the engine so far.
    offset: usize,
    /// Set once the engine returned a short batch.
    done: bool,
}

/// Implement Clone manually. Deriving it requires Engine: Clone.
impl<E: Engine> Clone for ScanIterator<E> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            buffer: self.buffer.clone(),
            ns: self.ns.clone(),
            offset: self.offset,
            done: self.done,
        }
    }
}

impl<E: Engine> ScanIterator<E> {
    /// The number of documents to pull from the engine at a time.
    #[cfg(not(test))]
    const BUFFER_SIZE: usize = 1000;
    /// Pull only 2 documents in tests, to exercise this more often.
    #[cfg(test)]
    const BUFFER_SIZE: usize = 2;

    fn new(engine: Arc<Mutex<E>>, ns: &Namespace) -> Self {
        Self {
            engine,
            buffer: VecDeque::with_capacity(Self::BUFFER_SIZE),
            ns: ns.clone(),
            offset: 0,
            done: false,
        }
    }

    /// Fills the buffer with the next batch, if there are pending documents.
    fn fill_buffer(&mut self) -> Result<()> {
        if self.done {
            return Ok(());
        }
        let mut engine = self.engine.lock()?;
        for result in engine
            .scan(&self.ns)
            .skip(self.offset)
            .take(Self::BUFFER_SIZE)
        {
            self.buffer.push_back(result?);
        }
        self.offset += self.buffer.len();
        self.done = self.buffer.len() < Self::BUFFER_SIZE;
        Ok(())
    }
}

impl<E: Engine> Iterator for ScanIterator<E> {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() {
            if let Err(error) = self.fill_buffer() {
                return Some(Err(error));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
