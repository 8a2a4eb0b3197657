use crate::common::constants::ID_FIELD;
use crate::common::{Error, Result};
use crate::storage::engine::{Engine, Namespace, Status};
use crate::types::{Document, Value};
use log::debug;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// An in-memory document storage engine. Nothing is persisted.
#[derive(Default)]
pub struct Memory {
    collections: BTreeMap<Namespace, Collection>,
}

/// A collection's documents in insertion order, plus the set of taken _ids.
#[derive(Default)]
struct Collection {
    documents: Vec<Document>,
    ids: HashSet<Value>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection_mut(&mut self, ns: &Namespace) -> &mut Collection {
        self.collections.entry(ns.clone()).or_insert_with(|| {
            debug!("Creating collection {ns}");
            Collection::default()
        })
    }
}

impl Engine for Memory {
    type ScanIterator<'a> = MemoryScan<'a>;

    fn create_collection(&mut self, ns: &Namespace) -> Result<bool> {
        if self.collections.contains_key(ns) {
            return Ok(false);
        }
        self.collection_mut(ns);
        Ok(true)
    }

    fn drop_collection(&mut self, ns: &Namespace) -> Result<bool> {
        Ok(self.collections.remove(ns).is_some())
    }

    fn list_collections(&mut self, database: &str) -> Result<Vec<String>> {
        Ok(self
            .collections
            .keys()
            .filter(|ns| ns.database == database)
            .map(|ns| ns.collection.clone())
            .collect())
    }

    fn insert(&mut self, ns: &Namespace, mut document: Document) -> Result<Value> {
        let id = match document.id() {
            Some(id) => id.clone(),
            None => {
                let id = Value::String(Uuid::new_v4().to_string());
                document.insert_first(ID_FIELD, id.clone());
                id
            }
        };
        let collection = self.collection_mut(ns);
        if !collection.ids.insert(id.clone()) {
            return Err(Error::DuplicateKey {
                collection: ns.to_string(),
                id: id.to_string(),
            });
        }
        collection.documents.push(document);
        Ok(id)
    }

    fn delete(&mut self, ns: &Namespace, id: &Value) -> Result<bool> {
        let Some(collection) = self.collections.get_mut(ns) else {
            return Ok(false);
        };
        if !collection.ids.remove(id) {
            return Ok(false);
        }
        collection.documents.retain(|doc| doc.id() != Some(id));
        Ok(true)
    }

    fn scan(&mut self, ns: &Namespace) -> Self::ScanIterator<'_> {
        MemoryScan {
            inner: self.collections.get(ns).map(|c| c.documents.iter()),
        }
    }

    fn status(&mut self, database: &str) -> Result<Status> {
        let (collections, documents) = self
            .collections
            .iter()
            .filter(|(ns, _)| ns.database == database)
            .fold((0, 0), |(c, d), (_, coll)| (c + 1, d + coll.documents.len() as u64));
        Ok(Status {
            name: "memory".to_string(),
            database: database.to_string(),
            collections,
            documents,
        })
    }
}

/// Iterates over a collection's documents, cloning each.
pub struct MemoryScan<'a> {
    inner: Option<std::slice::Iter<'a, Document>>,
}

impl<'a> Iterator for MemoryScan<'a> {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.as_mut()?.next().cloned().map(Ok)
    }
}
