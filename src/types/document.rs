use crate::common::constants::{ID_FIELD, PATH_SEPARATOR};
use crate::common::Result;
use crate::types::Value;
use dyn_clone::DynClone;
use serde::Serialize;

/// A document iterator, as streamed between pipeline stages.
pub type Documents = Box<dyn DocumentIterator>;

/// A document iterator trait, which requires the iterator to be both
/// clonable and object-safe. Cloning is needed to rewind an iterator.
pub trait DocumentIterator: Iterator<Item = Result<Document>> + DynClone {}
impl<I: Iterator<Item = Result<Document>> + DynClone> DocumentIterator for I {}
dyn_clone::clone_trait_object!(DocumentIterator);

/// Builds a document from `key => value` pairs, converting values with `Value::from`.
#[macro_export]
macro_rules! doc {
    () => { $crate::types::Document::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut doc = $crate::types::Document::new();
        $(doc.insert($key, $crate::types::Value::from($value));)+
        doc
    }};
}

/// A document: an ordered set of uniquely named fields.
///
/// Field order is significant. It is preserved on insertion, printed as-is,
/// and participates in comparisons, e.g. `{ a: 1, b: 2 } != { b: 2, a: 1 }`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "Value")]
pub struct Document {
    fields: Vec<(String, Value)>,
}

impl Document {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Resolves a dotted path through embedded documents, e.g. "address.city".
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split(PATH_SEPARATOR);
        let mut current = self.get(parts.next()?)?;
        for part in parts {
            current = current.as_document()?.get(part)?;
        }
        Some(current)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the document's _id, if it has one.
    pub fn id(&self) -> Option<&Value> {
        self.get(ID_FIELD)
    }

    /// Sets a field. An existing field keeps its position, a new one is appended.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Sets a field in front of all others, moving it if already present.
    pub fn insert_first(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.remove(&key);
        self.fields.insert(0, (key, value));
    }

    /// Sets a dotted path, creating embedded documents along the way. A
    /// non-document value in the middle of the path is replaced.
    pub fn insert_path(&mut self, path: &str, value: Value) {
        match path.split_once(PATH_SEPARATOR) {
            None => self.insert(path, value),
            Some((head, rest)) => {
                let mut child = match self.get(head) {
                    Some(Value::Document(child)) => child.clone(),
                    _ => Document::new(),
                };
                child.insert_path(rest, value);
                self.insert(head, Value::Document(child));
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(index).1)
    }

    /// Removes a dotted path. Returns the removed value, if any.
    pub fn remove_path(&mut self, path: &str) -> Option<Value> {
        match path.split_once(PATH_SEPARATOR) {
            None => self.remove(path),
            Some((head, rest)) => self.fields.iter_mut().find(|(k, _)| k == head).and_then(
                |(_, value)| match value {
                    Value::Document(child) => child.remove_path(rest),
                    _ => None,
                },
            ),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter().map(|(k, v)| (k, v))
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Collects fields into a document. Later duplicates replace earlier ones.
impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (key, value) in iter {
            doc.insert(key, value);
        }
        doc
    }
}

/// Returns true if the key can be printed without quotes.
fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {
            chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.fields.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{ ")?;
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match is_bare_key(key) {
                true => write!(f, "{key}: {value}")?,
                false => write!(f, "'{}': {value}", key.escape_debug())?,
            }
        }
        f.write_str(" }")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_order() {
        let mut doc = doc! { "_id" => 1, "item" => "Apple", "price" => 10 };
        doc.insert("item", Value::from("Mango"));
        doc.insert("quantity", Value::from(3));
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["_id", "item", "price", "quantity"]);
        assert_eq!(doc.get("item"), Some(&Value::from("Mango")));
    }

    #[test]
    fn test_insert_first() {
        let mut doc = doc! { "item" => "Apple", "_id" => 1 };
        doc.insert_first("_id", Value::from(2));
        assert_eq!(doc.to_string(), "{ _id: 2, item: 'Apple' }");
    }

    #[test]
    fn test_paths() {
        let mut doc = doc! { "store" => doc! { "city" => "Lahore" } };
        assert_eq!(doc.get_path("store.city"), Some(&Value::from("Lahore")));
        assert_eq!(doc.get_path("store.zip"), None);
        assert_eq!(doc.get_path("store.city.name"), None);

        doc.insert_path("store.zip", Value::from(54000));
        doc.insert_path("meta.source", Value::from("pos"));
        assert_eq!(
            doc.to_string(),
            "{ store: { city: 'Lahore', zip: 54000 }, meta: { source: 'pos' } }"
        );

        assert_eq!(doc.remove_path("store.city"), Some(Value::from("Lahore")));
        assert_eq!(doc.remove_path("meta.source.x"), None);
        assert_eq!(doc.to_string(), "{ store: { zip: 54000 }, meta: { source: 'pos' } }");
    }

    #[test]
    fn test_display_quotes_keys() {
        let doc = doc! { "total sales" => 1, "$sum" => 2 };
        assert_eq!(doc.to_string(), "{ 'total sales': 1, $sum: 2 }");
        assert_eq!(Document::new().to_string(), "{}");
    }

    #[test]
    fn test_from_iter_replaces_duplicates() {
        let doc: Document = vec![
            ("a".to_string(), Value::from(1)),
            ("b".to_string(), Value::from(2)),
            ("a".to_string(), Value::from(3)),
        ]
        .into_iter()
        .collect();
        assert_eq!(doc, doc! { "a" => 3, "b" => 2 });
    }
}
