//! Append-only document store addressed by vector id.
//!
//! Position in the store is the vector id in the index built from the same
//! batch, so documents are never reordered or removed.
use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

use wayfind_core::types::Document;
use wayfind_core::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    documents: Vec<Document>,
    positions: HashMap<String, usize>,
}

impl DocumentStore {
    pub fn new() -> Self { Self::default() }

    pub fn from_documents(documents: Vec<Document>) -> Result<Self> {
        let mut store = Self::new();
        store.append_all(documents)?;
        Ok(store)
    }

    /// Append in order and return the assigned vector ids. A duplicate id
    /// (against the store or within the batch) rejects the whole batch.
    pub fn append_all(&mut self, documents: Vec<Document>) -> Result<Range<usize>> {
        let start = self.documents.len();
        let mut incoming: HashMap<&str, usize> = HashMap::with_capacity(documents.len());
        for (offset, doc) in documents.iter().enumerate() {
            if self.positions.contains_key(&doc.id) || incoming.insert(doc.id.as_str(), start + offset).is_some() {
                return Err(Error::Data(format!("duplicate document id '{}'", doc.id)));
            }
        }
        drop(incoming);
        for (offset, doc) in documents.into_iter().enumerate() {
            self.positions.insert(doc.id.clone(), start + offset);
            self.documents.push(doc);
        }
        Ok(start..self.documents.len())
    }

    pub fn resolve(&self, id: usize) -> Result<&Document> {
        self.documents.get(id).ok_or(Error::OutOfRange { id, len: self.documents.len() })
    }

    /// Vector id of the document with this document id.
    pub fn position_of(&self, doc_id: &str) -> Option<usize> {
        self.positions.get(doc_id).copied()
    }

    pub fn len(&self) -> usize { self.documents.len() }
    pub fn is_empty(&self) -> bool { self.documents.is_empty() }
    pub fn iter(&self) -> std::slice::Iter<'_, Document> { self.documents.iter() }

    /// Distinct categories, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.category.as_str()).collect::<BTreeSet<_>>().into_iter().map(str::to_string).collect()
    }
}

impl<'a> IntoIterator for &'a DocumentStore {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, category: &str) -> Document {
        Document::new(id, category, format!("text of {id}"))
    }

    #[test]
    fn append_assigns_consecutive_ids() {
        let mut store = DocumentStore::new();
        assert_eq!(store.append_all(vec![doc("a", "x"), doc("b", "y")]).unwrap(), 0..2);
        assert_eq!(store.append_all(vec![doc("c", "x")]).unwrap(), 2..3);
        assert_eq!(store.resolve(2).unwrap().id, "c");
        assert_eq!(store.position_of("b"), Some(1));
        assert_eq!(store.categories(), ["x", "y"]);
    }

    #[test]
    fn duplicates_leave_store_unchanged() {
        let mut store = DocumentStore::from_documents(vec![doc("a", "x")]).unwrap();
        assert!(matches!(store.append_all(vec![doc("b", "x"), doc("a", "x")]), Err(Error::Data(_))));
        assert!(matches!(store.append_all(vec![doc("c", "x"), doc("c", "x")]), Err(Error::Data(_))));
        assert_eq!(store.len(), 1);
        assert_eq!(store.position_of("b"), None);
    }

    #[test]
    fn resolve_out_of_range() {
        let store = DocumentStore::from_documents(vec![doc("a", "x")]).unwrap();
        assert!(matches!(store.resolve(1), Err(Error::OutOfRange { id: 1, len: 1 })));
        assert!(DocumentStore::new().categories().is_empty());
    }
}
