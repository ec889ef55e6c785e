//! One named collection of raw BSON documents.

use crate::error::StoreError;
use crate::filter::Filter;
use bson::{RawDocument, RawDocumentBuf};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Documents keyed by their string `_id`, iterated in id order.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    name: String,
    docs: BTreeMap<String, RawDocumentBuf>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docs: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a new document. Returns its id.
    pub fn insert(&mut self, doc: RawDocumentBuf) -> Result<String, StoreError> {
        let id = self.id_of(&doc)?;
        if self.docs.contains_key(&id) {
            return Err(StoreError::DuplicateId {
                collection: self.name.clone(),
                id,
            });
        }
        self.docs.insert(id.clone(), doc);
        Ok(id)
    }

    /// Replace the stored document with the same `_id`.
    pub fn replace(&mut self, doc: RawDocumentBuf) -> Result<(), StoreError> {
        let id = self.id_of(&doc)?;
        match self.docs.get_mut(&id) {
            Some(slot) => {
                *slot = doc;
                Ok(())
            }
            None => Err(StoreError::NotFound {
                collection: self.name.clone(),
                id,
            }),
        }
    }

    pub fn get(&self, id: &str) -> Option<&RawDocument> {
        self.docs.get(id).map(|doc| &**doc)
    }

    /// First matching document in id order.
    pub fn find_one(&self, filter: &Filter) -> Option<&RawDocument> {
        self.iter().find(|doc| filter.matches(doc))
    }

    /// Every matching document in id order.
    pub fn find(&self, filter: &Filter) -> Vec<&RawDocument> {
        self.iter().filter(|doc| filter.matches(doc)).collect()
    }

    pub fn remove(&mut self, id: &str) -> Option<RawDocumentBuf> {
        self.docs.remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawDocument> {
        self.docs.values().map(|doc| &**doc)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.docs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// SHA-256 over the stored bytes in id order, lowercase hex.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for doc in self.docs.values() {
            hasher.update(doc.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    fn id_of(&self, doc: &RawDocument) -> Result<String, StoreError> {
        match doc.get_str("_id") {
            Ok(id) if !id.is_empty() => Ok(id.to_string()),
            _ => Err(StoreError::MissingId {
                collection: self.name.clone(),
            }),
        }
    }
}
