//! The authoritative content store the index is built from.
//!
//! The engine only ever reads from it: `find_by_id` to hydrate hits and
//! `find_by_module` to reindex.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

/// An authoritative content record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub id: u64,
    pub module: String,
    pub title: String,
    /// Plain-text body, markup already stripped
    pub text: String,
    pub created: DateTime<Utc>,
    pub url: String,
}

/// Read access to authoritative content records
pub trait ContentStore: Send + Sync {
    /// Look up a record by primary key
    fn find_by_id(&self, id: u64) -> Result<Option<Content>>;

    /// All records of a module
    fn find_by_module(&self, module: &str) -> Result<Vec<Content>>;
}

impl<T: ContentStore + ?Sized> ContentStore for Arc<T> {
    fn find_by_id(&self, id: u64) -> Result<Option<Content>> {
        (**self).find_by_id(id)
    }

    fn find_by_module(&self, module: &str) -> Result<Vec<Content>> {
        (**self).find_by_module(module)
    }
}

impl<T: ContentStore + ?Sized> ContentStore for &T {
    fn find_by_id(&self, id: u64) -> Result<Option<Content>> {
        (**self).find_by_id(id)
    }

    fn find_by_module(&self, module: &str) -> Result<Vec<Content>> {
        (**self).find_by_module(module)
    }
}

/// In-process content store keyed by id
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    records: RwLock<BTreeMap<u64, Content>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = Content>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Load a JSON array of [`Content`] records
    pub fn load_json(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::ContentStore(format!("{}: {}", path.display(), e)))?;
        let records: Vec<Content> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::ContentStore(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_records(records))
    }

    /// Insert or replace a record, returning the previous one
    pub fn insert(&self, content: Content) -> Option<Content> {
        self.records.write().insert(content.id, content)
    }

    pub fn remove(&self, id: u64) -> Option<Content> {
        self.records.write().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl ContentStore for MemoryContentStore {
    fn find_by_id(&self, id: u64) -> Result<Option<Content>> {
        Ok(self.records.read().get(&id).cloned())
    }

    fn find_by_module(&self, module: &str) -> Result<Vec<Content>> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|c| c.module == module)
            .cloned()
            .collect())
    }
}
