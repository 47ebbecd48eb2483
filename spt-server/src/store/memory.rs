//! In-memory backend for tests and throwaway instances

use spt_common::models::Store;
use spt_common::{Error, Result};
use std::sync::RwLock;

use super::RecordStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    document: RwLock<Store>,
}

impl MemoryStore {
    /// Start from an existing document
    pub fn with_store(store: Store) -> Self {
        Self {
            document: RwLock::new(store),
        }
    }
}

impl RecordStore for MemoryStore {
    fn load(&self) -> Result<Store> {
        self.document
            .read()
            .map(|store| store.clone())
            .map_err(|_| Error::Internal("memory store lock poisoned".to_string()))
    }

    fn save(&self, store: &Store) -> Result<()> {
        let mut document = self
            .document
            .write()
            .map_err(|_| Error::Internal("memory store lock poisoned".to_string()))?;
        *document = store.clone();
        Ok(())
    }
}
