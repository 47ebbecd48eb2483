//! Record store
//!
//! The whole store is one document: every request loads it wholesale and every
//! mutation writes it back wholesale. [`StoreHandle`] serializes writers so a
//! load → mutate → save cycle never interleaves with another one.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use spt_common::models::Store;
use spt_common::{Error, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Blocking persistence backend for the store document
pub trait RecordStore: Send + Sync + 'static {
    /// Read the whole document
    fn load(&self) -> Result<Store>;

    /// Replace the whole document
    fn save(&self, store: &Store) -> Result<()>;
}

/// Shared async access to a [`RecordStore`]
#[derive(Clone)]
pub struct StoreHandle {
    backend: Arc<dyn RecordStore>,
    writer: Arc<Mutex<()>>,
}

impl StoreHandle {
    pub fn new(backend: Arc<dyn RecordStore>) -> Self {
        Self {
            backend,
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// Snapshot of the current document
    ///
    /// Takes no lock; the backend guarantees a reader sees either the old or
    /// the new document, never a partial one.
    pub async fn read(&self) -> Result<Store> {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || backend.load())
            .await
            .map_err(|e| Error::Internal(format!("store read task failed: {}", e)))?
    }

    /// Load, apply `mutate`, save, all under the store-wide writer lock
    ///
    /// Nothing is written when `mutate` fails. The lock guard lives in the
    /// blocking task, so dropping the returned future before it completes
    /// does not release the lock until the save has finished.
    pub async fn transaction<T, F>(&self, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut Store) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let guard = Arc::clone(&self.writer).lock_owned().await;
        let backend = Arc::clone(&self.backend);

        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let mut store = backend.load()?;
            let output = mutate(&mut store)?;
            backend.save(&store)?;
            debug!(students = store.students.len(), "Store transaction committed");
            Ok(output)
        })
        .await
        .map_err(|e| Error::Internal(format!("store write task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spt_common::models::Activity;

    fn activity(name: &str) -> Activity {
        Activity {
            id: uuid::Uuid::new_v4(),
            email: "user@example.com".to_string(),
            activity: name.to_string(),
            duration: 10,
            category: "study".to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn failed_transaction_leaves_document_untouched() {
        let handle = StoreHandle::new(Arc::new(MemoryStore::default()));

        let result: Result<()> = handle
            .transaction(|store| {
                store.activities.clear();
                store.students.clear();
                Err(Error::InvalidInput("rejected".to_string()))
            })
            .await;
        assert!(result.is_err());

        handle
            .transaction(|store| {
                store.events.clear();
                Ok(())
            })
            .await
            .unwrap();
        assert!(handle.read().await.unwrap().students.is_empty());
    }

    #[tokio::test]
    async fn concurrent_transactions_do_not_lose_updates() {
        let handle = StoreHandle::new(Arc::new(MemoryStore::default()));
        let mut tasks = Vec::new();
        for i in 0..16u32 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle
                    .transaction(move |store| {
                        store.activities.push(activity(&format!("reading {}", i)));
                        Ok(())
                    })
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(handle.read().await.unwrap().activities.len(), 16);
    }

    #[tokio::test]
    async fn cancelled_transaction_keeps_writer_lock_until_saved() {
        use std::time::Duration;

        let handle = StoreHandle::new(Arc::new(MemoryStore::default()));

        // Caller gives up while the blocking write is still in flight
        let slow = handle.transaction(|store| {
            std::thread::sleep(Duration::from_millis(300));
            store.activities.push(activity("slow"));
            Ok(())
        });
        let outcome = tokio::time::timeout(Duration::from_millis(50), slow).await;
        assert!(outcome.is_err());

        handle
            .transaction(|store| {
                store.activities.push(activity("fast"));
                Ok(())
            })
            .await
            .unwrap();

        let activities = handle.read().await.unwrap().activities;
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0].activity, "slow");
        assert_eq!(activities[1].activity, "fast");
    }
}
