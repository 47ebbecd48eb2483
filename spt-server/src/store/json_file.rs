//! File-backed store document
//!
//! The document is pretty-printed JSON. Writes go to a sibling temp file that
//! is then renamed over the target, so a concurrent reader or a crash mid-write
//! never observes a truncated document.

use spt_common::models::Store;
use spt_common::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::RecordStore;

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open the document at `path`, creating an empty one when missing
    ///
    /// Parent directories are created as needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { path: path.into() };

        if let Some(parent) = store.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        if !store.path.exists() {
            store.save(&Store::default())?;
            info!("Initialized empty store at {}", store.path.display());
        } else {
            debug!("Using existing store at {}", store.path.display());
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp_write");
        self.path.with_file_name(name)
    }
}

impl RecordStore for JsonFileStore {
    fn load(&self) -> Result<Store> {
        let content = fs::read_to_string(&self.path)?;
        let store: Store = serde_json::from_str(&content)?;
        Ok(store)
    }

    fn save(&self, store: &Store) -> Result<()> {
        let content = serde_json::to_string_pretty(store)?;
        let tmp_path = self.temp_path();
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spt_common::models::{EventRecord, ScheduledEvent};

    fn sample_store() -> Store {
        let mut store = Store::default();
        store.events.push(EventRecord::Scheduled(ScheduledEvent {
            event_id: "EVT001".to_string(),
            name: "Monthly Contest".to_string(),
            kind: "Coding Competition".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2024, 10, 25).unwrap(),
            status: "registered".to_string(),
            participants: 1500,
            duration: "3 hours".to_string(),
        }));
        store
    }

    #[test]
    fn open_creates_missing_document_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/db.json");

        let store = JsonFileStore::open(&path).unwrap();
        assert!(path.exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded, Store::default());

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        for key in [
            "students",
            "productivity",
            "coding_progress",
            "courses",
            "mobile_usage",
            "events",
            "activities",
        ] {
            assert_eq!(raw[key], serde_json::json!([]), "{} should start empty", key);
        }
    }

    #[test]
    fn open_keeps_existing_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");

        JsonFileStore::open(&path).unwrap().save(&sample_store()).unwrap();
        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.load().unwrap().events.len(), 1);
    }

    /// Every record kind: generated students with all three coding profile
    /// shapes, scheduled and tracked events, activities
    fn populated_store() -> Store {
        use crate::generator::{ProfileGenerator, ProfileOverrides, RandomProfileGenerator};
        use spt_common::identity::Identity;
        use spt_common::models::{Activity, TrackedEvent};

        let generator = RandomProfileGenerator::with_seed(42);
        let mut store = sample_store();
        for email in ["alice@example.com", "bob@example.com"] {
            let identity = Identity::parse(email).unwrap();
            store
                .insert_profile(generator.generate(&identity, &ProfileOverrides::default()))
                .unwrap();
        }
        store.events.push(EventRecord::Tracked(TrackedEvent {
            id: uuid::Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            email: "alice@example.com".to_string(),
            kind: "focus_start".to_string(),
            payload: serde_json::json!({ "minutes": 25, "tags": ["deep", "math"], "ratio": 0.75 }),
        }));
        store.activities.push(Activity {
            id: uuid::Uuid::new_v4(),
            email: "bob@example.com".to_string(),
            activity: "Read chapter 4".to_string(),
            duration: 45,
            category: "study".to_string(),
            timestamp: chrono::Utc::now(),
        });
        store
    }

    #[test]
    fn save_load_save_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let store = JsonFileStore::open(&path).unwrap();
        let populated = populated_store();
        assert_eq!(populated.coding_progress.len(), 6);

        store.save(&populated).unwrap();
        let first = fs::read(&path).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.students.len(), 2);
        assert_eq!(reloaded.events.len(), 2);
        store.save(&reloaded).unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let store = JsonFileStore::open(&path).unwrap();

        store.save(&sample_store()).unwrap();
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn older_document_without_activities_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(&path, r#"{ "students": [], "events": [] }"#).unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        let loaded = store.load().unwrap();
        assert!(loaded.activities.is_empty());
        assert!(loaded.mobile_usage.is_empty());
    }

    #[test]
    fn corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.load().is_err());
    }
}
