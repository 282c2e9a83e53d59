// Store module - durable single-slot persistence of the consent record

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ConsentRecord;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Slot name the record is persisted under, kept from the original widget's
/// localStorage key.
pub const STORAGE_KEY: &str = "cookie-consent";

/// One named slot in a durable key-value store. Implementations must make
/// `write` atomic from the reader's point of view: a concurrent `read`
/// observes either the previous value or the new one, never a partial blob.
#[async_trait]
pub trait ConsentStorage: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>>;
    async fn write(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

// Shared handles work as storage, so an embedder can keep one for itself.
#[async_trait]
impl<T: ConsentStorage + ?Sized> ConsentStorage for std::sync::Arc<T> {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        (**self).write(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key).await
    }
}

/// Wraps raw storage with decode + validation. Never hands out a half-valid
/// record: anything unparseable or schema-invalid is discarded and the slot
/// cleared.
pub struct ConsentStore<S> {
    storage: S,
}

impl<S: ConsentStorage> ConsentStore<S> {
    pub fn new(storage: S) -> Self {
        ConsentStore { storage }
    }

    /// Loads the persisted record, if any. Decode failures, validation
    /// failures, and read faults all read as "no consent"; the first two
    /// also clear the slot so stale data cannot resurface.
    pub async fn load(&self) -> Option<ConsentRecord> {
        let raw = match self.storage.read(STORAGE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored consent, treating as absent");
                return None;
            }
        };

        let record: ConsentRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "Stored consent is not decodable, clearing");
                self.clear_silently().await;
                return None;
            }
        };

        if let Err(e) = record.validate() {
            tracing::warn!(error = %e, "Stored consent failed validation, clearing");
            self.clear_silently().await;
            return None;
        }

        tracing::debug!(consent_id = %record.consent_id, "Loaded stored consent");
        Some(record)
    }

    /// Serializes the whole record and overwrites the slot.
    pub async fn save(&self, record: &ConsentRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        self.storage.write(STORAGE_KEY, &json).await?;
        tracing::info!(consent_id = %record.consent_id, "Persisted consent record");
        Ok(())
    }

    /// Removes the persisted record entirely.
    pub async fn clear(&self) -> Result<()> {
        self.storage.remove(STORAGE_KEY).await
    }

    async fn clear_silently(&self) {
        if let Err(e) = self.clear().await {
            tracing::warn!(error = %e, "Failed to clear invalid stored consent");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConsentError;
    use crate::models::SCHEMA_VERSION;

    struct FaultyStorage;

    #[async_trait]
    impl ConsentStorage for FaultyStorage {
        async fn read(&self, _key: &str) -> Result<Option<String>> {
            Err(ConsentError::Persistence("read fault".to_string()))
        }

        async fn write(&self, _key: &str, _value: &str) -> Result<()> {
            Err(ConsentError::Persistence("write fault".to_string()))
        }

        async fn remove(&self, _key: &str) -> Result<()> {
            Err(ConsentError::Persistence("remove fault".to_string()))
        }
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let store = ConsentStore::new(MemoryStorage::new());
        let record = ConsentRecord::accept_all();

        store.save(&record).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn test_empty_storage_loads_none() {
        let store = ConsentStore::new(MemoryStorage::new());
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_garbage_blob_is_cleared() {
        let storage = MemoryStorage::new();
        storage.write(STORAGE_KEY, "not json at all").await.unwrap();
        let store = ConsentStore::new(storage);

        assert!(store.load().await.is_none());
        assert!(store.storage.read(STORAGE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_old_schema_version_is_discarded_and_cleared() {
        let storage = MemoryStorage::new();
        let mut record = ConsentRecord::accept_all();
        record.version = "1.0".to_string();
        assert_ne!(record.version, SCHEMA_VERSION);
        storage
            .write(STORAGE_KEY, &serde_json::to_string(&record).unwrap())
            .await
            .unwrap();
        let store = ConsentStore::new(storage);

        assert!(store.load().await.is_none());
        assert!(store.storage.read(STORAGE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_fault_is_silent() {
        let store = ConsentStore::new(FaultyStorage);
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_record() {
        let store = ConsentStore::new(MemoryStorage::new());
        store.save(&ConsentRecord::reject_all()).await.unwrap();

        store.clear().await.unwrap();

        assert!(store.load().await.is_none());
    }
}
