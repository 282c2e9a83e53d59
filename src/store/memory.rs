use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::ConsentStorage;
use crate::error::Result;

/// In-memory storage backend. Useful for tests and for embedders that keep
/// consent for the lifetime of the process only.
#[derive(Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConsentStorage for MemoryStorage {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.lock().unwrap().get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        self.slots
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.slots.lock().unwrap().remove(key);
        Ok(())
    }
}
