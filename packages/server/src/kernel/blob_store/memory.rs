//! In-memory blob store for testing and development.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::kernel::traits::{BaseBlobStore, ReadConsistency};

/// In-memory key-value store. Useful for testing and development; not
/// suitable for production as data is lost on restart.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.blobs.write().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.blobs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().unwrap().is_empty()
    }
}

#[async_trait]
impl BaseBlobStore for MemoryBlobStore {
    async fn get(
        &self,
        key: &str,
        _consistency: ReadConsistency,
    ) -> Result<Option<serde_json::Value>> {
        Ok(self.blobs.read().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        self.blobs.write().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.blobs.write().unwrap().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .blobs
            .read()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
