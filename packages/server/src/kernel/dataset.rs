//! Blob-backed implementation of the parts dataset collaborator.
//!
//! The table UI and Excel import/export own the dataset's shape; this side
//! only reads and replaces the current snapshot at a well-known key.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::domains::eol::models::PartRecord;

use super::traits::{BaseBlobStore, BaseDataset, ReadConsistency};

const DATASET_KEY: &str = "eol-dataset/current";

pub struct BlobDataset {
    blobs: Arc<dyn BaseBlobStore>,
}

impl BlobDataset {
    pub fn new(blobs: Arc<dyn BaseBlobStore>) -> Self {
        Self { blobs }
    }
}

#[async_trait]
impl BaseDataset for BlobDataset {
    async fn read(&self) -> Result<Vec<PartRecord>> {
        let value = self
            .blobs
            .get(DATASET_KEY, ReadConsistency::Strong)
            .await?;
        match value {
            Some(value) => serde_json::from_value(value).context("dataset blob is malformed"),
            None => Ok(Vec::new()),
        }
    }

    async fn replace(&self, parts: Vec<PartRecord>) -> Result<()> {
        let value = serde_json::to_value(parts).context("dataset serialization failed")?;
        self.blobs.set(DATASET_KEY, value).await
    }
}
