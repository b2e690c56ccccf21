#![cfg(test)]
//! In-memory `CollectionStore` fake for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::books::domain::BookCollection;
use crate::books::store::CollectionStore;
use crate::errors::ServiceError;

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<BookCollection>,
}

impl MemoryStore {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn seed(&self, collection: BookCollection) {
        *self.inner.write().await = collection;
    }
}

#[async_trait]
impl CollectionStore for MemoryStore {
    async fn load(&self) -> Result<BookCollection, ServiceError> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, collection: &BookCollection) -> Result<(), ServiceError> {
        *self.inner.write().await = collection.clone();
        Ok(())
    }
}
