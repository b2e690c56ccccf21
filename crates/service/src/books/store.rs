use async_trait::async_trait;

use crate::books::domain::BookCollection;
use crate::errors::ServiceError;

/// Trait abstraction for the persisted collection snapshot.
/// Implementations can be file-backed or in-memory (tests).
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Read the entire collection document.
    async fn load(&self) -> Result<BookCollection, ServiceError>;
    /// Overwrite the entire collection document.
    async fn save(&self, collection: &BookCollection) -> Result<(), ServiceError>;
}
