use std::sync::Arc;

use async_trait::async_trait;

use crate::books::domain::BookCollection;
use crate::books::store::CollectionStore;
use crate::errors::ServiceError;
use crate::storage::json_snapshot_store::JsonSnapshotStore;

/// 文件存储：以单个 JSON 文件持久化整个图书集合
///
/// Every load re-reads the file and every save rewrites it wholesale; a
/// failed write between the two leaves the previous on-disk snapshot intact.
#[derive(Clone)]
pub struct FileCollectionStore {
    store: Arc<JsonSnapshotStore<BookCollection>>,
}

impl FileCollectionStore {
    /// 初始化存储，若文件不存在则写入空集合
    pub async fn new<P: Into<std::path::PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let store = JsonSnapshotStore::<BookCollection>::new(path).await?;
        Ok(Arc::new(Self { store }))
    }
}

#[async_trait]
impl CollectionStore for FileCollectionStore {
    async fn load(&self) -> Result<BookCollection, ServiceError> {
        self.store.load().await
    }

    async fn save(&self, collection: &BookCollection) -> Result<(), ServiceError> {
        self.store.save(collection).await
    }
}
