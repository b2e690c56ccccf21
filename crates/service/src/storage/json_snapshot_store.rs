use std::{marker::PhantomData, path::PathBuf, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;

use crate::errors::ServiceError;

/// Generic JSON file-backed document store.
///
/// Persists a single serializable document to a JSON file, re-reading the
/// whole file on every `load` and rewriting it on every `save`. Intended for
/// lightweight state where a database is overkill. There is no in-memory
/// cache and no locking: concurrent writers race on the whole-file
/// read-modify-write cycle and the last writer wins.
pub struct JsonSnapshotStore<T> {
    file_path: PathBuf,
    _doc: PhantomData<T>,
}

impl<T> JsonSnapshotStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Initialize the store from a path. Creates the file with an empty
    /// (default) document if missing.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.ok();
        }

        if fs::metadata(&file_path).await.is_err() {
            let empty = T::default();
            let data =
                serde_json::to_vec(&empty).map_err(|e| ServiceError::Storage(e.to_string()))?;
            fs::write(&file_path, data)
                .await
                .map_err(|e| ServiceError::Storage(e.to_string()))?;
        }

        Ok(Arc::new(Self { file_path, _doc: PhantomData }))
    }

    /// Read and deserialize the entire document from disk.
    pub async fn load(&self) -> Result<T, ServiceError> {
        let bytes = fs::read(&self.file_path)
            .await
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| ServiceError::Storage(e.to_string()))
    }

    /// Serialize and rewrite the entire document.
    pub async fn save(&self, doc: &T) -> Result<(), ServiceError> {
        let data = serde_json::to_vec(doc).map_err(|e| ServiceError::Storage(e.to_string()))?;
        fs::write(&self.file_path, data)
            .await
            .map_err(|e| ServiceError::Storage(e.to_string()))
    }
}
