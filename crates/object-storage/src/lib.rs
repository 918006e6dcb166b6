//! Storage collaborator for stage artifacts.
//!
//! `task-harness` writes worker output under deterministic keys and hands
//! back a reference the next stage (or an operator, via the REST facade)
//! can resolve. Implementations target local disk for a single-host
//! deployment; a networked object store is a drop-in swap behind the same
//! trait.

use std::path::PathBuf;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum ObjectStorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid object reference: {0}")]
    InvalidRef(String),

    #[error("object not found: {0}")]
    NotFound(String),
}

/// Where task-harness and workers put and fetch stage artifacts.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload `content` under `key`, returning an opaque reference.
    async fn upload(&self, key: &str, content: &[u8]) -> Result<String, ObjectStorageError>;

    /// Download the content behind a reference returned by `upload`.
    async fn download(&self, object_ref: &str) -> Result<Vec<u8>, ObjectStorageError>;

    async fn delete(&self, object_ref: &str) -> Result<(), ObjectStorageError>;

    /// List references stored under a key prefix, e.g. a job's scratch
    /// namespace.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStorageError>;

    /// A URL an external client (the REST facade's caller) can use to fetch
    /// the object directly, if this backend supports one.
    async fn url_for(&self, _object_ref: &str) -> Result<Option<String>, ObjectStorageError> {
        Ok(None)
    }

    async fn exists(&self, object_ref: &str) -> Result<bool, ObjectStorageError>;
}

/// Filesystem-backed reference implementation. References are `file://`
/// URIs rooted at `base_path`.
pub struct LocalObjectStorage {
    base_path: PathBuf,
}

impl LocalObjectStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn path_for_key(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    fn path_from_ref(&self, object_ref: &str) -> Result<PathBuf, ObjectStorageError> {
        object_ref
            .strip_prefix("file://")
            .map(PathBuf::from)
            .ok_or_else(|| ObjectStorageError::InvalidRef(object_ref.to_string()))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn upload(&self, key: &str, content: &[u8]) -> Result<String, ObjectStorageError> {
        let path = self.path_for_key(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        Ok(format!("file://{}", path.display()))
    }

    async fn download(&self, object_ref: &str) -> Result<Vec<u8>, ObjectStorageError> {
        let path = self.path_from_ref(object_ref)?;
        if !path.exists() {
            return Err(ObjectStorageError::NotFound(object_ref.to_string()));
        }
        Ok(tokio::fs::read(path).await?)
    }

    async fn delete(&self, object_ref: &str) -> Result<(), ObjectStorageError> {
        let path = self.path_from_ref(object_ref)?;
        if path.exists() {
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStorageError> {
        let dir = self.path_for_key(prefix);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = tokio::fs::read_dir(&dir).await?;
        let mut refs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            refs.push(format!("file://{}", entry.path().display()));
        }
        refs.sort();
        Ok(refs)
    }

    async fn exists(&self, object_ref: &str) -> Result<bool, ObjectStorageError> {
        let path = self.path_from_ref(object_ref)?;
        Ok(path.exists())
    }
}

#[cfg(test)]
pub struct InMemoryObjectStorage {
    objects: std::sync::Arc<tokio::sync::RwLock<std::collections::HashMap<String, Vec<u8>>>>,
}

#[cfg(test)]
impl InMemoryObjectStorage {
    pub fn new() -> Self {
        Self {
            objects: std::sync::Arc::new(tokio::sync::RwLock::new(std::collections::HashMap::new())),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn upload(&self, key: &str, content: &[u8]) -> Result<String, ObjectStorageError> {
        let object_ref = format!("memory://{key}");
        self.objects.write().await.insert(object_ref.clone(), content.to_vec());
        Ok(object_ref)
    }

    async fn download(&self, object_ref: &str) -> Result<Vec<u8>, ObjectStorageError> {
        self.objects
            .read()
            .await
            .get(object_ref)
            .cloned()
            .ok_or_else(|| ObjectStorageError::NotFound(object_ref.to_string()))
    }

    async fn delete(&self, object_ref: &str) -> Result<(), ObjectStorageError> {
        self.objects.write().await.remove(object_ref);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStorageError> {
        let mut refs: Vec<String> = self
            .objects
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(&format!("memory://{prefix}")))
            .cloned()
            .collect();
        refs.sort();
        Ok(refs)
    }

    async fn exists(&self, object_ref: &str) -> Result<bool, ObjectStorageError> {
        Ok(self.objects.read().await.contains_key(object_ref))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn local_store_roundtrips_through_a_file_uri() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalObjectStorage::new(temp_dir.path());

        let object_ref = store.upload("jobs/1a2b3c4d/0_fetch/out.bin", b"hello").await.unwrap();
        assert!(object_ref.starts_with("file://"));
        assert!(store.exists(&object_ref).await.unwrap());
        assert_eq!(store.download(&object_ref).await.unwrap(), b"hello");

        store.delete(&object_ref).await.unwrap();
        assert!(!store.exists(&object_ref).await.unwrap());
    }

    #[tokio::test]
    async fn local_store_lists_a_job_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalObjectStorage::new(temp_dir.path());
        store.upload("jobs/1a2b3c4d/0_fetch/a.bin", b"a").await.unwrap();
        store.upload("jobs/1a2b3c4d/0_fetch/b.bin", b"b").await.unwrap();

        let refs = store.list("jobs/1a2b3c4d/0_fetch").await.unwrap();
        assert_eq!(refs.len(), 2);
    }

    #[tokio::test]
    async fn missing_reference_is_not_found() {
        let store = InMemoryObjectStorage::new();
        let result = store.download("memory://nope").await;
        assert!(matches!(result, Err(ObjectStorageError::NotFound(_))));
    }
}
