//! In-memory object store

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{ObjectStore, StorageError, StoredObject};

/// Object store kept in a process-local map
///
/// Contents are lost on restart. Bodies are `Bytes`, so reads share the
/// stored buffer instead of copying it.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        Ok(self.objects.read().get(key).cloned())
    }

    async fn put(&self, key: &str, object: StoredObject) -> Result<(), StorageError> {
        self.objects.write().insert(key.to_string(), object);
        Ok(())
    }
}
