use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::r#trait::{Record, Repository, StoreError};

/// In-memory store for tests/dev.
#[derive(Debug)]
pub struct InMemoryRepository<T> {
    inner: RwLock<BTreeMap<String, T>>,
}

impl<T> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl<T: Record> Repository<T> for InMemoryRepository<T> {
    async fn get(&self, key: &str) -> Result<Option<T>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(key).cloned())
    }

    async fn insert(&self, record: T) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let key = record.key();
        if map.contains_key(&key) {
            return Err(StoreError::Conflict(format!("{}/{key}", T::COLLECTION)));
        }
        map.insert(key, record);
        Ok(())
    }

    async fn update(&self, record: T) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        match map.get_mut(&record.key()) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("{}/{}", T::COLLECTION, record.key()))),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        Ok(map.remove(key).is_some())
    }

    async fn list(&self) -> Result<Vec<T>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().cloned().collect())
    }
}
