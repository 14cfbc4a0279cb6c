use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// A storable entity.
///
/// `COLLECTION` names the logical table; `key` must be unique within it and
/// is also the listing order.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    const COLLECTION: &'static str;

    fn key(&self) -> String;
}

/// Storage errors.
///
/// - **Conflict**: insert of a key that already exists
/// - **NotFound**: update of a key that does not exist
/// - **Backend**: the database (or a poisoned lock) failed
/// - **Serialization**: a record could not be encoded or decoded
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists: {0}")]
    Conflict(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                StoreError::Conflict(db_err.message().to_string())
            }
            sqlx::Error::RowNotFound => StoreError::NotFound("row".to_string()),
            sqlx::Error::ColumnDecode { source, .. } | sqlx::Error::Decode(source) => {
                StoreError::Serialization(source.to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Keyed record storage for one collection.
#[async_trait]
pub trait Repository<T: Record>: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<T>, StoreError>;

    /// Fails with `Conflict` when the key is taken.
    async fn insert(&self, record: T) -> Result<(), StoreError>;

    /// Fails with `NotFound` when the key is absent.
    async fn update(&self, record: T) -> Result<(), StoreError>;

    /// Returns whether a record was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// All records, ordered by key.
    async fn list(&self) -> Result<Vec<T>, StoreError>;
}

#[async_trait]
impl<T, S> Repository<T> for Arc<S>
where
    T: Record,
    S: Repository<T> + ?Sized,
{
    async fn get(&self, key: &str) -> Result<Option<T>, StoreError> {
        (**self).get(key).await
    }

    async fn insert(&self, record: T) -> Result<(), StoreError> {
        (**self).insert(record).await
    }

    async fn update(&self, record: T) -> Result<(), StoreError> {
        (**self).update(record).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        (**self).delete(key).await
    }

    async fn list(&self) -> Result<Vec<T>, StoreError> {
        (**self).list().await
    }
}
