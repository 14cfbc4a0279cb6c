//! Postgres-backed record storage.
//!
//! All collections share one table:
//!
//! | column | type | notes |
//! |---|---|---|
//! | `collection` | `TEXT` | part of the primary key |
//! | `id` | `TEXT` | record key, part of the primary key |
//! | `body` | `JSONB` | the serialized record |
//! | `updated_at` | `TIMESTAMPTZ` | last write |
//!
//! A unique violation (`23505`) on insert maps to `StoreError::Conflict`.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::instrument;

use super::r#trait::{Record, Repository, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS retail_records (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (collection, id)
)
"#;

/// Open a connection pool.
pub async fn connect(database_url: &str) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Create the records table when missing.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query(SCHEMA).execute(pool).await?;
    Ok(())
}

/// One collection inside `retail_records`.
pub struct PostgresRepository<T> {
    pool: Arc<PgPool>,
    _record: PhantomData<fn() -> T>,
}

impl<T> PostgresRepository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
            _record: PhantomData,
        }
    }
}

impl<T> Clone for PostgresRepository<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Record> Repository<T> for PostgresRepository<T> {
    #[instrument(skip(self), fields(collection = T::COLLECTION), err)]
    async fn get(&self, key: &str) -> Result<Option<T>, StoreError> {
        let row: Option<(Json<T>,)> =
            sqlx::query_as("SELECT body FROM retail_records WHERE collection = $1 AND id = $2")
                .bind(T::COLLECTION)
                .bind(key)
                .fetch_optional(&*self.pool)
                .await?;
        Ok(row.map(|(Json(record),)| record))
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION), err)]
    async fn insert(&self, record: T) -> Result<(), StoreError> {
        let key = record.key();
        let result = sqlx::query(
            "INSERT INTO retail_records (collection, id, body, updated_at) VALUES ($1, $2, $3, NOW())",
        )
        .bind(T::COLLECTION)
        .bind(&key)
        .bind(Json(&record))
        .execute(&*self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => match StoreError::from(err) {
                StoreError::Conflict(_) => Err(StoreError::Conflict(format!("{}/{key}", T::COLLECTION))),
                other => Err(other),
            },
        }
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION), err)]
    async fn update(&self, record: T) -> Result<(), StoreError> {
        let key = record.key();
        let result = sqlx::query(
            "UPDATE retail_records SET body = $3, updated_at = NOW() WHERE collection = $1 AND id = $2",
        )
        .bind(T::COLLECTION)
        .bind(&key)
        .bind(Json(&record))
        .execute(&*self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("{}/{key}", T::COLLECTION)));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(collection = T::COLLECTION), err)]
    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM retail_records WHERE collection = $1 AND id = $2")
            .bind(T::COLLECTION)
            .bind(key)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(collection = T::COLLECTION), err)]
    async fn list(&self) -> Result<Vec<T>, StoreError> {
        let rows: Vec<(Json<T>,)> =
            sqlx::query_as("SELECT body FROM retail_records WHERE collection = $1 ORDER BY id ASC")
                .bind(T::COLLECTION)
                .fetch_all(&*self.pool)
                .await?;
        Ok(rows.into_iter().map(|(Json(record),)| record).collect())
    }
}
