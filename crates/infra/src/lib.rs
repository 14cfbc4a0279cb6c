//! Infrastructure layer: record storage (in-memory and Postgres).

pub mod records;
pub mod store;

pub use store::{InMemoryRepository, PostgresRepository, Record, Repository, StoreError};
