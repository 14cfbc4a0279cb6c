//! Document-style record storage.
//!
//! Every entity is stored whole, as JSON, under a string key inside a named
//! collection. Services load, mutate and write back complete records.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryRepository;
pub use postgres::PostgresRepository;
pub use r#trait::{Record, Repository, StoreError};
