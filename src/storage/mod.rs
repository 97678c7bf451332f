//! Relational persistence (SQLite).

pub mod error;
pub mod sqlite;

#[cfg(test)]
mod tests;

pub use error::{StorageError, StorageResult};
pub use sqlite::SqliteStore;
