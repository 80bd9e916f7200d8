//! Record Store: the durable local copy of regional records.
//!
//! Implementations serialize their mutating calls internally, so a store can
//! be shared behind an `Arc` between the sync coordinator and blocking
//! workers. Every mutation is durable before it returns.

mod memory;
mod sqlite;

pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;

use thiserror::Error;

use crate::state::{DbError, Record};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),
    #[error("Record {0} already exists")]
    Conflict(i64),
    #[error("Record {0} not found")]
    NotFound(i64),
    #[error("Record store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait RecordStore: Send + Sync {
    /// Persist a record. An id of 0 gets a fresh id; the stored id is returned.
    fn insert(&self, record: &Record) -> StoreResult<i64>;

    /// Insert or overwrite each record by id. All-or-nothing per call; for
    /// duplicate ids within the batch the last one wins.
    fn insert_all(&self, records: &[Record]) -> StoreResult<()>;

    /// Replace the stored record with the same id. Province fields are kept
    /// from the stored row. Fails with `NotFound` when the id is unknown.
    fn update(&self, record: &Record) -> StoreResult<()>;

    /// Remove the record with the same id; absent ids are a no-op.
    fn delete(&self, record: &Record) -> StoreResult<()>;

    fn get_by_id(&self, id: i64) -> StoreResult<Option<Record>>;

    /// All records ordered by id
    fn get_all(&self) -> StoreResult<Vec<Record>>;

    fn count(&self) -> StoreResult<i64>;
}
