// State management module
// Handles SQLite persistence and file system locations

pub mod db;
pub mod models;
pub mod queries;
pub mod storage;

pub use db::{init_db, init_memory_db, DbConnection, DbError, DbResult, MigrationOptions};
pub use models::{Profile, Record, RecordDraft, RecordEdit, ValidationError};
