//! Offline-first client for the West Java open data "average length of
//! schooling" dataset: local SQLite copy, remote sync and observable state.
//!
//! The Tauri shell in `src-tauri/` wires these pieces to the UI.

pub mod config;
pub mod observable;
pub mod profile;
pub mod remote;
pub mod state;
pub mod store;
pub mod sync;

pub use config::{AppConfig, ConfigError};
pub use observable::ObservableState;
pub use profile::{ProfileEditor, ProfileError, ProfileStore};
pub use remote::{HttpRemoteSource, RemoteError, RemoteResponse, RemoteSource};
pub use state::{DbConnection, Profile, Record, RecordDraft, RecordEdit};
pub use store::{MemoryRecordStore, RecordStore, SqliteRecordStore, StoreError};
pub use sync::{SyncConfig, SyncCoordinator, SyncError, SyncOutcome};
