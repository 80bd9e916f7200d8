//! Sync Coordinator: fetch from the remote, upsert into the local store,
//! publish to the observable slots.
//!
//! One cycle runs Fetching -> Reconciling -> Publishing and always ends with
//! `is_loading = false`. Remote failures keep the last good data in place.
//! Local mutations write to the store, publish the new row count, then run a
//! full cycle. The observable record list only changes when a fetch succeeds,
//! so a local write shows up there once the remote sends it back.
//!
//! Overlapping cycles are not coalesced: each publishes when it finishes and
//! the last one to land wins.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::observable::ObservableState;
use crate::remote::{RemoteError, RemoteSource};
use crate::state::{Record, RecordDraft, RecordEdit, ValidationError};
use crate::store::{RecordStore, StoreError, StoreResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncConfig {
    /// When false, remote failures are logged and `sync` reports stale data
    /// instead of an error.
    pub surface_sync_errors: bool,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Remote unavailable: {0}")]
    Transport(#[from] RemoteError),
    #[error("Remote rejected the request with code {0}")]
    Rejected(i64),
    #[error("Storage error: {0}")]
    Storage(StoreError),
    #[error("Record {0} not found")]
    NotFound(i64),
    #[error("Invalid record: {0}")]
    Validation(#[from] ValidationError),
    #[error("Background task failed: {0}")]
    Worker(String),
}

impl SyncError {
    pub fn is_remote(&self) -> bool {
        matches!(self, SyncError::Transport(_) | SyncError::Rejected(_))
    }
}

impl From<StoreError> for SyncError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(id) => SyncError::NotFound(id),
            other => SyncError::Storage(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The fetched records were stored and published
    Synced { records: usize },
    /// The remote failed; local data and the published list were kept
    Stale { reason: String },
}

#[derive(Clone)]
pub struct SyncCoordinator {
    store: Arc<dyn RecordStore>,
    remote: Arc<dyn RemoteSource>,
    state: ObservableState,
    config: SyncConfig,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        remote: Arc<dyn RemoteSource>,
        state: ObservableState,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            remote,
            state,
            config,
        }
    }

    /// Read-only view for consumers
    pub fn state(&self) -> &ObservableState {
        &self.state
    }

    // Store calls hit the disk, keep them off the async workers
    async fn on_store<T, F>(&self, op: F) -> Result<T, SyncError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn RecordStore) -> StoreResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| SyncError::Worker(e.to_string()))?;
        Ok(result?)
    }

    /// Initial load: publish the local row count, then sync
    pub async fn start(&self) -> Result<SyncOutcome, SyncError> {
        self.refresh_row_count().await?;
        self.sync().await
    }

    /// Run one full sync cycle
    pub async fn sync(&self) -> Result<SyncOutcome, SyncError> {
        log::info!("Sync started");
        self.state.publish_loading(true);
        let result = self.run_cycle().await;
        self.state.publish_loading(false);

        match result {
            Ok(records) => {
                log::info!("Sync finished: {} records", records);
                Ok(SyncOutcome::Synced { records })
            }
            Err(e) if e.is_remote() && !self.config.surface_sync_errors => {
                log::warn!("Sync failed, keeping local data: {}", e);
                Ok(SyncOutcome::Stale {
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                log::error!("Sync failed: {}", e);
                Err(e)
            }
        }
    }

    /// Run a sync cycle on the runtime without waiting for it
    pub fn spawn_sync(&self) -> JoinHandle<Result<SyncOutcome, SyncError>> {
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.sync().await })
    }

    async fn run_cycle(&self) -> Result<usize, SyncError> {
        let response = self.remote.fetch().await?;
        if !response.is_success() {
            return Err(SyncError::Rejected(response.error_code));
        }

        let records = response.records;
        let batch = records.clone();
        self.on_store(move |store| store.insert_all(&batch)).await?;

        let count = records.len();
        self.state.publish_records(records);
        Ok(count)
    }

    async fn after_mutation(&self) -> Result<(), SyncError> {
        self.refresh_row_count().await?;
        if let Err(e) = self.sync().await {
            // The local write already landed; a failed refresh does not undo it
            log::warn!("Resync after local change failed: {}", e);
        }
        Ok(())
    }

    /// Store a record and return its id
    pub async fn insert(&self, record: Record) -> Result<i64, SyncError> {
        let id = self.on_store(move |store| store.insert(&record)).await?;
        log::info!("Inserted record {}", id);
        self.after_mutation().await?;
        Ok(id)
    }

    /// Validate user input, then insert it
    pub async fn insert_draft(&self, draft: RecordDraft) -> Result<i64, SyncError> {
        draft.validate()?;
        self.insert(draft.into_record()).await
    }

    pub async fn update(&self, record: Record) -> Result<(), SyncError> {
        let id = record.id;
        self.on_store(move |store| store.update(&record)).await?;
        log::info!("Updated record {}", id);
        self.after_mutation().await
    }

    /// Apply an edit form to a stored record, keeping its province
    pub async fn update_values(&self, id: i64, edit: RecordEdit) -> Result<Record, SyncError> {
        edit.validate()?;
        let stored = self.get_by_id(id).await?.ok_or(SyncError::NotFound(id))?;
        let updated = edit.apply_to(&stored);
        self.update(updated.clone()).await?;
        Ok(updated)
    }

    pub async fn delete(&self, record: Record) -> Result<(), SyncError> {
        let id = record.id;
        self.on_store(move |store| store.delete(&record)).await?;
        log::info!("Deleted record {}", id);
        self.after_mutation().await
    }

    /// Read straight from the store, never from the published list
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Record>, SyncError> {
        self.on_store(move |store| store.get_by_id(id)).await
    }

    /// Everything in the local store, including rows the remote has not echoed
    pub async fn local_records(&self) -> Result<Vec<Record>, SyncError> {
        self.on_store(|store| store.get_all()).await
    }

    /// Recount the store and publish the result
    pub async fn refresh_row_count(&self) -> Result<i64, SyncError> {
        let count = self.on_store(|store| store.count()).await?;
        self.state.publish_row_count(count);
        Ok(count)
    }
}
