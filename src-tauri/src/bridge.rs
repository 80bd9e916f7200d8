// Forwards observable slot changes to the webview as events
use serde::Serialize;
use tauri::{AppHandle, Emitter};
use tokio::sync::watch;

use opendata_jabar::{ProfileEditor, SyncCoordinator};

pub const RECORDS_CHANGED: &str = "records-changed";
pub const LOADING_CHANGED: &str = "loading-changed";
pub const ROW_COUNT_CHANGED: &str = "row-count-changed";
pub const PROFILE_CHANGED: &str = "profile-changed";

/// Start one forwarding task per slot
pub fn start(app: &AppHandle, sync: &SyncCoordinator, profile: &ProfileEditor) {
    let state = sync.state();
    forward(app.clone(), RECORDS_CHANGED, state.subscribe_records());
    forward(app.clone(), LOADING_CHANGED, state.subscribe_loading());
    forward(app.clone(), ROW_COUNT_CHANGED, state.subscribe_row_count());
    forward(app.clone(), PROFILE_CHANGED, profile.subscribe());
}

fn forward<T>(app: AppHandle, event: &'static str, mut rx: watch::Receiver<T>)
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    tauri::async_runtime::spawn(async move {
        // Ends when the publisher is dropped
        while rx.changed().await.is_ok() {
            let value = rx.borrow_and_update().clone();
            if let Err(e) = app.emit(event, value) {
                log::warn!("Failed to emit {}: {}", event, e);
            }
        }
    });
}
