// OpenData Jabar - app shell
// Wires the core store, sync and profile pieces into Tauri

use std::sync::Arc;
use tauri::Manager;

use opendata_jabar::config;
use opendata_jabar::state::{init_db, storage};
use opendata_jabar::{
    HttpRemoteSource, ObservableState, ProfileEditor, ProfileStore, RecordStore,
    SqliteRecordStore, SyncCoordinator,
};

mod bridge;
mod commands;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_fs::init())
        .setup(|app| {
            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(log::LevelFilter::Info)
                        .build(),
                )?;
            }

            let config = config::load_or_init()?;

            // Initialize database
            let db_path = config.database_path(&storage::get_app_data_dir()?);
            let db = init_db(&db_path, config.migration_options()).map_err(|e| {
                log::error!("Failed to initialize database: {}", e);
                e
            })?;

            let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(db.clone()));
            let remote = Arc::new(HttpRemoteSource::from_config(&config)?);
            let sync = SyncCoordinator::new(
                store,
                remote,
                ObservableState::new(),
                config.sync_config(),
            );
            let profile = ProfileEditor::new(ProfileStore::new(db))?;

            bridge::start(app.handle(), &sync, &profile);

            // Initial load runs in the background; the window shows cached data meanwhile
            let initial = sync.clone();
            tauri::async_runtime::spawn(async move {
                if let Err(e) = initial.start().await {
                    log::error!("Initial sync failed: {}", e);
                }
            });

            app.manage(sync);
            app.manage(profile);

            log::info!("OpenData Jabar initialized from {}", config.api_url);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::sync_records,
            commands::list_records,
            commands::get_record,
            commands::insert_record,
            commands::update_record,
            commands::delete_record,
            commands::get_row_count,
            commands::refresh_row_count,
            commands::is_loading,
            commands::get_profile,
            commands::update_profile,
            commands::update_profile_image,
            commands::clear_profile_image,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
