// Tauri IPC Commands
use serde::{Deserialize, Serialize};
use tauri::State;

use opendata_jabar::{
    Profile, ProfileEditor, Record, RecordDraft, RecordEdit, SyncCoordinator, SyncOutcome,
};

#[derive(Debug, Serialize)]
pub struct CommandError {
    message: String,
}

impl<E: std::fmt::Display> From<E> for CommandError {
    fn from(error: E) -> Self {
        CommandError {
            message: error.to_string(),
        }
    }
}

type CommandResult<T> = Result<T, CommandError>;

// ==================== RECORD COMMANDS ====================

#[tauri::command]
pub async fn sync_records(sync: State<'_, SyncCoordinator>) -> CommandResult<SyncOutcome> {
    Ok(sync.sync().await?)
}

/// The last published record list, not the whole local store
#[tauri::command]
pub fn list_records(sync: State<'_, SyncCoordinator>) -> Vec<Record> {
    sync.state().records()
}

#[tauri::command]
pub async fn get_record(sync: State<'_, SyncCoordinator>, id: i64) -> CommandResult<Option<Record>> {
    Ok(sync.get_by_id(id).await?)
}

#[tauri::command]
pub async fn insert_record(
    sync: State<'_, SyncCoordinator>,
    draft: RecordDraft,
) -> CommandResult<i64> {
    Ok(sync.insert_draft(draft).await?)
}

#[derive(Debug, Deserialize)]
pub struct UpdateRecordInput {
    pub id: i64,
    pub edit: RecordEdit,
}

#[tauri::command]
pub async fn update_record(
    sync: State<'_, SyncCoordinator>,
    input: UpdateRecordInput,
) -> CommandResult<Record> {
    Ok(sync.update_values(input.id, input.edit).await?)
}

#[tauri::command]
pub async fn delete_record(sync: State<'_, SyncCoordinator>, id: i64) -> CommandResult<()> {
    match sync.get_by_id(id).await? {
        Some(record) => Ok(sync.delete(record).await?),
        None => {
            log::debug!("Delete of unknown record {} ignored", id);
            Ok(())
        }
    }
}

#[tauri::command]
pub fn get_row_count(sync: State<'_, SyncCoordinator>) -> i64 {
    sync.state().row_count()
}

#[tauri::command]
pub async fn refresh_row_count(sync: State<'_, SyncCoordinator>) -> CommandResult<i64> {
    Ok(sync.refresh_row_count().await?)
}

#[tauri::command]
pub fn is_loading(sync: State<'_, SyncCoordinator>) -> bool {
    sync.state().is_loading()
}

// ==================== PROFILE COMMANDS ====================

#[tauri::command]
pub fn get_profile(editor: State<'_, ProfileEditor>) -> Profile {
    editor.current()
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileInput {
    pub name: String,
    pub student_id: String,
    pub email: String,
}

#[tauri::command]
pub fn update_profile(
    editor: State<'_, ProfileEditor>,
    input: UpdateProfileInput,
) -> CommandResult<Profile> {
    Ok(editor.update_details(&input.name, &input.student_id, &input.email)?)
}

#[tauri::command]
pub fn update_profile_image(
    editor: State<'_, ProfileEditor>,
    image: Vec<u8>,
) -> CommandResult<Profile> {
    Ok(editor.update_image(image)?)
}

#[tauri::command]
pub fn clear_profile_image(editor: State<'_, ProfileEditor>) -> CommandResult<Profile> {
    Ok(editor.clear_image()?)
}
