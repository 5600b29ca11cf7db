use std::sync::Arc;

use chrono::Local;
use tauri::State;

use crate::{
    history::{store::format_date, HistoryEntry, HistoryStore},
    AppState,
};

// History writes report success as a plain bool; the UI owns the messaging.
const ENABLE_LOGS: bool = true;

use crate::log_error;

/// Runs `op` against the history file on the blocking pool.
pub(crate) async fn on_store<T, F>(store: &Arc<HistoryStore>, op: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(&HistoryStore) -> T + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| format!("history worker failed: {e}"))
}

fn reported(action: &str, result: anyhow::Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            log_error!("Failed to {action}: {err:#}");
            false
        }
    }
}

#[tauri::command]
pub async fn load_history(state: State<'_, AppState>) -> Result<Vec<HistoryEntry>, String> {
    on_store(&state.history, |history| history.load()).await
}

#[tauri::command]
pub async fn replace_history(state: State<'_, AppState>, entries: Vec<HistoryEntry>) -> Result<bool, String> {
    let result = on_store(&state.history, move |history| history.replace(entries)).await?;
    Ok(reported("replace history", result))
}

#[tauri::command]
pub async fn append_history_entry(
    state: State<'_, AppState>,
    mut entry: HistoryEntry,
) -> Result<bool, String> {
    if entry.date.is_empty() {
        entry.date = format_date(Local::now());
    }

    let result = on_store(&state.history, move |history| history.append(entry)).await?;
    Ok(reported("append history entry", result))
}

#[tauri::command]
pub async fn delete_history_entry(
    state: State<'_, AppState>,
    index: usize,
) -> Result<Vec<HistoryEntry>, String> {
    on_store(&state.history, move |history| history.delete(index))
        .await?
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn clear_history(state: State<'_, AppState>) -> Result<bool, String> {
    let result = on_store(&state.history, |history| history.clear()).await?;
    Ok(reported("clear history", result))
}
