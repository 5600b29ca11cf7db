use std::path::PathBuf;

use chrono::Local;
use serde::Serialize;
use tauri::{AppHandle, State};
use tauri_plugin_opener::OpenerExt;

use crate::{
    history::{commands::on_store, HistoryEntry},
    ocr::{extract_text, TesseractExtractor},
    AppState,
};

const ENABLE_LOGS: bool = true;

use crate::log_info;

#[derive(Debug, Serialize)]
pub struct ExtractedText {
    pub text: String,
}

async fn recognize(state: &AppState, image_path: PathBuf) -> Result<String, String> {
    let extractor = TesseractExtractor::new(state.settings.capture().ocr_language);
    tokio::task::spawn_blocking(move || extract_text(&extractor, &image_path))
        .await
        .map_err(|e| format!("text recognition worker failed: {e}"))?
        .map_err(|e| format!("{e:#}"))
}

#[tauri::command]
pub async fn extract_text_from_image(
    state: State<'_, AppState>,
    image_path: String,
) -> Result<ExtractedText, String> {
    let text = recognize(&state, PathBuf::from(image_path)).await?;
    Ok(ExtractedText { text })
}

/// Recognizes `image_path` and records the text at the top of the history.
#[tauri::command]
pub async fn ingest_image(
    state: State<'_, AppState>,
    image_path: String,
) -> Result<HistoryEntry, String> {
    let text = recognize(&state, PathBuf::from(&image_path)).await?;
    if text.is_empty() {
        return Err(format!("no text recognized in {image_path}"));
    }

    let entry = HistoryEntry::new(text, Local::now());
    let recorded = entry.clone();
    on_store(&state.history, move |history| history.append(recorded))
        .await?
        .map_err(|e| format!("{e:#}"))?;
    log_info!("Recorded {} characters from {image_path}", entry.text.len());
    Ok(entry)
}

/// Stores an image picked outside the capture flow; returns its path.
#[tauri::command]
pub async fn upload_image(
    state: State<'_, AppState>,
    file_name: String,
    bytes: Vec<u8>,
) -> Result<String, String> {
    let path = state
        .images
        .upload(&file_name, &bytes)
        .map_err(|e| format!("{e:#}"))?;
    log_info!("Stored uploaded image {}", path.display());
    Ok(path.to_string_lossy().into_owned())
}

#[tauri::command]
pub async fn open_image_folder(app: AppHandle, state: State<'_, AppState>) -> Result<(), String> {
    state.images.ensure().map_err(|e| e.to_string())?;
    app.opener()
        .open_path(state.images.root().to_string_lossy(), None::<&str>)
        .map_err(|e| e.to_string())
}
