mod capture;
mod history;
mod images;
mod ocr;
mod settings;
mod utils;

use capture::{
    commands::{begin_selection, cancel_selection, capture_region, submit_selection},
    selector::{self, SELECTION_WINDOW_LABEL},
    CaptureGate, SelectionBroker,
};
use history::{
    commands::{
        append_history_entry, clear_history, delete_history_entry, load_history, replace_history,
    },
    HistoryStore,
};
use images::ImageDir;
use ocr::commands::{extract_text_from_image, ingest_image, open_image_folder, upload_image};
use settings::{CaptureSettings, SettingsStore};
use std::sync::Arc;
use tauri::{Emitter, Manager, State, WindowEvent};

const HISTORY_FILE: &str = "text-history.json";
const IMAGE_DIR: &str = "img";
const SETTINGS_FILE: &str = "settings.json";

pub(crate) struct AppState {
    pub(crate) history: Arc<HistoryStore>,
    pub(crate) images: ImageDir,
    pub(crate) settings: SettingsStore,
    pub(crate) gate: CaptureGate,
    pub(crate) selection: SelectionBroker,
}

#[tauri::command]
fn get_capture_settings(state: State<AppState>) -> Result<CaptureSettings, String> {
    Ok(state.settings.capture())
}

#[tauri::command]
fn set_capture_settings(
    settings: CaptureSettings,
    state: State<AppState>,
    app_handle: tauri::AppHandle,
) -> Result<(), String> {
    state
        .settings
        .update_capture(settings.clone())
        .map_err(|e| e.to_string())?;

    app_handle
        .emit("capture-settings-updated", &settings)
        .map_err(|e| e.to_string())?;

    Ok(())
}

fn debug_enabled() -> bool {
    std::env::var("SNAPTEXT_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(if debug_enabled() {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    log::info!("SnapText starting up...");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let result = (|| -> anyhow::Result<()> {
                let app_data_dir = app
                    .path()
                    .app_data_dir()
                    .map_err(|err| anyhow::anyhow!(err))?;
                std::fs::create_dir_all(&app_data_dir)?;

                let history = HistoryStore::new(app_data_dir.join(HISTORY_FILE));
                log::info!(
                    "History at {} ({} entries)",
                    history.path().display(),
                    history.load().len()
                );

                let images = ImageDir::new(app_data_dir.join(IMAGE_DIR));
                images.ensure()?;

                let settings = SettingsStore::new(app_data_dir.join(SETTINGS_FILE))?;

                app.manage(AppState {
                    history: Arc::new(history),
                    images,
                    settings,
                    gate: CaptureGate::new(),
                    selection: SelectionBroker::new(),
                });

                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .on_window_event(|window, event| {
            if window.label() == SELECTION_WINDOW_LABEL {
                if let WindowEvent::Destroyed = event {
                    selector::on_overlay_closed(window.app_handle());
                }
            }
        })
        .invoke_handler(tauri::generate_handler![
            begin_selection,
            submit_selection,
            cancel_selection,
            capture_region,
            extract_text_from_image,
            ingest_image,
            upload_image,
            open_image_folder,
            load_history,
            replace_history,
            append_history_entry,
            delete_history_entry,
            clear_history,
            get_capture_settings,
            set_capture_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
