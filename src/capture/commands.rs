use std::sync::Arc;

use tauri::{AppHandle, Emitter, State};

use crate::{
    capture::{
        selector, CaptureError, CapturePipeline, CaptureResult, PrimaryMonitor, SelectionRect,
        TauriHostWindow,
    },
    AppState,
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Opens the selection overlay and resolves once the user has drawn a region
/// and it has been captured, or the overlay was dismissed.
#[tauri::command]
pub async fn begin_selection(
    app: AppHandle,
    state: State<'_, AppState>,
) -> Result<CaptureResult, String> {
    let Some(_permit) = state.gate.try_acquire() else {
        return Ok(CaptureResult::failure(CaptureError::Busy));
    };

    let selection = state.selection.begin().map_err(|e| e.to_string())?;
    let opened = match TauriHostWindow::main(&app) {
        Ok(main) => selector::open_with_host_hidden(&main, || selector::open_overlay(&app)),
        Err(err) => {
            log_warn!("Opening overlay without hiding main window: {err:#}");
            selector::open_overlay(&app)
        }
    };
    if let Err(err) = opened {
        state.selection.cancel();
        return Err(format!("{err:#}"));
    }

    let rect = match selection.await {
        Ok(Some(rect)) => rect,
        _ => {
            log_info!("Region selection cancelled");
            return Ok(CaptureResult::failure("selection cancelled"));
        }
    };

    Ok(run_capture(&app, &state, rect).await)
}

/// Called by the overlay page when the drag is released, with both drag
/// corners in screen pixels.
#[tauri::command]
pub async fn submit_selection(
    app: AppHandle,
    state: State<'_, AppState>,
    start: (f64, f64),
    end: (f64, f64),
) -> Result<(), String> {
    let rect = SelectionRect::from_drag(start, end);
    if !state.selection.stage(rect) {
        log_warn!("Selection {rect:?} arrived with no capture waiting for it");
    }
    // The staged rect is delivered once the overlay is destroyed.
    if !selector::close_overlay(&app) {
        selector::on_overlay_closed(&app);
    }
    Ok(())
}

#[tauri::command]
pub async fn cancel_selection(app: AppHandle) -> Result<(), String> {
    if !selector::close_overlay(&app) {
        selector::on_overlay_closed(&app);
    }
    Ok(())
}

/// Captures `rect` directly, without the overlay.
#[tauri::command]
pub async fn capture_region(
    app: AppHandle,
    state: State<'_, AppState>,
    rect: SelectionRect,
) -> Result<CaptureResult, String> {
    let Some(_permit) = state.gate.try_acquire() else {
        return Ok(CaptureResult::failure(CaptureError::Busy));
    };
    Ok(run_capture(&app, &state, rect).await)
}

async fn run_capture(app: &AppHandle, state: &AppState, rect: SelectionRect) -> CaptureResult {
    let result = match TauriHostWindow::main(app) {
        Ok(window) => {
            let pipeline = CapturePipeline::new(
                Arc::new(window),
                Arc::new(PrimaryMonitor),
                state.images.clone(),
                state.settings.settle_policy(),
            );
            pipeline.run(rect).await
        }
        Err(err) => CaptureResult::failure(CaptureError::window(err)),
    };

    if let Err(err) = app.emit("capture-done", &result) {
        log_warn!("Failed to emit capture-done: {err}");
    }
    result
}
