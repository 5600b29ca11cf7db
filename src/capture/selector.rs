use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Context, Result};
use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindowBuilder};
use tokio::sync::oneshot;

use super::{HostWindow, SelectionRect, TauriHostWindow};
use crate::AppState;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const SELECTION_WINDOW_LABEL: &str = "selection";
const SELECTION_PAGE: &str = "selection.html";

type SelectionReply = oneshot::Sender<Option<SelectionRect>>;

struct PendingSelection {
    reply: SelectionReply,
    staged: Option<SelectionRect>,
}

/// What closing the overlay resolved the waiting request with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayClosed {
    Region,
    Cancelled,
    NothingPending,
}

/// Hands the rectangle drawn on the overlay to the request that opened it.
///
/// A submitted rectangle is only staged; it is delivered once the overlay
/// window has been destroyed, so the capture never sees the overlay.
/// `None` on the channel means the overlay went away without a selection.
#[derive(Default)]
pub struct SelectionBroker {
    pending: Mutex<Option<PendingSelection>>,
}

impl SelectionBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> Result<oneshot::Receiver<Option<SelectionRect>>> {
        let mut pending = self.lock();
        if pending
            .as_ref()
            .is_some_and(|selection| !selection.reply.is_closed())
        {
            bail!("a region selection is already open");
        }
        let (reply, receiver) = oneshot::channel();
        *pending = Some(PendingSelection {
            reply,
            staged: None,
        });
        Ok(receiver)
    }

    /// Holds `rect` until the overlay is gone. False when nobody is waiting.
    pub fn stage(&self, rect: SelectionRect) -> bool {
        match self.lock().as_mut() {
            Some(selection) => {
                selection.staged = Some(rect);
                true
            }
            None => false,
        }
    }

    /// Resolves the waiting request with the staged rectangle, if any.
    pub fn finish(&self) -> OverlayClosed {
        let Some(selection) = self.lock().take() else {
            return OverlayClosed::NothingPending;
        };
        let outcome = if selection.staged.is_some() {
            OverlayClosed::Region
        } else {
            OverlayClosed::Cancelled
        };
        if selection.reply.send(selection.staged).is_err() {
            return OverlayClosed::NothingPending;
        }
        outcome
    }

    /// Drops any staged rectangle and resolves the request with `None`.
    pub fn cancel(&self) -> bool {
        match self.lock().take() {
            Some(selection) => selection.reply.send(None).is_ok(),
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<PendingSelection>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Hides `host` while `open` brings up the overlay; shows it again if that
/// fails.
pub fn open_with_host_hidden(host: &dyn HostWindow, open: impl FnOnce() -> Result<()>) -> Result<()> {
    if let Err(err) = host.hide() {
        log_warn!("Failed to hide main window for selection: {err:#}");
    }
    open().map_err(|err| {
        if let Err(show_err) = host.show() {
            log_warn!("Failed to show main window after overlay error: {show_err:#}");
        }
        err
    })
}

/// Opens the full-screen, borderless, always-on-top selection overlay.
pub fn open_overlay(app: &AppHandle) -> Result<()> {
    if let Some(existing) = app.get_webview_window(SELECTION_WINDOW_LABEL) {
        existing.set_focus().context("failed to focus selection overlay")?;
        return Ok(());
    }

    let monitor = app
        .primary_monitor()
        .context("failed to query primary monitor")?
        .ok_or_else(|| anyhow!("no primary monitor"))?;
    let size = monitor.size().to_logical::<f64>(monitor.scale_factor());

    let builder = WebviewWindowBuilder::new(
        app,
        SELECTION_WINDOW_LABEL,
        WebviewUrl::App(SELECTION_PAGE.into()),
    )
    .title("Select a region")
    .position(0.0, 0.0)
    .inner_size(size.width, size.height)
    .decorations(false)
    .always_on_top(true)
    .skip_taskbar(true)
    .resizable(false)
    .shadow(false)
    .transparent(true)
    .focused(true);

    builder.build().context("failed to open selection overlay")?;
    log_info!("Selection overlay opened at {}x{}", size.width, size.height);
    Ok(())
}

/// Asks the overlay to close. False when there was no overlay to close, in
/// which case no `Destroyed` event will follow.
pub fn close_overlay(app: &AppHandle) -> bool {
    let Some(overlay) = app.get_webview_window(SELECTION_WINDOW_LABEL) else {
        return false;
    };
    match overlay.close() {
        Ok(()) => true,
        Err(err) => {
            log_warn!("Failed to close selection overlay: {err}");
            false
        }
    }
}

/// Runs when the overlay window is destroyed, however that happened.
pub fn on_overlay_closed(app: &AppHandle) {
    let state = app.state::<AppState>();
    match state.selection.finish() {
        OverlayClosed::Region => log_info!("Selection overlay closed, capturing region"),
        OverlayClosed::Cancelled => log_info!("Selection overlay closed without a region"),
        OverlayClosed::NothingPending => {}
    }

    match TauriHostWindow::main(app) {
        Ok(window) => {
            if let Err(err) = window.show() {
                log_warn!("Failed to show main window after selection: {err:#}");
            }
        }
        Err(err) => log_warn!("Cannot show main window after selection: {err:#}"),
    }
}
