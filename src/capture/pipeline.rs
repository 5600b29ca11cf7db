use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use chrono::Utc;
use image::{imageops, DynamicImage, RgbaImage};

use crate::images::ImageDir;

use super::{
    CaptureError, CaptureResult, HostWindow, PixelRect, ScreenSource, SelectionRect, WindowBounds,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

pub const DEFAULT_SETTLE_DELAY_MS: u64 = 100;
pub const DEFAULT_SETTLE_RETRIES: u32 = 3;

/// How long to wait for the parked host window to leave the screen.
///
/// After each `delay` the window's reported position is checked against the
/// parked position; the wait repeats up to `retries` more times on mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    pub delay: Duration,
    pub retries: u32,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            retries: DEFAULT_SETTLE_RETRIES,
        }
    }
}

/// Hide → settle → screenshot → crop → save → restore, one run per request.
pub struct CapturePipeline {
    window: Arc<dyn HostWindow>,
    screen: Arc<dyn ScreenSource>,
    images: ImageDir,
    settle: SettlePolicy,
}

impl CapturePipeline {
    pub fn new(
        window: Arc<dyn HostWindow>,
        screen: Arc<dyn ScreenSource>,
        images: ImageDir,
        settle: SettlePolicy,
    ) -> Self {
        Self {
            window,
            screen,
            images,
            settle,
        }
    }

    pub async fn run(&self, rect: SelectionRect) -> CaptureResult {
        let result = self.capture(rect).await;
        match &result {
            Ok(path) => log_info!("Captured selection to {}", path.display()),
            Err(err) => log_error!("Capture failed: {err}"),
        }
        CaptureResult::from(result)
    }

    async fn capture(&self, rect: SelectionRect) -> Result<PathBuf, CaptureError> {
        let pixels = rect.to_pixels()?;
        log_debug!("Capturing {pixels:?}");

        let original = self.window.bounds().map_err(CaptureError::window)?;
        let restore = RestoreGuard::new(Arc::clone(&self.window), original);

        let captured = self.capture_while_parked(pixels).await;
        let restored = restore.finish();

        match (captured, restored) {
            (Ok(path), Ok(())) => Ok(path),
            (Ok(path), Err(err)) => {
                log_warn!(
                    "Capture saved to {} but the host window was not restored",
                    path.display()
                );
                Err(CaptureError::window(err))
            }
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(restore_err)) => {
                log_error!("Host window restore failed after capture error: {restore_err:#}");
                Err(err)
            }
        }
    }

    async fn capture_while_parked(&self, rect: PixelRect) -> Result<PathBuf, CaptureError> {
        let (screen_width, screen_height) =
            self.window.screen_size().map_err(CaptureError::window)?;
        let parked = WindowBounds::parked(screen_width, screen_height);
        self.window
            .set_bounds(parked)
            .map_err(CaptureError::window)?;

        self.wait_for_parked(parked).await;

        let screen = Arc::clone(&self.screen);
        let images = self.images.clone();
        tokio::task::spawn_blocking(move || {
            let shot = screen.capture_primary().map_err(CaptureError::screen)?;
            let cropped = crop(&shot, rect)?;
            images
                .save_png(&DynamicImage::ImageRgba8(cropped), Utc::now())
                .map_err(CaptureError::persist)
        })
        .await
        .map_err(|err| CaptureError::Screen(format!("capture worker failed: {err}")))?
    }

    async fn wait_for_parked(&self, parked: WindowBounds) {
        for attempt in 0..=self.settle.retries {
            tokio::time::sleep(self.settle.delay).await;
            match self.window.bounds() {
                Ok(current) if current.same_position(&parked) => return,
                Ok(current) => {
                    log_debug!("Host window at {current:?} after settle attempt {attempt}, want {parked:?}")
                }
                Err(err) => {
                    log_warn!("Could not confirm host window moved, capturing anyway: {err:#}");
                    return;
                }
            }
        }
        log_warn!(
            "Host window did not report its parked position after {} waits; capturing anyway",
            self.settle.retries + 1
        );
    }
}

/// Cuts `rect` out of `shot`; the rectangle must lie inside the screenshot.
pub fn crop(shot: &RgbaImage, rect: PixelRect) -> Result<RgbaImage, CaptureError> {
    let (width, height) = shot.dimensions();
    let fits = |origin: u32, extent: u32, limit: u32| {
        origin
            .checked_add(extent)
            .map_or(false, |end| end <= limit)
    };

    if !fits(rect.x, rect.width, width) || !fits(rect.y, rect.height, height) {
        return Err(CaptureError::Crop(format!(
            "selection {}x{} at ({}, {}) exceeds screen {}x{}",
            rect.width, rect.height, rect.x, rect.y, width, height
        )));
    }

    Ok(imageops::crop_imm(shot, rect.x, rect.y, rect.width, rect.height).to_image())
}

/// Puts the host window back where it was. Dropping an unfinished guard
/// (panic, cancelled future) still restores.
struct RestoreGuard {
    window: Arc<dyn HostWindow>,
    original: WindowBounds,
    armed: bool,
}

impl RestoreGuard {
    fn new(window: Arc<dyn HostWindow>, original: WindowBounds) -> Self {
        Self {
            window,
            original,
            armed: true,
        }
    }

    fn finish(mut self) -> Result<()> {
        self.armed = false;
        restore(self.window.as_ref(), self.original)
    }
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        if self.armed {
            if let Err(err) = restore(self.window.as_ref(), self.original) {
                log_error!("Failed to restore host window on unwind: {err:#}");
            }
        }
    }
}

fn restore(window: &dyn HostWindow, original: WindowBounds) -> Result<()> {
    let moved = window.set_bounds(original);
    let shown = window.show();
    moved.and(shown)
}
