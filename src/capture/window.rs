use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tauri::{AppHandle, Manager, PhysicalPosition, PhysicalSize, WebviewWindow};

pub const MAIN_WINDOW_LABEL: &str = "main";

/// Outer position and size of a window, in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl WindowBounds {
    /// Zero-sized bounds parked in the bottom-right corner of the screen.
    pub fn parked(screen_width: u32, screen_height: u32) -> Self {
        let corner = |extent: u32| i32::try_from(extent.saturating_sub(1)).unwrap_or(i32::MAX);
        Self {
            x: corner(screen_width),
            y: corner(screen_height),
            width: 0,
            height: 0,
        }
    }

    pub fn same_position(&self, other: &WindowBounds) -> bool {
        self.x == other.x && self.y == other.y
    }
}

/// The window that must stay out of the screenshot.
pub trait HostWindow: Send + Sync {
    fn bounds(&self) -> Result<WindowBounds>;
    fn set_bounds(&self, bounds: WindowBounds) -> Result<()>;
    fn show(&self) -> Result<()>;
    fn hide(&self) -> Result<()>;
    /// Size of the primary display, in physical pixels.
    fn screen_size(&self) -> Result<(u32, u32)>;
}

pub struct TauriHostWindow {
    window: WebviewWindow,
}

impl TauriHostWindow {
    pub fn new(window: WebviewWindow) -> Self {
        Self { window }
    }

    pub fn main(app: &AppHandle) -> Result<Self> {
        app.get_webview_window(MAIN_WINDOW_LABEL)
            .map(Self::new)
            .ok_or_else(|| anyhow!("main window not found"))
    }
}

impl HostWindow for TauriHostWindow {
    fn bounds(&self) -> Result<WindowBounds> {
        let position = self
            .window
            .outer_position()
            .context("failed to read window position")?;
        let size = self.window.outer_size().context("failed to read window size")?;
        Ok(WindowBounds {
            x: position.x,
            y: position.y,
            width: size.width,
            height: size.height,
        })
    }

    fn set_bounds(&self, bounds: WindowBounds) -> Result<()> {
        self.window
            .set_position(PhysicalPosition::new(bounds.x, bounds.y))
            .context("failed to move window")?;
        self.window
            .set_size(PhysicalSize::new(bounds.width, bounds.height))
            .context("failed to resize window")?;
        Ok(())
    }

    fn show(&self) -> Result<()> {
        self.window.show().context("failed to show window")
    }

    fn hide(&self) -> Result<()> {
        self.window.hide().context("failed to hide window")
    }

    fn screen_size(&self) -> Result<(u32, u32)> {
        let monitor = self
            .window
            .primary_monitor()
            .context("failed to query primary monitor")?
            .ok_or_else(|| anyhow!("no primary monitor"))?;
        let size = monitor.size();
        Ok((size.width, size.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parked_bounds_sit_in_the_last_pixel() {
        assert_eq!(
            WindowBounds::parked(1920, 1080),
            WindowBounds {
                x: 1919,
                y: 1079,
                width: 0,
                height: 0
            }
        );
        assert_eq!(WindowBounds::parked(0, 0).x, 0);
    }
}
