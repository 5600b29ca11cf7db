use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use xcap::Monitor;

/// Source of full-display screenshots.
pub trait ScreenSource: Send + Sync {
    fn capture_primary(&self) -> Result<RgbaImage>;
}

/// Captures the primary monitor through `xcap`.
pub struct PrimaryMonitor;

impl ScreenSource for PrimaryMonitor {
    fn capture_primary(&self) -> Result<RgbaImage> {
        let monitors = Monitor::all().context("failed to enumerate monitors")?;
        let monitor = monitors
            .iter()
            .find(|monitor| monitor.is_primary().unwrap_or(false))
            .or_else(|| monitors.first())
            .ok_or_else(|| anyhow!("no monitors found"))?;

        let shot = monitor
            .capture_image()
            .context("failed to capture primary monitor (is screen recording permitted?)")?;
        let (width, height) = (shot.width(), shot.height());
        if width == 0 || height == 0 {
            return Err(anyhow!("captured an empty screenshot"));
        }

        RgbaImage::from_raw(width, height, shot.into_raw())
            .ok_or_else(|| anyhow!("screenshot buffer does not match {width}x{height}"))
    }
}
