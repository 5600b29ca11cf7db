use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::{
    capture::{
        pipeline::{DEFAULT_SETTLE_DELAY_MS, DEFAULT_SETTLE_RETRIES},
        SettlePolicy,
    },
    ocr::tesseract::DEFAULT_LANGUAGE,
};

/// Overrides `settle_delay_ms` without touching the settings file.
pub const SETTLE_DELAY_ENV: &str = "SNAPTEXT_SETTLE_MS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CaptureSettings {
    /// Wait between parking the main window and taking the screenshot.
    pub settle_delay_ms: u64,
    /// Extra waits when the window has not reported its parked position yet.
    pub settle_retries: u32,
    pub ocr_language: String,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            settle_retries: DEFAULT_SETTLE_RETRIES,
            ocr_language: DEFAULT_LANGUAGE.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    capture: CaptureSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn capture(&self) -> CaptureSettings {
        self.read().capture.clone()
    }

    pub fn update_capture(&self, settings: CaptureSettings) -> Result<()> {
        let mut guard = self.write();
        let previous = std::mem::replace(&mut guard.capture, settings);
        if let Err(err) = self.persist(&guard) {
            guard.capture = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Settle timing for the capture pipeline, honoring `SNAPTEXT_SETTLE_MS`.
    pub fn settle_policy(&self) -> SettlePolicy {
        let capture = self.capture();
        let delay_ms = std::env::var(SETTLE_DELAY_ENV)
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(capture.settle_delay_ms);

        SettlePolicy {
            delay: Duration::from_millis(delay_ms),
            retries: capture.settle_retries,
        }
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
