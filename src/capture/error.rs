use std::{fmt, path::PathBuf};

use serde::{ser::SerializeStruct, Serialize, Serializer};
use thiserror::Error;

/// Ways a region capture can fail. `Display` is what the user sees.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
    #[error("a capture is already in progress")]
    Busy,
    #[error("host window error: {0}")]
    Window(String),
    #[error("screen capture failed: {0}")]
    Screen(String),
    #[error("crop failed: {0}")]
    Crop(String),
    #[error("could not save capture: {0}")]
    Persist(String),
}

impl CaptureError {
    pub fn window(err: anyhow::Error) -> Self {
        CaptureError::Window(format!("{err:#}"))
    }

    pub fn screen(err: anyhow::Error) -> Self {
        CaptureError::Screen(format!("{err:#}"))
    }

    pub fn persist(err: anyhow::Error) -> Self {
        CaptureError::Persist(format!("{err:#}"))
    }
}

/// Outcome of one capture request, reported exactly once.
///
/// Serializes as `{ "success": true, "path": .. }` or
/// `{ "success": false, "error": .. }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureResult {
    Success { image_path: PathBuf },
    Failure { message: String },
}

impl CaptureResult {
    pub fn failure(reason: impl fmt::Display) -> Self {
        let message = reason.to_string();
        CaptureResult::Failure {
            message: if message.is_empty() {
                "capture failed".into()
            } else {
                message
            },
        }
    }
}

impl From<Result<PathBuf, CaptureError>> for CaptureResult {
    fn from(result: Result<PathBuf, CaptureError>) -> Self {
        match result {
            Ok(image_path) => CaptureResult::Success { image_path },
            Err(err) => CaptureResult::failure(err),
        }
    }
}

impl Serialize for CaptureResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut payload = serializer.serialize_struct("CaptureResult", 2)?;
        match self {
            CaptureResult::Success { image_path } => {
                payload.serialize_field("success", &true)?;
                payload.serialize_field("path", image_path)?;
            }
            CaptureResult::Failure { message } => {
                payload.serialize_field("success", &false)?;
                payload.serialize_field("error", message)?;
            }
        }
        payload.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_capture_done_payload() {
        let ok = CaptureResult::Success {
            image_path: PathBuf::from("/tmp/img/capture-x.png"),
        };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({ "success": true, "path": "/tmp/img/capture-x.png" })
        );

        let failed = CaptureResult::failure(CaptureError::Busy);
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({ "success": false, "error": "a capture is already in progress" })
        );
    }

    #[test]
    fn failure_message_is_never_empty() {
        assert_eq!(
            CaptureResult::failure(""),
            CaptureResult::Failure {
                message: "capture failed".into()
            }
        );
    }
}
