//! Text recognition over saved images.

pub mod commands;
pub mod tesseract;

use std::path::Path;

use anyhow::{bail, Context, Result};

pub use tesseract::TesseractExtractor;

/// An OCR engine. Implementations return the raw recognized text.
pub trait TextExtractor: Send + Sync {
    fn recognize(&self, image_path: &Path) -> Result<String>;
}

/// Recognizes the image at `image_path` once and trims the result.
pub fn extract_text(extractor: &dyn TextExtractor, image_path: &Path) -> Result<String> {
    if !image_path.is_file() {
        bail!("image not found: {}", image_path.display());
    }

    let raw = extractor
        .recognize(image_path)
        .with_context(|| format!("text recognition failed for {}", image_path.display()))?;
    Ok(raw.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Canned {
        reply: Result<String, String>,
        calls: AtomicU32,
    }

    impl Canned {
        fn ok(text: &str) -> Self {
            Self {
                reply: Ok(text.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.into()),
                calls: AtomicU32::new(0),
            }
        }
    }

    impl TextExtractor for Canned {
        fn recognize(&self, _image_path: &Path) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().map_err(|message| anyhow!(message))
        }
    }

    fn image_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("capture.png");
        std::fs::write(&path, b"not really a png").unwrap();
        path
    }

    #[test]
    fn trims_recognized_text() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Canned::ok("\n  Hello, world!\n\n");

        let text = extract_text(&engine, &image_file(&dir)).unwrap();

        assert_eq!(text, "Hello, world!");
    }

    #[test]
    fn engine_error_propagates_without_retry() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Canned::failing("tesseract exploded");

        let err = extract_text(&engine, &image_file(&dir)).unwrap_err();

        assert!(format!("{err:#}").contains("tesseract exploded"));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_image_never_reaches_engine() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Canned::ok("unused");

        assert!(extract_text(&engine, &dir.path().join("gone.png")).is_err());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }
}
