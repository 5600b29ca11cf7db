use std::path::Path;

use anyhow::{anyhow, Result};
use rusty_tesseract::{Args, Image};

use super::TextExtractor;

pub const DEFAULT_LANGUAGE: &str = "eng";

/// Runs the system `tesseract` binary on an image file.
#[derive(Debug, Clone)]
pub struct TesseractExtractor {
    language: String,
}

impl TesseractExtractor {
    pub fn new(language: impl Into<String>) -> Self {
        let language = language.into();
        Self {
            language: if language.trim().is_empty() {
                DEFAULT_LANGUAGE.into()
            } else {
                language
            },
        }
    }
}

impl TextExtractor for TesseractExtractor {
    fn recognize(&self, image_path: &Path) -> Result<String> {
        let image = Image::from_path(image_path.to_path_buf())
            .map_err(|err| anyhow!("unsupported image {}: {err}", image_path.display()))?;
        let args = Args {
            lang: self.language.clone(),
            ..Args::default()
        };
        rusty_tesseract::image_to_string(&image, &args).map_err(|err| anyhow!("tesseract: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_language_falls_back_to_english() {
        assert_eq!(TesseractExtractor::new("  ").language, "eng");
        assert_eq!(TesseractExtractor::new("fra").language, "fra");
    }
}
