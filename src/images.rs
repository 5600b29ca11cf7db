//! The directory captured and uploaded images land in.

use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use image::{DynamicImage, ImageFormat};

const CAPTURE_PREFIX: &str = "capture-";

#[derive(Debug, Clone)]
pub struct ImageDir {
    root: PathBuf,
}

impl ImageDir {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create image directory {}", self.root.display()))
    }

    /// `capture-<timestamp>.png`, with a `-N` suffix if that name is taken.
    pub fn next_capture_path(&self, at: DateTime<Utc>) -> PathBuf {
        unique_path(&self.root, &capture_file_stem(at), "png")
    }

    /// Writes `image` as a PNG under a fresh capture name.
    pub fn save_png(&self, image: &DynamicImage, at: DateTime<Utc>) -> Result<PathBuf> {
        self.ensure()?;
        let path = self.next_capture_path(at);
        image
            .save_with_format(&path, ImageFormat::Png)
            .with_context(|| format!("Failed to write capture to {}", path.display()))?;
        Ok(path)
    }

    /// Stores externally supplied image bytes, keeping only the final
    /// component of `file_name`.
    pub fn upload(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        if bytes.is_empty() {
            bail!("uploaded image '{file_name}' is empty");
        }

        let name = sanitize_file_name(file_name)?;
        let name_path = Path::new(&name);
        let stem = name_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.clone());
        let extension = name_path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.ensure()?;
        let path = unique_path(&self.root, &stem, &extension);
        fs::write(&path, bytes)
            .with_context(|| format!("Failed to write upload to {}", path.display()))?;
        Ok(path)
    }
}

/// ISO-8601 timestamp with `:` and `.` swapped for `-` so it is a safe name.
pub fn capture_file_stem(at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{CAPTURE_PREFIX}{stamp}")
}

fn sanitize_file_name(file_name: &str) -> Result<String> {
    let last = Path::new(file_name.trim())
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .last()
        .ok_or_else(|| anyhow!("invalid upload file name '{file_name}'"))?;

    // Windows separators survive `Path::components` on unix.
    let last = last
        .rsplit(['\\', '/'])
        .next()
        .unwrap_or_default()
        .to_string();

    if last.is_empty() || last == "." || last == ".." {
        bail!("invalid upload file name '{file_name}'");
    }
    Ok(last)
}

fn unique_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let with_ext = |name: String| {
        if extension.is_empty() {
            dir.join(name)
        } else {
            dir.join(format!("{name}.{extension}"))
        }
    };

    let mut candidate = with_ext(stem.to_string());
    let mut n = 1u32;
    while candidate.exists() {
        candidate = with_ext(format!("{stem}-{n}"));
        n += 1;
    }
    candidate
}
