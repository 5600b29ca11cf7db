use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Display format used for `HistoryEntry::date`.
pub const DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub text: String,
}

impl HistoryEntry {
    pub fn new(text: impl Into<String>, at: DateTime<Local>) -> Self {
        Self {
            date: format_date(at),
            text: text.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.text.is_empty()
    }

    /// Non-object values and objects without a non-empty string `text`
    /// yield `None`. Any `date` is kept, stringified if need be.
    fn from_value(value: Value) -> Option<Self> {
        let object = value.as_object()?;
        let text = object
            .get("text")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())?;
        let date = match object.get("date") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(date)) => date.clone(),
            Some(other) => other.to_string(),
        };
        Some(Self {
            date,
            text: text.to_string(),
        })
    }
}

pub fn format_date(at: DateTime<Local>) -> String {
    at.format(DATE_FORMAT).to_string()
}

/// JSON-file-backed recognized-text history, newest first.
///
/// Every read-modify-write runs under `write_lock`, so an append racing a
/// delete cannot drop either update.
pub struct HistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the history file. Missing, unreadable, or malformed content is
    /// treated as an empty history.
    pub fn load(&self) -> Vec<HistoryEntry> {
        match self.read_entries() {
            Ok(entries) => entries,
            Err(err) => {
                log_warn!(
                    "Failed to load history from {}, starting empty: {err:#}",
                    self.path.display()
                );
                Vec::new()
            }
        }
    }

    /// Replaces the whole history with `entries`, keeping their order.
    pub fn replace(&self, entries: Vec<HistoryEntry>) -> Result<()> {
        let _guard = self.lock();
        self.persist(entries)
    }

    /// Inserts `entry` at the front of the stored history.
    pub fn append(&self, entry: HistoryEntry) -> Result<()> {
        let _guard = self.lock();
        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(err) => {
                log_warn!(
                    "History at {} unreadable before append, using empty base: {err:#}",
                    self.path.display()
                );
                Vec::new()
            }
        };
        entries.insert(0, entry);
        self.persist(entries)
    }

    /// Removes the entry at `index` and returns what remains.
    pub fn delete(&self, index: usize) -> Result<Vec<HistoryEntry>> {
        let _guard = self.lock();
        let mut entries = self.load();
        if index >= entries.len() {
            return Err(anyhow!(
                "history index {index} out of range ({} entries)",
                entries.len()
            ));
        }
        entries.remove(index);
        self.persist(entries.clone())?;
        Ok(entries)
    }

    pub fn clear(&self) -> Result<()> {
        self.replace(Vec::new())
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn read_entries(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read history from {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        let value: Value = serde_json::from_str(&contents)
            .with_context(|| format!("History at {} is not valid JSON", self.path.display()))?;

        match value {
            Value::Array(items) => Ok(items.into_iter().filter_map(HistoryEntry::from_value).collect()),
            other => {
                log_debug!("History file holds a non-array value ({other}), ignoring it");
                Ok(Vec::new())
            }
        }
    }

    /// Filters `entries` and swaps them in through a sibling temp file so a
    /// reader never sees a half-written document.
    fn persist(&self, entries: Vec<HistoryEntry>) -> Result<()> {
        let entries: Vec<HistoryEntry> = entries.into_iter().filter(HistoryEntry::is_valid).collect();
        let serialized = serde_json::to_string_pretty(&entries)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create history directory {}", parent.display())
            })?;
        }

        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "history.json".into());
        let tmp_path = self
            .path
            .with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

        fs::write(&tmp_path, serialized)
            .with_context(|| format!("Failed to write history to {}", tmp_path.display()))?;
        if let Err(err) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(anyhow::Error::new(err)
                .context(format!("Failed to move history into {}", self.path.display())));
        }

        log_debug!("Wrote {} history entries to {}", entries.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn entry(date: &str, text: &str) -> HistoryEntry {
        HistoryEntry {
            date: date.into(),
            text: text.into(),
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> HistoryStore {
        HistoryStore::new(dir.path().join("text-history.json"))
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_in(&dir).load().is_empty());
    }

    #[test]
    fn load_non_array_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "\"not an array\"").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn load_garbage_and_blank_files_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        fs::write(store.path(), "{ this is not json").unwrap();
        assert!(store.load().is_empty());

        fs::write(store.path(), "   \n").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn load_skips_invalid_items() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            r#"[
                {"date": "a", "text": "keep me"},
                {"date": "b"},
                {"date": "c", "text": ""},
                42,
                ["d", "array form"],
                null,
                {"text": "no date"}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            store.load(),
            vec![entry("a", "keep me"), entry("", "no date")]
        );
    }

    #[test]
    fn load_keeps_entries_with_odd_date() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            r#"[{"date": null, "text": "hello"}, {"date": 5, "text": "world"}]"#,
        )
        .unwrap();

        assert_eq!(store.load(), vec![entry("", "hello"), entry("5", "world")]);

        store.append(entry("now", "newest")).unwrap();
        assert_eq!(
            store.load(),
            vec![entry("now", "newest"), entry("", "hello"), entry("5", "world")]
        );
    }

    #[test]
    fn replace_round_trips_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let entries = vec![
            entry("1", "first"),
            entry("2", ""),
            entry("3", "third"),
        ];

        store.replace(entries).unwrap();

        assert_eq!(store.load(), vec![entry("1", "first"), entry("3", "third")]);
    }

    #[test]
    fn append_prepends_and_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store
            .replace(vec![entry("1", "older"), entry("2", "oldest")])
            .unwrap();

        store.append(entry("3", "newest")).unwrap();

        assert_eq!(
            store.load(),
            vec![entry("3", "newest"), entry("1", "older"), entry("2", "oldest")]
        );
    }

    #[test]
    fn append_over_corrupt_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "not json at all").unwrap();

        store.append(entry("1", "hello")).unwrap();

        assert_eq!(store.load(), vec![entry("1", "hello")]);
    }

    #[test]
    fn append_empty_text_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.replace(vec![entry("1", "kept")]).unwrap();

        store.append(entry("2", "")).unwrap();

        assert_eq!(store.load(), vec![entry("1", "kept")]);
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.replace(vec![entry("1", "x")]).unwrap();

        store.clear().unwrap();
        store.clear().unwrap();

        assert!(store.load().is_empty());
        assert_eq!(fs::read_to_string(store.path()).unwrap().trim(), "[]");
    }

    #[test]
    fn delete_removes_only_that_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store
            .replace(vec![entry("1", "a"), entry("2", "b"), entry("3", "c"), entry("4", "d")])
            .unwrap();

        let remaining = store.delete(1).unwrap();

        let expected = vec![entry("1", "a"), entry("3", "c"), entry("4", "d")];
        assert_eq!(remaining, expected);
        assert_eq!(store.load(), expected);
    }

    #[test]
    fn delete_out_of_range_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.replace(vec![entry("1", "a")]).unwrap();

        assert!(store.delete(1).is_err());
        assert_eq!(store.load(), vec![entry("1", "a")]);
    }

    #[test]
    fn persisted_file_is_pretty_array_without_temp_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.replace(vec![entry("d", "t")]).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\n  {"));
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!([{ "date": "d", "text": "t" }]));

        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn concurrent_appends_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.append(entry("d", &format!("entry {i}"))).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.load().len(), 8);
    }

    #[test]
    fn new_entry_uses_display_date() {
        let at = Local::now();
        let e = HistoryEntry::new("text", at);
        assert_eq!(e.date, at.format(DATE_FORMAT).to_string());
        assert!(e.is_valid());
    }
}
