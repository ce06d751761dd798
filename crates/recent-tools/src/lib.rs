//! # recent-tools
//!
//! A small most-recently-used list of tool links, persisted through a
//! pluggable key/value store.
//!
//! ## Semantics
//!
//! - Most recent first.
//! - Adding an entry already present moves it to the front; no duplicates.
//! - At most [`MAX_RECENTS`] entries; the oldest falls off.
//! - A missing or unreadable stored list starts the history empty.
//!
//! ## Usage
//!
//! ```rust
//! use recent_tools::{MemoryStore, RecentTools};
//!
//! let mut recent = RecentTools::load(MemoryStore::default());
//! recent.add("/tools/image-resizer").unwrap();
//! recent.add("/tools/ocr-pdf").unwrap();
//! recent.add("/tools/image-resizer").unwrap();
//! assert_eq!(recent.entries(), ["/tools/image-resizer", "/tools/ocr-pdf"]);
//! ```
//!
//! ## Environment variable overrides
//!
//! - `TOOLS24_DATA_DIR`: directory used by [`FileStore::default_location`].

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, warn};

// ── Public constants ─────────────────────────────────────────────────────────

/// Maximum number of entries kept.
pub const MAX_RECENTS: usize = 5;

/// Key the list is stored under.
pub const STORAGE_KEY: &str = "tools24now_recent_tools";

/// Overrides the directory used by [`FileStore::default_location`].
pub const ENV_DATA_DIR: &str = "TOOLS24_DATA_DIR";

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RecentToolsError {
    /// Reading or writing the backing file failed.
    #[error("Recent tools storage error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stored value is not a JSON array of strings.
    #[error("Stored recent tools list is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The in-memory store's lock was poisoned by a panicking writer.
    #[error("Recent tools store is unavailable: {0}")]
    Unavailable(String),
}

// ── Storage backends ─────────────────────────────────────────────────────────

/// String key/value persistence for the list.
pub trait RecentStore: Send + Sync {
    /// The stored value for `key`, or `None` if nothing was saved yet.
    fn load(&self, key: &str) -> Result<Option<String>, RecentToolsError>;

    fn save(&self, key: &str, value: &str) -> Result<(), RecentToolsError>;
}

/// Process-local store. Useful for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl RecentStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, RecentToolsError> {
        let values = self
            .values
            .lock()
            .map_err(|e| RecentToolsError::Unavailable(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), RecentToolsError> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| RecentToolsError::Unavailable(e.to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Platform data directory for the CLI.
    ///
    /// Default locations:
    /// - **macOS**: `~/Library/Application Support/tools24/`
    /// - **Linux**: `~/.local/share/tools24/`
    /// - **Windows**: `%APPDATA%\tools24\`
    ///
    /// Override by setting `TOOLS24_DATA_DIR`.
    pub fn default_location() -> Self {
        Self::located(std::env::var(ENV_DATA_DIR).ok())
    }

    /// `override_dir` wins unless blank; otherwise the platform data dir.
    fn located(override_dir: Option<String>) -> Self {
        if let Some(dir) = override_dir.filter(|d| !d.trim().is_empty()) {
            return Self::new(dir);
        }
        let base = dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .unwrap_or_else(std::env::temp_dir);
        Self::new(base.join("tools24"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl RecentStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, RecentToolsError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(RecentToolsError::Io { path, source }),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), RecentToolsError> {
        let path = self.path_for(key);
        let io_err = |source| RecentToolsError::Io {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(io_err)?;

        // Write to a sibling then rename so a crash never truncates the list.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(value.as_bytes()).map_err(io_err)?;
        tmp.flush().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;
        debug!("Saved recent tools to {}", path.display());
        Ok(())
    }
}

// ── MRU list ─────────────────────────────────────────────────────────────────

/// Most-recently-used list backed by a [`RecentStore`].
#[derive(Debug)]
pub struct RecentTools<S: RecentStore> {
    store: S,
    entries: Vec<String>,
    capacity: usize,
}

impl<S: RecentStore> RecentTools<S> {
    /// Load the list stored under [`STORAGE_KEY`] with the default capacity.
    pub fn load(store: S) -> Self {
        Self::load_with_capacity(store, MAX_RECENTS)
    }

    /// Like [`load`](Self::load) but keeping at most `capacity` entries (min 1).
    ///
    /// Storage or parse failures are logged and yield an empty list.
    pub fn load_with_capacity(store: S, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let entries = match read_entries(&store) {
            Ok(mut entries) => {
                dedup_in_order(&mut entries);
                entries.truncate(capacity);
                entries
            }
            Err(e) => {
                warn!("Ignoring stored recent tools: {}", e);
                Vec::new()
            }
        };
        Self {
            store,
            entries,
            capacity,
        }
    }

    /// Entries, most recent first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.iter().any(|e| e == entry)
    }

    /// Move `entry` to the front (inserting it if new) and persist.
    ///
    /// The in-memory list is updated even when persisting fails.
    pub fn add(&mut self, entry: impl Into<String>) -> Result<(), RecentToolsError> {
        let entry = entry.into();
        self.entries.retain(|e| *e != entry);
        self.entries.insert(0, entry);
        self.entries.truncate(self.capacity);
        self.persist()
    }

    /// Forget every entry and persist the empty list.
    pub fn clear(&mut self) -> Result<(), RecentToolsError> {
        self.entries.clear();
        self.persist()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn persist(&self) -> Result<(), RecentToolsError> {
        let json = serde_json::to_string(&self.entries)?;
        self.store.save(STORAGE_KEY, &json)
    }
}

fn read_entries<S: RecentStore>(store: &S) -> Result<Vec<String>, RecentToolsError> {
    match store.load(STORAGE_KEY)? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Vec::new()),
    }
}

fn dedup_in_order(entries: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    entries.retain(|e| seen.insert(e.clone()));
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn hrefs(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("/tools/t{i}")).collect()
    }

    #[test]
    fn newest_first_without_duplicates() {
        let mut recent = RecentTools::load(MemoryStore::default());
        recent.add("/tools/a").unwrap();
        recent.add("/tools/b").unwrap();
        recent.add("/tools/a").unwrap();
        assert_eq!(recent.entries(), ["/tools/a", "/tools/b"]);
    }

    #[test]
    fn caps_at_five_and_evicts_oldest() {
        let mut recent = RecentTools::load(MemoryStore::default());
        for h in hrefs(6) {
            recent.add(h).unwrap();
        }
        assert_eq!(recent.len(), MAX_RECENTS);
        assert_eq!(recent.entries()[0], "/tools/t6");
        assert!(!recent.contains("/tools/t1"), "oldest entry should be evicted");
    }

    #[test]
    fn readding_existing_entry_keeps_size() {
        let mut recent = RecentTools::load(MemoryStore::default());
        for h in hrefs(5) {
            recent.add(h).unwrap();
        }
        recent.add("/tools/t2").unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(
            recent.entries(),
            ["/tools/t2", "/tools/t5", "/tools/t4", "/tools/t3", "/tools/t1"]
        );
    }

    #[test]
    fn persists_under_storage_key() {
        let mut recent = RecentTools::load(MemoryStore::default());
        recent.add("/tools/ocr-pdf").unwrap();
        let store = recent.into_store();
        assert_eq!(
            store.load(STORAGE_KEY).unwrap().as_deref(),
            Some(r#"["/tools/ocr-pdf"]"#)
        );

        let reloaded = RecentTools::load(store);
        assert_eq!(reloaded.entries(), ["/tools/ocr-pdf"]);
    }

    #[test]
    fn malformed_storage_starts_empty() {
        let store = MemoryStore::default();
        store.save(STORAGE_KEY, "{not json").unwrap();
        let recent = RecentTools::load(store);
        assert!(recent.is_empty());
    }

    #[test]
    fn stored_list_is_normalised_on_load() {
        let store = MemoryStore::default();
        store
            .save(STORAGE_KEY, r#"["a","b","a","c","d","e","f","g"]"#)
            .unwrap();
        let recent = RecentTools::load(store);
        assert_eq!(recent.entries(), ["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn custom_capacity_is_at_least_one() {
        let mut recent = RecentTools::load_with_capacity(MemoryStore::default(), 0);
        recent.add("x").unwrap();
        recent.add("y").unwrap();
        assert_eq!(recent.capacity(), 1);
        assert_eq!(recent.entries(), ["y"]);
    }

    #[test]
    fn file_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        let mut recent = RecentTools::load(store.clone());
        assert!(recent.is_empty(), "missing file means empty history");
        recent.add("/tools/merge-pdf").unwrap();
        recent.add("/tools/split-pdf").unwrap();

        let path = store.path_for(STORAGE_KEY);
        assert!(path.exists());
        let files: Vec<_> = std::fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files, vec![format!("{STORAGE_KEY}.json")], "no temp files left behind");

        let reloaded = RecentTools::load(store);
        assert_eq!(reloaded.entries(), ["/tools/split-pdf", "/tools/merge-pdf"]);
    }

    #[test]
    fn clear_persists_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let mut recent = RecentTools::load(store.clone());
        recent.add("/tools/image-cropper").unwrap();
        recent.clear().unwrap();
        assert_eq!(
            std::fs::read_to_string(store.path_for(STORAGE_KEY)).unwrap(),
            "[]"
        );
    }

    #[test]
    fn override_dir_wins_over_platform_default() {
        let store = FileStore::located(Some("/tmp/tools24_recent_override".into()));
        assert_eq!(store.dir(), Path::new("/tmp/tools24_recent_override"));
    }

    #[test]
    fn blank_override_falls_back_to_platform_default() {
        for unset in [None, Some("   ".to_string())] {
            let store = FileStore::located(unset);
            assert!(store.dir().ends_with("tools24"), "{}", store.dir().display());
        }
    }
}
