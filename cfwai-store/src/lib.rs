//! Filesystem-backed persistence for the three stage queues, their
//! single-item crash-recovery files, and the per-outcome archives.
//!
//! Every write goes through [`atomic_write`], which writes to a sibling
//! temp file and renames it into place so readers never observe a
//! partially-written queue or archive.

mod atomic;

use std::path::{Path, PathBuf};

use cfwai_model::{Item, Outcome, Stage};
use thiserror::Error;

pub use atomic::{atomic_write, safe_move};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Handle onto `DATA_DIR`. All paths are derived from this root; the
/// store creates the directory tree (including `history/`) lazily on
/// first write, matching the source's `ensure_dir`/`os.makedirs` calls at
/// point of use rather than eagerly at startup.
#[derive(Debug, Clone)]
pub struct Store {
    data_dir: PathBuf,
}

impl Store {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn queue_path(&self, stage: Stage) -> PathBuf {
        self.data_dir.join(format!("{stage}_queue.json"))
    }

    fn current_path(&self, stage: Stage) -> PathBuf {
        self.data_dir.join(format!("current_{stage}.json"))
    }

    fn archive_path(&self, outcome: Outcome) -> PathBuf {
        self.data_dir.join("history").join(format!("{outcome}.json"))
    }

    fn io_err(path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io { path: path.to_path_buf(), source }
    }

    /// Load a stage's queue. Malformed JSON or a non-array top level is
    /// logged and treated as an empty queue rather than a hard failure —
    /// the source's `load_queue` does the same, trading a data-loss risk
    /// for availability (a corrupt queue file should never prevent the
    /// worker from starting).
    pub fn load_queue(&self, stage: Stage) -> Result<Vec<Item>, StoreError> {
        let path = self.queue_path(stage);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(parse_item_array(&contents, &path)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(Self::io_err(&path, err)),
        }
    }

    pub fn save_queue(&self, stage: Stage, items: &[Item]) -> Result<(), StoreError> {
        let path = self.queue_path(stage);
        let bytes = serde_json::to_vec_pretty(items)?;
        atomic_write(&path, &bytes).map_err(|err| Self::io_err(&path, err))
    }

    /// Load the stage's crash-recovery anchor, if one exists. Presence
    /// means a worker was mid-item when the process last stopped.
    pub fn load_current(&self, stage: Stage) -> Result<Option<Item>, StoreError> {
        let path = self.current_path(stage);
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(item) => Ok(Some(item)),
                Err(err) => {
                    tracing::warn!(?path, %err, "failed to decode current-item JSON; treating as absent");
                    Ok(None)
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Self::io_err(&path, err)),
        }
    }

    pub fn save_current(&self, stage: Stage, item: &Item) -> Result<(), StoreError> {
        let path = self.current_path(stage);
        let bytes = serde_json::to_vec_pretty(item)?;
        atomic_write(&path, &bytes).map_err(|err| Self::io_err(&path, err))
    }

    pub fn clear_current(&self, stage: Stage) -> Result<(), StoreError> {
        let path = self.current_path(stage);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::io_err(&path, err)),
        }
    }

    /// Append `item` to the outcome's archive, creating the file (and the
    /// `history/` directory) on first use. Never overwrites existing
    /// entries except to repair a file whose top level isn't a JSON array.
    pub fn archive_append(&self, outcome: Outcome, item: &Item) -> Result<(), StoreError> {
        let path = self.archive_path(outcome);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| Self::io_err(parent, err))?;
        }

        let mut items = match std::fs::read_to_string(&path) {
            Ok(contents) => parse_item_array(&contents, &path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(Self::io_err(&path, err)),
        };
        items.push(item.clone());

        let bytes = serde_json::to_vec_pretty(&items)?;
        atomic_write(&path, &bytes).map_err(|err| Self::io_err(&path, err))
    }

    /// Read an archive's full contents (used by the ingress `get_item` route).
    pub fn load_archive(&self, outcome: Outcome) -> Result<Vec<Item>, StoreError> {
        let path = self.archive_path(outcome);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(parse_item_array(&contents, &path)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(Self::io_err(&path, err)),
        }
    }
}

fn parse_item_array(contents: &str, path: &Path) -> Vec<Item> {
    match serde_json::from_str::<Vec<Item>>(contents) {
        Ok(items) => items,
        Err(err) => {
            tracing::warn!(?path, %err, "failed to decode JSON array; starting from empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> Item {
        Item::new("Some Creator", "Some Title", "20250101", "https://example/x")
    }

    #[test]
    fn queue_round_trips_as_a_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let items = vec![item(), item()];
        store.save_queue(Stage::Decision, &items).unwrap();
        let loaded = store.load_queue(Stage::Decision).unwrap();
        assert_eq!(loaded, items);
    }

    #[test]
    fn missing_queue_file_is_empty_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        assert_eq!(store.load_queue(Stage::Aging).unwrap(), Vec::new());
    }

    #[test]
    fn malformed_queue_json_becomes_empty_queue() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("decision_queue.json"), b"not json").unwrap();
        let store = Store::new(dir.path());
        assert_eq!(store.load_queue(Stage::Decision).unwrap(), Vec::new());
    }

    #[test]
    fn current_item_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        assert_eq!(store.load_current(Stage::Download).unwrap(), None);

        store.save_current(Stage::Download, &item()).unwrap();
        assert_eq!(store.load_current(Stage::Download).unwrap(), Some(item()));

        store.clear_current(Stage::Download).unwrap();
        assert_eq!(store.load_current(Stage::Download).unwrap(), None);
    }

    #[test]
    fn archive_append_is_append_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        store.archive_append(Outcome::Pass, &item()).unwrap();
        store.archive_append(Outcome::Pass, &item()).unwrap();
        let archived = store.load_archive(Outcome::Pass).unwrap();
        assert_eq!(archived.len(), 2);
    }

    #[test]
    fn archive_append_repairs_non_array_contents() {
        let dir = tempfile::tempdir().unwrap();
        let history = dir.path().join("history");
        std::fs::create_dir_all(&history).unwrap();
        std::fs::write(history.join("pass.json"), b"{\"oops\": true}").unwrap();

        let store = Store::new(dir.path());
        store.archive_append(Outcome::Pass, &item()).unwrap();
        assert_eq!(store.load_archive(Outcome::Pass).unwrap().len(), 1);
    }
}
