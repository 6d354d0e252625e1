//! Last processed post id per account, persisted as a flat JSON object.
use pressbox_common::{PressboxError, Result};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Order two post ids.
///
/// Ids are snowflakes, so numeric order is chronological. Ids that are not
/// plain integers fall back to length, then lexicographic order.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
    }
}

/// True when `candidate` is strictly newer than `current`.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare_ids(candidate, current) == Ordering::Greater
}

#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    dirty: bool,
}

impl CheckpointStore {
    /// An empty store that will be written to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Read the store from `path`. A missing file is an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "checkpoint.missing");
                return Ok(Self::empty(path));
            }
            Err(err) => {
                return Err(PressboxError::Checkpoint(format!(
                    "read {}: {err}",
                    path.display()
                )));
            }
        };

        let entries: BTreeMap<String, String> = if raw.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&raw).map_err(|e| {
                PressboxError::Checkpoint(format!("parse {}: {e}", path.display()))
            })?
        };

        debug!(path = %path.display(), accounts = entries.len(), "checkpoint.loaded");
        Ok(Self {
            path,
            entries,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, account: &str) -> Option<&str> {
        self.entries.get(account).map(String::as_str)
    }

    /// Record `id` for `account` if it is newer than the stored one.
    ///
    /// Returns whether the stored id changed.
    pub fn advance(&mut self, account: &str, id: &str) -> bool {
        match self.entries.get(account) {
            Some(current) if !is_newer(id, current) => false,
            _ => {
                self.entries.insert(account.to_string(), id.to_string());
                self.dirty = true;
                true
            }
        }
    }

    /// Whether anything changed since the store was loaded or last saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Write the store if it changed. The file is replaced atomically.
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            debug!(path = %self.path.display(), "checkpoint.unchanged");
            return Ok(());
        }

        let fail = |what: &str, e: &dyn std::fmt::Display| {
            PressboxError::Checkpoint(format!("{what} {}: {e}", self.path.display()))
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| fail("create parent of", &e))?;
        }

        let body = serde_json::to_string_pretty(&self.entries).map_err(|e| fail("encode", &e))?;
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "checkpoint".to_string());
        let tmp = self.path.with_file_name(format!(".{file_name}.tmp"));

        fs::write(&tmp, body + "\n").map_err(|e| fail("write", &e))?;
        fs::rename(&tmp, &self.path).map_err(|e| fail("replace", &e))?;

        info!(path = %self.path.display(), accounts = self.entries.len(), "checkpoint.saved");
        self.dirty = false;
        Ok(())
    }
}
