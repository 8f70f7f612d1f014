//! Immutable webhook event archive.
//!
//! One JSON artifact per unique event id, written once and never
//! mutated. Filenames are `<sortable-utc-timestamp>__<event-id>.json`,
//! so a directory listing sorts chronologically and the id component can
//! be recovered exactly. Lookups key on the exact event id — never a
//! substring match — and the in-process check-then-write sequence is
//! serialized by a mutex. Two processes sharing the directory can still
//! both archive the first delivery of one event: ingestion is at-most-
//! once per process, not exactly-once across processes.

use crate::errors::PrintgateError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Filename separator between the timestamp and the event id.
const NAME_SEPARATOR: &str = "__";

/// Everything recorded about one webhook delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    /// When the delivery was received.
    pub received_at: DateTime<Utc>,
    /// Derived, sanitized event id.
    pub event_id: String,
    /// Raw signature header value, when present.
    pub signature: Option<String>,
    /// Whether the signature was cryptographically verified.
    pub signature_validated: bool,
    /// Request headers (lowercased names).
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON payload, or the raw body as a string when unparseable.
    pub payload: serde_json::Value,
}

/// Outcome of an archive insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// First sight of this event id; the artifact was written here.
    Created(PathBuf),
    /// The event id was already archived at this path.
    Duplicate(PathBuf),
}

/// Filesystem-backed event archive.
pub struct EventArchive {
    dir: PathBuf,
    insert_lock: Mutex<()>,
}

impl EventArchive {
    /// Open (creating if needed) the default archive under
    /// `dirs::data_dir()/<namespace>/`.
    pub fn new(namespace: &str) -> Result<Self, PrintgateError> {
        let base = dirs::data_dir().ok_or_else(|| {
            PrintgateError::ArchiveIO("could not find a data directory".to_string())
        })?;
        Self::at_dir(base.join(namespace))
    }

    /// Open (creating if needed) an archive at a specific directory.
    pub fn at_dir(dir: PathBuf) -> Result<Self, PrintgateError> {
        fs::create_dir_all(&dir).map_err(|e| {
            PrintgateError::ArchiveIO(format!("failed to create archive dir: {e}"))
        })?;
        Ok(Self {
            dir,
            insert_lock: Mutex::new(()),
        })
    }

    /// The archive directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Find the artifact for an event id by exact match on the id
    /// component of each filename.
    pub fn find(&self, event_id: &str) -> Result<Option<PathBuf>, PrintgateError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            PrintgateError::ArchiveIO(format!("failed to read archive dir: {e}"))
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| {
                PrintgateError::ArchiveIO(format!("failed to read archive entry: {e}"))
            })?;
            let path = entry.path();
            let matches = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(event_id_of)
                .is_some_and(|id| id == event_id);
            if matches {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Archive an entry exactly once per event id within this process.
    ///
    /// Redelivery returns `Duplicate` with the original artifact path
    /// and writes nothing.
    pub fn insert(&self, entry: &ArchiveEntry) -> Result<InsertOutcome, PrintgateError> {
        // Serialize check-then-write so concurrent in-process deliveries
        // of one event cannot both pass the "not found" check.
        let guard = match self.insert_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(existing) = self.find(&entry.event_id)? {
            return Ok(InsertOutcome::Duplicate(existing));
        }

        let file_name = artifact_name(entry.received_at, &entry.event_id);
        let target = self.dir.join(&file_name);
        let temp = self.dir.join(format!("{file_name}.tmp"));

        let json = serde_json::to_string_pretty(entry).map_err(|e| {
            PrintgateError::ArchiveIO(format!("failed to serialize archive entry: {e}"))
        })?;

        // Temp file + rename so a crash never leaves a half-written
        // artifact under the final name.
        fs::write(&temp, &json).map_err(|e| {
            PrintgateError::ArchiveIO(format!("failed to write archive temp file: {e}"))
        })?;
        fs::rename(&temp, &target).map_err(|e| {
            PrintgateError::ArchiveIO(format!("failed to rename archive file: {e}"))
        })?;

        drop(guard);
        Ok(InsertOutcome::Created(target))
    }

    /// Load an archived entry back (diagnostics and tests).
    pub fn load(&self, path: &Path) -> Result<ArchiveEntry, PrintgateError> {
        let json = fs::read_to_string(path).map_err(|e| {
            PrintgateError::ArchiveIO(format!("failed to read archive file: {e}"))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            PrintgateError::ArchiveIO(format!("failed to parse archive file: {e}"))
        })
    }
}

/// Build the artifact filename for an entry.
fn artifact_name(received_at: DateTime<Utc>, event_id: &str) -> String {
    format!(
        "{}{}{}.json",
        received_at.format("%Y%m%dT%H%M%S%3fZ"),
        NAME_SEPARATOR,
        event_id
    )
}

/// Recover the event id component from an artifact filename.
fn event_id_of(file_name: &str) -> Option<&str> {
    let stem = file_name.strip_suffix(".json")?;
    let (_, id) = stem.split_once(NAME_SEPARATOR)?;
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn entry(event_id: &str) -> ArchiveEntry {
        ArchiveEntry {
            received_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
            event_id: event_id.to_string(),
            signature: Some("abc".to_string()),
            signature_validated: true,
            headers: BTreeMap::from([(
                "content-type".to_string(),
                "application/json".to_string(),
            )]),
            payload: serde_json::json!({"type": "package_shipped"}),
        }
    }

    #[test]
    fn first_insert_creates_one_artifact() {
        let dir = TempDir::new().unwrap();
        let archive = EventArchive::at_dir(dir.path().to_path_buf()).unwrap();

        let outcome = archive.insert(&entry("evt_sample")).unwrap();
        let path = match outcome {
            InsertOutcome::Created(path) => path,
            other => panic!("expected Created, got {other:?}"),
        };
        assert!(path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn redelivery_is_a_duplicate_with_the_original_path() {
        let dir = TempDir::new().unwrap();
        let archive = EventArchive::at_dir(dir.path().to_path_buf()).unwrap();

        let first = archive.insert(&entry("evt_sample")).unwrap();
        let original = match first {
            InsertOutcome::Created(path) => path,
            other => panic!("expected Created, got {other:?}"),
        };

        let mut redelivered = entry("evt_sample");
        redelivered.received_at = Utc.with_ymd_and_hms(2025, 6, 1, 9, 5, 0).unwrap();
        let second = archive.insert(&redelivered).unwrap();
        assert_eq!(second, InsertOutcome::Duplicate(original));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn dedup_keys_exactly_not_by_substring() {
        let dir = TempDir::new().unwrap();
        let archive = EventArchive::at_dir(dir.path().to_path_buf()).unwrap();

        // "evt_1" is a substring of "evt_12" in both directions of risk.
        archive.insert(&entry("evt_12")).unwrap();
        let outcome = archive.insert(&entry("evt_1")).unwrap();
        assert!(matches!(outcome, InsertOutcome::Created(_)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
        assert!(archive.find("evt_1").unwrap().is_some());
        assert!(archive.find("evt_12").unwrap().is_some());
    }

    #[test]
    fn artifact_roundtrips() {
        let dir = TempDir::new().unwrap();
        let archive = EventArchive::at_dir(dir.path().to_path_buf()).unwrap();

        let original = entry("evt_roundtrip");
        let outcome = archive.insert(&original).unwrap();
        let path = match outcome {
            InsertOutcome::Created(path) => path,
            other => panic!("expected Created, got {other:?}"),
        };
        assert_eq!(archive.load(&path).unwrap(), original);
    }

    #[test]
    fn filename_embeds_sortable_timestamp_and_id() {
        let name = artifact_name(
            Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
            "evt_sample",
        );
        assert_eq!(name, "20250601T090000000Z__evt_sample.json");
        assert_eq!(event_id_of(&name), Some("evt_sample"));
    }

    #[test]
    fn ids_containing_the_separator_still_parse_exactly() {
        // The timestamp component never contains "__", so the first
        // split is always correct even for pathological ids.
        let name = artifact_name(
            Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
            "a__b",
        );
        assert_eq!(event_id_of(&name), Some("a__b"));
    }

    #[test]
    fn find_on_missing_id_is_none() {
        let dir = TempDir::new().unwrap();
        let archive = EventArchive::at_dir(dir.path().to_path_buf()).unwrap();
        assert!(archive.find("evt_missing").unwrap().is_none());
    }
}
