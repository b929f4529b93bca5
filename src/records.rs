//! Generated snapshots ("gen records") and their metadata.
//!
//! Three kinds exist:
//!
//! - `sum`: one JSON file holding the merged stats of many players
//! - `record`: a copy of the whole stats directory
//! - `minus`: the difference between two snapshots of the same kind
//!
//! Snapshot ids are local timestamps (`%Y-%m-%d-%H-%M-%S`); listing keeps
//! insertion order within each kind.

use crate::error::{Result, StatError};
use crate::tree::{StatTree, StatsFile};
use chrono::Local;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Format of snapshot ids.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// The kind of a generated snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenKind {
    Sum,
    Record,
    Minus,
}

impl GenKind {
    pub const ALL: [GenKind; 3] = [GenKind::Sum, GenKind::Record, GenKind::Minus];

    pub fn as_str(self) -> &'static str {
        match self {
            GenKind::Sum => "sum",
            GenKind::Record => "record",
            GenKind::Minus => "minus",
        }
    }

    pub fn parse(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == kind)
    }
}

impl fmt::Display for GenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenRecord {
    pub time: String,
    pub name: String,
    #[serde(default)]
    pub note: Option<String>,
    pub path: String,
    pub abs_path: String,
}

impl GenRecord {
    fn at(time: &str, name: &str, note: Option<String>, path: &Path) -> Self {
        let abs = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        Self {
            time: time.to_string(),
            name: name.to_string(),
            note,
            path: slash_path(path),
            abs_path: slash_path(&abs),
        }
    }

    pub fn storage(&self) -> &Path {
        Path::new(&self.abs_path)
    }
}

fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Where snapshots of each kind are stored: `{root}/{kind}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenDirs {
    root: PathBuf,
}

impl GenDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn dir(&self, kind: GenKind) -> PathBuf {
        self.root.join(kind.as_str())
    }
}

/// What to snapshot.
#[derive(Debug, Clone, Copy)]
pub enum GenPayload<'a> {
    /// An already merged stats file.
    Sum(&'a StatsFile),
    /// A stats directory to copy.
    Record(&'a Path),
}

impl GenPayload<'_> {
    pub fn kind(&self) -> GenKind {
        match self {
            GenPayload::Sum(_) => GenKind::Sum,
            GenPayload::Record(_) => GenKind::Record,
        }
    }
}

type Entries = Vec<(String, GenRecord)>;

/// Snapshot metadata for every kind, persisted as
/// `{"sum": {id: record}, "record": {...}, "minus": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenRecordStore {
    records: BTreeMap<GenKind, Entries>,
}

impl GenRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: GenKind, id: &str) -> Option<&GenRecord> {
        self.records
            .get(&kind)?
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, record)| record)
    }

    /// Locate an id in any kind.
    pub fn find(&self, id: &str) -> Option<(GenKind, &GenRecord)> {
        GenKind::ALL
            .into_iter()
            .find_map(|kind| self.get(kind, id).map(|record| (kind, record)))
    }

    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records of one kind (or every kind with `None`), in insertion order.
    pub fn list(&self, kind: Option<GenKind>) -> Vec<(GenKind, &str, &GenRecord)> {
        let kinds: Vec<GenKind> = match kind {
            Some(kind) => vec![kind],
            None => GenKind::ALL.to_vec(),
        };
        kinds
            .into_iter()
            .flat_map(|kind| {
                self.records
                    .get(&kind)
                    .into_iter()
                    .flatten()
                    .map(move |(id, record)| (kind, id.as_str(), record))
            })
            .collect()
    }

    fn push(&mut self, kind: GenKind, record: GenRecord) {
        self.records
            .entry(kind)
            .or_default()
            .push((record.time.clone(), record));
    }

    /// `base`, or `base-1`, `base-2`, ... if that id is taken for `kind`.
    fn unique_time(&self, kind: GenKind, base: String) -> String {
        if self.get(kind, &base).is_none() {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}-{}", base, n);
            if self.get(kind, &candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    fn next_time(&self, kind: GenKind) -> String {
        self.unique_time(kind, Local::now().format(TIMESTAMP_FORMAT).to_string())
    }

    /// Take a snapshot and record it.
    ///
    /// A sum is written to `sum/{time}#{note}.json`; a record copies the
    /// stats directory to `record/{time}#{note}` (without `#{note}` when
    /// no note is given). Existing storage at that path is replaced.
    pub fn create(
        &mut self,
        dirs: &GenDirs,
        payload: GenPayload<'_>,
        note: Option<&str>,
    ) -> Result<GenRecord> {
        let kind = payload.kind();
        let time = self.next_time(kind);
        let note = note.filter(|n| !n.is_empty()).map(str::to_string);
        let name = match &note {
            Some(note) => format!("{}#{}", time, note),
            None => time.clone(),
        };

        let record = match payload {
            GenPayload::Sum(file) => {
                let path = dirs.dir(kind).join(format!("{}.json", name));
                file.write_to(&path)?;
                GenRecord::at(&time, &name, note, &path)
            }
            GenPayload::Record(stats_dir) => {
                let path = dirs.dir(kind).join(&name);
                crate::fs::remove_path(&path)?;
                let copied = crate::fs::copy_dir(stats_dir, &path)?;
                tracing::debug!("Copied {} stats files into {}", copied, path.display());
                GenRecord::at(&time, &name, note, &path)
            }
        };

        tracing::info!("Created {} snapshot {}", kind, record.name);
        self.push(kind, record.clone());
        Ok(record)
    }

    /// Diff two snapshots of `kind` into a new `minus` snapshot.
    ///
    /// Returns `Ok(None)` when either id is unknown.
    ///
    /// # Errors
    ///
    /// [`StatError::InvalidGenKind`] for `minus` (diffs are not diffed
    /// again); I/O and JSON failures while reading or writing storage.
    pub fn diff(
        &mut self,
        dirs: &GenDirs,
        kind: GenKind,
        first: &str,
        second: &str,
    ) -> Result<Option<GenRecord>> {
        if kind == GenKind::Minus {
            return Err(StatError::InvalidGenKind {
                operation: "diff".to_string(),
                kind: kind.to_string(),
            });
        }
        let (Some(a), Some(b)) = (self.get(kind, first), self.get(kind, second)) else {
            return Ok(None);
        };
        let (a, b) = (a.clone(), b.clone());
        self.diff_records(dirs, kind, &a, &b).map(Some)
    }

    /// Diff two snapshots by id alone, whatever their kind.
    ///
    /// # Errors
    ///
    /// [`StatError::RecordKindMismatch`] when the ids belong to different
    /// kinds, plus everything [`GenRecordStore::diff`] reports.
    pub fn diff_ids(&mut self, dirs: &GenDirs, first: &str, second: &str) -> Result<Option<GenRecord>> {
        let (Some((first_kind, _)), Some((second_kind, _))) = (self.find(first), self.find(second)) else {
            return Ok(None);
        };
        if first_kind != second_kind {
            return Err(StatError::RecordKindMismatch {
                first: first_kind.to_string(),
                second: second_kind.to_string(),
            });
        }
        self.diff(dirs, first_kind, first, second)
    }

    fn diff_records(
        &mut self,
        dirs: &GenDirs,
        kind: GenKind,
        first: &GenRecord,
        second: &GenRecord,
    ) -> Result<GenRecord> {
        let time = self.next_time(GenKind::Minus);
        let note = Some(format!("{} - {}", first.time, second.time));
        let out_dir = dirs.dir(GenKind::Minus);

        let path = match kind {
            GenKind::Sum => {
                let a = StatsFile::from_path(first.storage())?;
                let b = StatsFile::from_path(second.storage())?;
                let path = out_dir.join(format!("{}.json", time));
                StatsFile::new(StatTree::diff(&a.stats, &b.stats)).write_to(&path)?;
                path
            }
            _ => {
                let path = out_dir.join(&time);
                let written = diff_folders(first.storage(), second.storage(), &path)?;
                tracing::debug!("Wrote {} per-player diffs into {}", written, path.display());
                path
            }
        };

        let record = GenRecord::at(&time, &time, note, &path);
        tracing::info!("Created minus snapshot {} from {} {}", time, kind, record.note.as_deref().unwrap_or(""));
        self.push(GenKind::Minus, record.clone());
        Ok(record)
    }

    /// Delete snapshots and their storage.
    ///
    /// `kind: None` covers every kind, `id: None` every id of the kind(s).
    /// Storage that is already gone is logged and the metadata is dropped
    /// anyway; any other failure stops the deletion with that record kept.
    pub fn delete(&mut self, kind: Option<GenKind>, id: Option<&str>) -> Result<Vec<GenRecord>> {
        let targets: Vec<(GenKind, String)> = self
            .list(kind)
            .into_iter()
            .filter(|(_, key, _)| id.map_or(true, |id| id == *key))
            .map(|(kind, key, _)| (kind, key.to_string()))
            .collect();

        let mut deleted = Vec::new();
        for (kind, key) in targets {
            let Some(record) = self.get(kind, &key).cloned() else {
                continue;
            };
            if !crate::fs::remove_path(record.storage())? {
                tracing::warn!(
                    "Storage of {} snapshot {} was already missing: {}",
                    kind,
                    key,
                    record.abs_path
                );
            }
            if let Some(entries) = self.records.get_mut(&kind) {
                entries.retain(|(k, _)| *k != key);
                if entries.is_empty() {
                    self.records.remove(&kind);
                }
            }
            deleted.push(record);
        }
        Ok(deleted)
    }
}

/// Write `{"stats": diff}` for every stats file in either folder whose
/// diff is non-empty. Returns the number of files written.
fn diff_folders(first: &Path, second: &Path, out: &Path) -> Result<usize> {
    std::fs::create_dir_all(out).map_err(|e| StatError::io(out, e))?;

    let names: BTreeSet<String> = crate::fs::json_file_names(first)?
        .into_iter()
        .chain(crate::fs::json_file_names(second)?)
        .collect();

    let mut written = 0;
    for name in names {
        let (Some(a), Some(b)) = (read_side(&first.join(&name)), read_side(&second.join(&name))) else {
            continue;
        };
        let diff = StatTree::diff(&a.stats, &b.stats);
        if diff.is_empty() {
            continue;
        }
        StatsFile::new(diff).write_to(&out.join(&name))?;
        written += 1;
    }
    Ok(written)
}

/// A missing side reads as empty; a malformed one skips the file.
fn read_side(path: &Path) -> Option<StatsFile> {
    if !path.exists() {
        return Some(StatsFile::default());
    }
    match StatsFile::from_path(path) {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::warn!("Skipping unreadable stats file: {}", e);
            None
        }
    }
}

struct KindEntries<'a>(&'a [(String, GenRecord)]);

impl Serialize for KindEntries<'_> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(self.0.iter().map(|(id, record)| (id, record)))
    }
}

impl Serialize for GenRecordStore {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(GenKind::ALL.len()))?;
        for kind in GenKind::ALL {
            let entries = self.records.get(&kind).map(Vec::as_slice).unwrap_or(&[]);
            map.serialize_entry(kind.as_str(), &KindEntries(entries))?;
        }
        map.end()
    }
}

/// Deserializes a JSON object into entries, keeping document order.
struct OrderedEntries(Entries);

impl<'de> Deserialize<'de> for OrderedEntries {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = OrderedEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of snapshot ids to records")
            }

            fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some((id, record)) = access.next_entry::<String, GenRecord>()? {
                    entries.push((id, record));
                }
                Ok(OrderedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

impl<'de> Deserialize<'de> for GenRecordStore {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<GenKind, OrderedEntries>::deserialize(deserializer)?;
        Ok(Self {
            records: raw
                .into_iter()
                .filter(|(_, entries)| !entries.0.is_empty())
                .map(|(kind, entries)| (kind, entries.0))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sum_file(value: u64) -> StatsFile {
        let mut tree = StatTree::new();
        tree.insert("mined", "stone", value);
        StatsFile::new(tree)
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(GenKind::parse("record"), Some(GenKind::Record));
        assert_eq!(GenKind::parse("all"), None);
    }

    #[test]
    fn test_create_sum_with_note() {
        let dir = TempDir::new().unwrap();
        let dirs = GenDirs::new(dir.path());
        let mut store = GenRecordStore::new();

        let record = store
            .create(&dirs, GenPayload::Sum(&sum_file(5)), Some("weekly"))
            .unwrap();
        assert_eq!(record.name, format!("{}#weekly", record.time));
        assert_eq!(record.note.as_deref(), Some("weekly"));
        assert!(record.path.ends_with(&format!("sum/{}#weekly.json", record.time)));

        let written = StatsFile::from_path(record.storage()).unwrap();
        assert_eq!(written.stats.get("mined", "stone"), Some(5));
    }

    #[test]
    fn test_same_second_ids_are_suffixed() {
        let mut store = GenRecordStore::new();
        let base = "2024-01-01-00-00-00".to_string();
        let record = bare(&base);
        store.push(GenKind::Sum, record);
        assert_eq!(store.unique_time(GenKind::Sum, base.clone()), format!("{}-1", base));
        assert_eq!(store.unique_time(GenKind::Record, base.clone()), base);
    }

    #[test]
    fn test_diff_self_is_empty_and_delete_removes() {
        let dir = TempDir::new().unwrap();
        let dirs = GenDirs::new(dir.path());
        let mut store = GenRecordStore::new();

        let record = store.create(&dirs, GenPayload::Sum(&sum_file(5)), None).unwrap();
        let minus = store
            .diff(&dirs, GenKind::Sum, &record.time, &record.time)
            .unwrap()
            .unwrap();
        assert_eq!(minus.note, Some(format!("{} - {}", record.time, record.time)));
        assert!(StatsFile::from_path(minus.storage()).unwrap().stats.is_empty());

        let deleted = store.delete(Some(GenKind::Sum), Some(&record.time)).unwrap();
        assert_eq!(deleted.len(), 1);
        assert!(store.get(GenKind::Sum, &record.time).is_none());
        assert!(!record.storage().exists());
        assert_eq!(store.list(None).len(), 1);
    }

    #[test]
    fn test_diff_unknown_and_invalid() {
        let dir = TempDir::new().unwrap();
        let dirs = GenDirs::new(dir.path());
        let mut store = GenRecordStore::new();
        assert!(store.diff(&dirs, GenKind::Sum, "a", "b").unwrap().is_none());
        let err = store.diff(&dirs, GenKind::Minus, "a", "b").unwrap_err();
        assert_eq!(err.code(), "invalid_gen_kind");
    }

    fn bare(time: &str) -> GenRecord {
        GenRecord {
            time: time.to_string(),
            name: time.to_string(),
            note: None,
            path: String::new(),
            abs_path: String::new(),
        }
    }

    #[test]
    fn test_diff_ids_rejects_mixed_kinds() {
        let dir = TempDir::new().unwrap();
        let dirs = GenDirs::new(dir.path());
        let mut store = GenRecordStore::new();
        store.push(GenKind::Sum, bare("a"));
        store.push(GenKind::Record, bare("b"));

        let err = store.diff_ids(&dirs, "a", "b").unwrap_err();
        assert_eq!(err.code(), "record_kind_mismatch");
        assert!(store.diff_ids(&dirs, "a", "missing").unwrap().is_none());
    }

    #[test]
    fn test_record_folder_diff() {
        let dir = TempDir::new().unwrap();
        let dirs = GenDirs::new(dir.path().join("gen"));
        let stats = dir.path().join("stats");
        std::fs::create_dir_all(&stats).unwrap();
        sum_file(5).write_to(&stats.join("alice.json")).unwrap();
        sum_file(1).write_to(&stats.join("bob.json")).unwrap();

        let mut store = GenRecordStore::new();
        let before = store.create(&dirs, GenPayload::Record(&stats), Some("before")).unwrap();

        sum_file(9).write_to(&stats.join("alice.json")).unwrap();
        sum_file(2).write_to(&stats.join("carol.json")).unwrap();
        let after = store.create(&dirs, GenPayload::Record(&stats), Some("after")).unwrap();

        let (a, b) = (before.clone(), after.clone());
        let minus = store.diff_records(&dirs, GenKind::Record, &a, &b).unwrap();
        let out = minus.storage();
        assert_eq!(
            StatsFile::from_path(&out.join("alice.json")).unwrap().stats.get("mined", "stone"),
            Some(4)
        );
        assert_eq!(
            StatsFile::from_path(&out.join("carol.json")).unwrap().stats.get("mined", "stone"),
            Some(2)
        );
        // unchanged player produces no file
        assert!(!out.join("bob.json").exists());
    }

    #[test]
    fn test_delete_tolerates_missing_storage() {
        let dir = TempDir::new().unwrap();
        let dirs = GenDirs::new(dir.path());
        let mut store = GenRecordStore::new();
        let record = store.create(&dirs, GenPayload::Sum(&sum_file(1)), None).unwrap();
        std::fs::remove_file(record.storage()).unwrap();

        let deleted = store.delete(None, None).unwrap();
        assert_eq!(deleted.len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_json_keeps_insertion_order() {
        let json = r#"{
            "sum": {
                "2024-05-01-00-00-00": {"time": "2024-05-01-00-00-00", "name": "b", "path": "p", "abs_path": "p"},
                "2024-01-01-00-00-00": {"time": "2024-01-01-00-00-00", "name": "a", "note": "x", "path": "p", "abs_path": "p"}
            },
            "minus": {}
        }"#;
        let store: GenRecordStore = serde_json::from_str(json).unwrap();
        let ids: Vec<&str> = store.list(Some(GenKind::Sum)).into_iter().map(|(_, id, _)| id).collect();
        assert_eq!(ids, vec!["2024-05-01-00-00-00", "2024-01-01-00-00-00"]);

        let value = serde_json::to_value(&store).unwrap();
        assert!(value["record"].as_object().unwrap().is_empty());
        assert_eq!(value["sum"]["2024-01-01-00-00-00"]["note"], "x");
    }
}
