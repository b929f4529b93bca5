//! Player identities and per-player statistics records.
//!
//! A `PlayerRecord` is loaded from `stats/<uuid>.json` and replaced
//! wholesale on every reload. `UuidMapping` resolves display names to the
//! stable ids that name those files.

use crate::error::{Result, StatError};
use crate::tree::{StatTree, StatsFile};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// One player's identity plus their statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub name: String,
    pub uuid: String,
    pub file: StatsFile,
}

impl PlayerRecord {
    pub fn new(name: impl Into<String>, uuid: impl Into<String>, file: StatsFile) -> Self {
        Self {
            name: name.into(),
            uuid: uuid.into(),
            file,
        }
    }

    /// Load a record from its statistics file.
    pub fn load(path: &Path, name: &str, uuid: &str) -> Result<Self> {
        let file = StatsFile::from_path(path)?;
        Ok(Self::new(name, uuid, file))
    }

    pub fn stats(&self) -> &StatTree {
        &self.file.stats
    }

    pub fn data_version(&self) -> Option<u32> {
        self.file.data_version
    }
}

#[derive(Deserialize)]
struct UsercacheEntry {
    name: String,
    uuid: String,
}

/// Bidirectional name ↔ uuid lookup, persisted as `{name: uuid}`.
///
/// # Examples
///
/// ```rust
/// use scorecraft::UuidMapping;
///
/// let mut mapping = UuidMapping::default();
/// mapping.insert("Alice", "0f2c-aaaa");
///
/// assert_eq!(mapping.uuid("Alice"), Some("0f2c-aaaa"));
/// assert_eq!(mapping.name_of("0f2c-aaaa"), Some("Alice"));
/// assert_eq!(mapping.resolve("0f2c-aaaa"), "Alice");
/// assert_eq!(mapping.resolve("Bob"), "Bob");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UuidMapping {
    by_name: BTreeMap<String, String>,
}

impl UuidMapping {
    /// Load `{name: uuid}` from `path`. Missing or malformed files yield an
    /// empty mapping.
    pub fn load(path: &Path) -> Self {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!("Failed to read uuid mapping {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(by_name) => Self { by_name },
            Err(e) => {
                tracing::warn!("Ignoring malformed uuid mapping {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Build a mapping from the server's `usercache.json` and the files in
    /// the stats directory.
    ///
    /// Every `<uuid>.json` in `stats_dir` gets an entry; uuids the
    /// usercache does not know are named by their first eight hex digits.
    pub fn from_usercache(usercache: &Path, stats_dir: &Path) -> Result<Self> {
        let mut names_by_uuid = BTreeMap::new();
        match std::fs::read(usercache) {
            Ok(bytes) => match serde_json::from_slice::<Vec<UsercacheEntry>>(&bytes) {
                Ok(entries) => {
                    for entry in entries {
                        names_by_uuid.insert(entry.uuid, entry.name);
                    }
                }
                Err(e) => {
                    tracing::warn!("Ignoring malformed usercache {}: {}", usercache.display(), e)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StatError::io(usercache, e)),
        }

        let mut mapping = Self::default();
        for file_name in crate::fs::json_file_names(stats_dir)? {
            let uuid = file_name.trim_end_matches(".json");
            let name = match names_by_uuid.get(uuid) {
                Some(name) => name.clone(),
                None => uuid.replace('-', "").chars().take(8).collect(),
            };
            mapping.insert(name, uuid);
        }
        Ok(mapping)
    }

    /// Persist the mapping as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.by_name).map_err(|e| StatError::json(path, e))?;
        crate::fs::write_atomic(path, &bytes)
    }

    pub fn insert(&mut self, name: impl Into<String>, uuid: impl Into<String>) {
        self.by_name.insert(name.into(), uuid.into());
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn uuid(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    pub fn name_of(&self, uuid: &str) -> Option<&str> {
        self.by_name
            .iter()
            .find(|(_, id)| id.as_str() == uuid)
            .map(|(name, _)| name.as_str())
    }

    /// Turn a name or a uuid into a display name; unknown identifiers are
    /// returned unchanged.
    pub fn resolve(&self, identifier: &str) -> String {
        if self.by_name.contains_key(identifier) {
            return identifier.to_string();
        }
        self.name_of(identifier)
            .map(str::to_string)
            .unwrap_or_else(|| identifier.to_string())
    }

    /// `(name, uuid)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_name
            .iter()
            .map(|(name, uuid)| (name.as_str(), uuid.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_and_malformed() {
        let dir = TempDir::new().unwrap();
        assert!(UuidMapping::load(&dir.path().join("uuid.json")).is_empty());

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(UuidMapping::load(&path).is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uuid.json");
        let mut mapping = UuidMapping::default();
        mapping.insert("Alice", "uuid-a");
        mapping.save(&path).unwrap();
        assert_eq!(UuidMapping::load(&path), mapping);
    }

    #[test]
    fn test_from_usercache_names_unknown_uuids() {
        let dir = TempDir::new().unwrap();
        let stats = dir.path().join("stats");
        std::fs::create_dir_all(&stats).unwrap();
        std::fs::write(stats.join("11111111-2222-3333-4444-555555555555.json"), "{}").unwrap();
        std::fs::write(stats.join("aaaa-bbbb-cccc.json"), "{}").unwrap();

        let usercache = dir.path().join("usercache.json");
        std::fs::write(
            &usercache,
            r#"[{"name": "Alice", "uuid": "aaaa-bbbb-cccc", "expiresOn": "2030-01-01"}]"#,
        )
        .unwrap();

        let mapping = UuidMapping::from_usercache(&usercache, &stats).unwrap();
        assert_eq!(mapping.uuid("Alice"), Some("aaaa-bbbb-cccc"));
        assert_eq!(
            mapping.uuid("11111111"),
            Some("11111111-2222-3333-4444-555555555555")
        );
    }

    #[test]
    fn test_record_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("u.json");
        std::fs::write(&path, r#"{"stats": {"minecraft:mined": {"minecraft:stone": 3}}, "DataVersion": 2586}"#)
            .unwrap();
        let record = PlayerRecord::load(&path, "Alice", "u").unwrap();
        assert_eq!(record.stats().get("mined", "stone"), Some(3));
        assert_eq!(record.data_version(), Some(2586));
    }
}
