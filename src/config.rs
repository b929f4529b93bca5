//! Settings, server paths and the persisted config document.

use crate::error::{Result, StatError};
use crate::preset::PresetTable;
use crate::records::{GenDirs, GenRecordStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Plugin-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Datapack directory prefix and function namespace.
    pub plugin_id: String,
    /// Objective used for single scoreboards.
    pub scoreboard_name: String,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub pack_format: u32,
    pub default_rank_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            plugin_id: "statspro".to_string(),
            scoreboard_name: "StatsPro".to_string(),
            cache_ttl_secs: 30,
            cache_max_entries: 1000,
            pack_format: 4,
            default_rank_limit: 15,
        }
    }
}

impl Settings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Every path the plugin touches, derived from one root directory.
///
/// # Examples
///
/// ```rust
/// use scorecraft::ServerPaths;
/// use std::path::Path;
///
/// let paths = ServerPaths::new("/srv/mc");
/// assert_eq!(paths.stats_dir(), Path::new("/srv/mc/server/world/stats"));
/// assert_eq!(paths.config_file(), Path::new("/srv/mc/config/StatsPro/config.json"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPaths {
    root: PathBuf,
}

impl ServerPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn server_dir(&self) -> PathBuf {
        self.root.join("server")
    }

    pub fn world_dir(&self) -> PathBuf {
        self.server_dir().join("world")
    }

    pub fn stats_dir(&self) -> PathBuf {
        self.world_dir().join("stats")
    }

    pub fn datapacks_dir(&self) -> PathBuf {
        self.world_dir().join("datapacks")
    }

    pub fn usercache_file(&self) -> PathBuf {
        self.server_dir().join("usercache.json")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config").join("StatsPro")
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join("config.json")
    }

    pub fn uuid_file(&self) -> PathBuf {
        self.config_dir().join("uuid.json")
    }

    /// Snapshot storage: `config/StatsPro/{sum,record,minus}`.
    pub fn gen_dirs(&self) -> GenDirs {
        GenDirs::new(self.config_dir())
    }

    /// Stats file of the player with `uuid`.
    pub fn player_file(&self, uuid: &str) -> PathBuf {
        self.stats_dir().join(format!("{}.json", uuid))
    }
}

/// Players to fold into one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub input: Vec<String>,
    pub output: String,
}

impl MergeConfig {
    /// Add an input player. Returns `false` if already listed.
    pub fn add_input(&mut self, player: &str) -> bool {
        if self.input.iter().any(|p| p == player) {
            return false;
        }
        self.input.push(player.to_string());
        true
    }

    pub fn remove_input(&mut self, player: &str) -> bool {
        let before = self.input.len();
        self.input.retain(|p| p != player);
        self.input.len() != before
    }

    pub fn clear_inputs(&mut self) {
        self.input.clear();
    }

    pub fn set_output(&mut self, player: &str) {
        self.output = player.to_string();
    }

    pub fn is_valid(&self) -> bool {
        !self.input.is_empty() && !self.output.is_empty()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.input.is_empty() {
            return Err(StatError::InvalidMergeConfig("no input players".to_string()));
        }
        if self.output.is_empty() {
            return Err(StatError::InvalidMergeConfig("no output player".to_string()));
        }
        Ok(())
    }
}

/// The persisted document: presets, snapshot metadata and merge setup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub presuppositions: PresetTable,
    pub gen_list: GenRecordStore,
    pub merge_list: MergeConfig,
}

impl ConfigFile {
    /// Load from `path`. A missing file gives defaults; an unreadable or
    /// malformed one is logged and also gives defaults.
    pub fn load(path: &Path) -> Self {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                tracing::warn!("Failed to read config {}: {}, using defaults", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_slice::<ConfigFile>(&bytes) {
            Ok(mut config) => {
                if let Err(e) = config.presuppositions.refresh_all() {
                    tracing::warn!("Could not abbreviate loaded presets: {}", e);
                }
                config
            }
            Err(e) => {
                tracing::warn!("Failed to parse config {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Write as pretty JSON through a temporary sibling file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self).map_err(|e| StatError::json(path, e))?;
        crate::fs::write_atomic(path, &bytes)
    }
}
