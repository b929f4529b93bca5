//! Datapack packaging for sum scoreboards.
//!
//! Each preset gets its own pack, `datapacks/{plugin}_{preset}`:
//!
//! ```text
//! pack.mcmeta
//! data/{plugin}/{folder}/{preset}_tick.mcfunction
//! data/minecraft/tags/{folder}/tick.json
//! ```
//!
//! `{folder}` is `functions` or `function` depending on the detected
//! format version. The function id is keyed by preset so several enabled
//! packs never shadow each other's `{plugin}:{preset}_tick`; the shared
//! `minecraft:tick` tag is merged by the game. Writing replaces the whole pack; the new tree is built
//! next to the old one and swapped in.

use crate::error::{Result, StatError};
use crate::version::FormatVersion;
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

const TICK_TAG: &str = "tick";

/// Relative file locations inside one pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatapackLayout {
    pub plugin_id: String,
    /// `{preset}_tick`, lower-cased to stay a valid resource path.
    pub function_name: String,
    pub function_folder: &'static str,
}

impl DatapackLayout {
    pub fn new(plugin_id: &str, preset_id: &str, version: FormatVersion) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            function_name: format!("{}_{}", preset_id.to_lowercase(), TICK_TAG),
            function_folder: version.function_folder(),
        }
    }

    pub fn function_file(&self) -> PathBuf {
        Path::new("data")
            .join(&self.plugin_id)
            .join(self.function_folder)
            .join(format!("{}.mcfunction", self.function_name))
    }

    pub fn tag_file(&self) -> PathBuf {
        Path::new("data")
            .join("minecraft")
            .join("tags")
            .join(self.function_folder)
            .join(format!("{}.json", TICK_TAG))
    }

    pub fn mcmeta_file(&self) -> PathBuf {
        PathBuf::from("pack.mcmeta")
    }

    /// Namespaced reference to the tick function (`statspro:mining_tick`).
    pub fn function_ref(&self) -> String {
        format!("{}:{}", self.plugin_id, self.function_name)
    }
}

/// Serialize with four-space indentation.
fn to_json_pretty4<T: Serialize>(value: &T, path: &Path) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| StatError::json(path, e))?;
    Ok(out)
}

fn write_file(root: &Path, relative: &Path, bytes: &[u8]) -> Result<()> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StatError::io(parent, e))?;
    }
    fs::write(&path, bytes).map_err(|e| StatError::io(&path, e))
}

/// Writes and removes per-preset datapacks under one `datapacks` directory.
#[derive(Debug, Clone)]
pub struct DatapackWriter {
    datapacks_dir: PathBuf,
    plugin_id: String,
    pack_format: u32,
}

impl DatapackWriter {
    pub fn new(datapacks_dir: impl Into<PathBuf>, plugin_id: &str, pack_format: u32) -> Self {
        Self {
            datapacks_dir: datapacks_dir.into(),
            plugin_id: plugin_id.to_string(),
            pack_format,
        }
    }

    /// Directory of the pack belonging to `preset_id`.
    pub fn pack_dir(&self, preset_id: &str) -> PathBuf {
        self.datapacks_dir
            .join(format!("{}_{}", self.plugin_id, preset_id))
    }

    pub fn exists(&self, preset_id: &str) -> bool {
        self.pack_dir(preset_id).is_dir()
    }

    /// Write the pack for `preset_id`, replacing any previous one.
    ///
    /// The function file holds `commands` joined by newlines. On failure
    /// the previous pack is left in place.
    pub fn write(&self, preset_id: &str, version: FormatVersion, commands: &[String]) -> Result<PathBuf> {
        let target = self.pack_dir(preset_id);
        let staging = crate::fs::staging_path(&target);
        crate::fs::remove_path(&staging)?;

        let layout = DatapackLayout::new(&self.plugin_id, preset_id, version);
        if let Err(e) = self.populate(&staging, &layout, commands) {
            // best effort; the write error is the one worth reporting
            let _ = crate::fs::remove_path(&staging);
            return Err(e);
        }

        if crate::fs::remove_path(&target)? {
            tracing::debug!("Replacing datapack {}", target.display());
        }
        fs::rename(&staging, &target).map_err(|e| StatError::io(&target, e))?;
        tracing::info!(
            "Wrote datapack {} ({} commands)",
            target.display(),
            commands.len()
        );
        Ok(target)
    }

    fn populate(&self, root: &Path, layout: &DatapackLayout, commands: &[String]) -> Result<()> {
        write_file(root, &layout.function_file(), commands.join("\n").as_bytes())?;

        let tag = json!({ "values": [layout.function_ref()] });
        let tag_path = root.join(layout.tag_file());
        write_file(root, &layout.tag_file(), &to_json_pretty4(&tag, &tag_path)?)?;

        let meta = json!({
            "pack": { "pack_format": self.pack_format, "description": "StatsPro" }
        });
        let meta_path = root.join(layout.mcmeta_file());
        write_file(root, &layout.mcmeta_file(), &to_json_pretty4(&meta, &meta_path)?)
    }

    /// Delete the pack for `preset_id`. Returns `false` when there was none.
    pub fn remove(&self, preset_id: &str) -> Result<bool> {
        let target = self.pack_dir(preset_id);
        let removed = crate::fs::remove_path(&target)?;
        if removed {
            tracing::info!("Removed datapack {}", target.display());
        } else {
            tracing::debug!("No datapack at {}", target.display());
        }
        Ok(removed)
    }
}
