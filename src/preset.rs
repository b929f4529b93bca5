//! Presets: named sets of tracked (category, item) pairs.
//!
//! A preset describes one always-on sum scoreboard: which stats feed it,
//! the register prefixes for source (`prefix_true`) and accumulator
//! (`prefix_dummy`) objectives, and the sidebar label. Item abbreviations
//! are derived values and are regenerated whenever the item set changes.

use crate::abbrev::allocate_abbreviations;
use crate::error::{Result, StatError};
use crate::stat_key::StatKey;
use crate::version::FormatVersion;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// Name of the reserved preset that only version detection may change.
pub const DEFAULT_PRESET: &str = "default";

/// Tools tracked by the default preset on every version.
pub const DEFAULT_TOOLS: &[&str] = &[
    "diamond_axe",
    "diamond_sword",
    "diamond_pickaxe",
    "diamond_shovel",
    "diamond_hoe",
    "iron_axe",
    "iron_sword",
    "iron_pickaxe",
    "iron_shovel",
    "iron_hoe",
    "golden_axe",
    "golden_sword",
    "golden_pickaxe",
    "golden_shovel",
    "golden_hoe",
    "wooden_axe",
    "wooden_sword",
    "wooden_pickaxe",
    "wooden_shovel",
    "wooden_hoe",
    "stone_axe",
    "stone_sword",
    "stone_pickaxe",
    "stone_shovel",
    "stone_hoe",
    "shears",
];

/// Tools added once netherite exists.
pub const NETHERITE_TOOLS: &[&str] = &[
    "netherite_pickaxe",
    "netherite_axe",
    "netherite_sword",
    "netherite_shovel",
    "netherite_hoe",
];

/// Tools added once copper tools exist.
pub const COPPER_TOOLS: &[&str] = &[
    "copper_pickaxe",
    "copper_axe",
    "copper_sword",
    "copper_shovel",
    "copper_hoe",
];

type ItemTable = BTreeMap<StatKey, BTreeMap<StatKey, String>>;

/// A tracked entry of a preset, in register order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetEntry {
    pub category: StatKey,
    pub item: StatKey,
    pub abbreviation: String,
}

/// A named, user-editable set of tracked stats.
///
/// # Examples
///
/// ```rust
/// use scorecraft::Preset;
///
/// let mut preset = Preset::new("mining", None, None, None);
/// assert_eq!(preset.prefix_dummy, "m");
/// assert_eq!(preset.prefix_true, "mt");
///
/// assert!(preset.add_item("mined", "stone").unwrap());
/// assert!(!preset.add_item("minecraft:mined", "minecraft:stone").unwrap());
/// assert_eq!(preset.entries()[0].abbreviation, "stone");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preset {
    /// Table key; restored from the map key on load.
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub prefix_dummy: String,
    pub prefix_true: String,
    #[serde(rename = "list")]
    items: ItemTable,
}

impl Preset {
    /// Create an empty preset. Missing prefixes default to the first
    /// character of `id` (dummy) and that character plus `t` (true).
    pub fn new(
        id: &str,
        display_name: Option<&str>,
        prefix_dummy: Option<&str>,
        prefix_true: Option<&str>,
    ) -> Self {
        let initial: String = id.chars().take(1).collect();
        Self {
            id: id.to_string(),
            display_name: display_name.unwrap_or(id).to_string(),
            prefix_dummy: prefix_dummy.map(str::to_string).unwrap_or_else(|| initial.clone()),
            prefix_true: prefix_true
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}t", initial)),
            items: ItemTable::new(),
        }
    }

    /// Track a (category, item) pair. Returns `false` if it was already tracked.
    pub fn add_item(&mut self, category: &str, item: &str) -> Result<bool> {
        let category = StatKey::new(category);
        let item = StatKey::new(item);
        if self.contains(&category, &item) {
            return Ok(false);
        }
        let previous = self.items.clone();
        self.items
            .entry(category)
            .or_default()
            .insert(item, String::new());
        if let Err(e) = self.refresh_abbreviations() {
            self.items = previous;
            return Err(e);
        }
        Ok(true)
    }

    /// Stop tracking a pair. Returns `false` if it was not tracked.
    pub fn remove_item(&mut self, category: &str, item: &str) -> Result<bool> {
        let category = StatKey::new(category);
        let item = StatKey::new(item);
        if !self.contains(&category, &item) {
            return Ok(false);
        }
        let previous = self.items.clone();
        if let Some(items) = self.items.get_mut(&category) {
            items.remove(&item);
            if items.is_empty() {
                self.items.remove(&category);
            }
        }
        if let Err(e) = self.refresh_abbreviations() {
            self.items = previous;
            return Err(e);
        }
        Ok(true)
    }

    /// Remove every tracked pair.
    pub fn clear_items(&mut self) {
        self.items.clear();
    }

    pub fn contains(&self, category: &StatKey, item: &StatKey) -> bool {
        self.items
            .get(category)
            .is_some_and(|items| items.contains_key(item))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.items.values().map(BTreeMap::len).sum()
    }

    /// Tracked pairs ordered by category then item.
    pub fn entries(&self) -> Vec<PresetEntry> {
        self.items
            .iter()
            .flat_map(|(category, items)| {
                items.iter().map(move |(item, abbreviation)| PresetEntry {
                    category: category.clone(),
                    item: item.clone(),
                    abbreviation: abbreviation.clone(),
                })
            })
            .collect()
    }

    /// Regenerate abbreviations for the current item set.
    ///
    /// Items tracked under several categories are abbreviated together with
    /// their category (`used_diamond_pickaxe`), so every pair still gets
    /// its own register.
    pub fn refresh_abbreviations(&mut self) -> Result<()> {
        let mut seen = BTreeSet::new();
        let mut shared = BTreeSet::new();
        for item in self.items.values().flat_map(BTreeMap::keys) {
            if !seen.insert(item.clone()) {
                shared.insert(item.clone());
            }
        }

        let allocation_name = |category: &StatKey, item: &StatKey| -> String {
            if shared.contains(item) {
                format!("{}_{}", category.display(), item.display())
            } else {
                item.display().to_string()
            }
        };

        let names: Vec<String> = self
            .items
            .iter()
            .flat_map(|(category, items)| items.keys().map(move |item| (category, item)))
            .map(|(category, item)| allocation_name(category, item))
            .collect();
        let abbreviations = allocate_abbreviations(&names)?;

        for (category, items) in self.items.iter_mut() {
            for (item, abbreviation) in items.iter_mut() {
                let name = allocation_name(category, item);
                if let Some(allocated) = abbreviations.get(&name) {
                    *abbreviation = allocated.clone();
                }
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct RawPreset {
    name: Option<String>,
    prefix_dummy: Option<String>,
    prefix_true: Option<String>,
    #[serde(default)]
    list: ItemTable,
}

/// All presets, keyed by id. The [`DEFAULT_PRESET`] entry is protected
/// from user edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresetTable {
    presets: BTreeMap<String, Preset>,
}

impl Serialize for PresetTable {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.presets.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PresetTable {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, RawPreset>::deserialize(deserializer)?;
        let presets = raw
            .into_iter()
            .map(|(id, raw)| {
                let mut preset = Preset::new(
                    &id,
                    raw.name.as_deref(),
                    raw.prefix_dummy.as_deref(),
                    raw.prefix_true.as_deref(),
                );
                preset.items = raw.list;
                (id, preset)
            })
            .collect();
        Ok(Self { presets })
    }
}

impl PresetTable {
    /// A table holding only the default preset, populated for `version`.
    pub fn with_default(version: FormatVersion) -> Result<Self> {
        let mut table = Self::default();
        table.populate_default(version)?;
        Ok(table)
    }

    pub fn get(&self, id: &str) -> Option<&Preset> {
        self.presets.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.presets.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.presets.values()
    }

    /// Ids of every preset except the default one.
    pub fn user_preset_ids(&self) -> Vec<String> {
        self.presets
            .keys()
            .filter(|id| id.as_str() != DEFAULT_PRESET)
            .cloned()
            .collect()
    }

    /// Register a new, empty preset.
    pub fn create(
        &mut self,
        id: &str,
        display_name: Option<&str>,
        prefix_dummy: Option<&str>,
        prefix_true: Option<&str>,
    ) -> Result<&Preset> {
        if id == DEFAULT_PRESET {
            return Err(StatError::ProtectedPreset(id.to_string()));
        }
        if self.presets.contains_key(id) {
            return Err(StatError::PresetExists(id.to_string()));
        }
        let preset = Preset::new(id, display_name, prefix_dummy, prefix_true);
        Ok(self.presets.entry(id.to_string()).or_insert(preset))
    }

    /// Delete a user preset.
    pub fn remove(&mut self, id: &str) -> Result<Preset> {
        self.check_editable(id)?;
        self.presets
            .remove(id)
            .ok_or_else(|| StatError::PresetNotFound(id.to_string()))
    }

    pub fn add_item(&mut self, id: &str, category: &str, item: &str) -> Result<bool> {
        self.user_preset_mut(id)?.add_item(category, item)
    }

    pub fn remove_item(&mut self, id: &str, category: &str, item: &str) -> Result<bool> {
        self.user_preset_mut(id)?.remove_item(category, item)
    }

    pub fn clear_items(&mut self, id: &str) -> Result<()> {
        self.user_preset_mut(id)?.clear_items();
        Ok(())
    }

    /// Seed the default preset with the tools every version has, before
    /// any data version is known.
    pub fn seed_default(&mut self) -> Result<()> {
        self.sync_default(DEFAULT_TOOLS, &[])
    }

    /// Bring the default preset in line with the tools available at
    /// `version`. Version-gated tools the version lacks are dropped again.
    pub fn populate_default(&mut self, version: FormatVersion) -> Result<()> {
        let mut available: Vec<&str> = DEFAULT_TOOLS.to_vec();
        let mut withheld: Vec<&str> = Vec::new();
        for (present, tools) in [
            (version.has_netherite(), NETHERITE_TOOLS),
            (version.has_copper(), COPPER_TOOLS),
        ] {
            if present {
                available.extend_from_slice(tools);
            } else {
                withheld.extend_from_slice(tools);
            }
        }
        self.sync_default(&available, &withheld)
    }

    fn sync_default(&mut self, available: &[&str], withheld: &[&str]) -> Result<()> {
        let preset = self.presets.entry(DEFAULT_PRESET.to_string()).or_insert_with(|| {
            Preset::new(DEFAULT_PRESET, Some("§c§lTotal Tool Use§r"), Some("d"), Some("dt"))
        });

        let used = preset.items.entry(StatKey::new("used")).or_default();
        let before = used.len();
        for tool in available {
            used.entry(StatKey::new(tool)).or_default();
        }
        let added = used.len() - before;
        let removed = withheld
            .iter()
            .filter(|tool| used.remove(&StatKey::new(tool)).is_some())
            .count();
        if added > 0 || removed > 0 {
            tracing::debug!(
                "Default preset tools: {} added, {} removed",
                added,
                removed
            );
        }
        preset.refresh_abbreviations()
    }

    /// Recompute abbreviations of every preset (after loading a config
    /// written by hand or by an older release).
    pub fn refresh_all(&mut self) -> Result<()> {
        for preset in self.presets.values_mut() {
            preset.refresh_abbreviations()?;
        }
        Ok(())
    }

    fn check_editable(&self, id: &str) -> Result<()> {
        if id == DEFAULT_PRESET {
            Err(StatError::ProtectedPreset(id.to_string()))
        } else {
            Ok(())
        }
    }

    fn user_preset_mut(&mut self, id: &str) -> Result<&mut Preset> {
        self.check_editable(id)?;
        self.presets
            .get_mut(id)
            .ok_or_else(|| StatError::PresetNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preset_population() {
        let table = PresetTable::with_default(FormatVersion::unknown()).unwrap();
        let preset = table.get(DEFAULT_PRESET).unwrap();
        assert_eq!(preset.item_count(), DEFAULT_TOOLS.len() + NETHERITE_TOOLS.len());
        assert!(preset.entries().iter().all(|e| !e.abbreviation.is_empty()));

        let old = PresetTable::with_default(FormatVersion::new(1976)).unwrap();
        assert_eq!(old.get(DEFAULT_PRESET).unwrap().item_count(), DEFAULT_TOOLS.len());

        let new = PresetTable::with_default(FormatVersion::new(4600)).unwrap();
        assert_eq!(
            new.get(DEFAULT_PRESET).unwrap().item_count(),
            DEFAULT_TOOLS.len() + NETHERITE_TOOLS.len() + COPPER_TOOLS.len()
        );
    }

    #[test]
    fn test_populate_default_drops_tools_the_version_lacks() {
        let mut table = PresetTable::default();
        table.seed_default().unwrap();
        assert_eq!(table.get(DEFAULT_PRESET).unwrap().item_count(), DEFAULT_TOOLS.len());

        let used = StatKey::new("used");
        let netherite = StatKey::new("netherite_pickaxe");
        table.populate_default(FormatVersion::unknown()).unwrap();
        assert!(table.get(DEFAULT_PRESET).unwrap().contains(&used, &netherite));

        table.populate_default(FormatVersion::new(1976)).unwrap();
        let preset = table.get(DEFAULT_PRESET).unwrap();
        assert!(!preset.contains(&used, &netherite));
        assert_eq!(preset.item_count(), DEFAULT_TOOLS.len());
        assert!(preset.entries().iter().all(|e| !e.abbreviation.is_empty()));
    }

    #[test]
    fn test_default_preset_is_protected() {
        let mut table = PresetTable::with_default(FormatVersion::unknown()).unwrap();
        assert_eq!(table.remove(DEFAULT_PRESET).unwrap_err().code(), "protected_preset");
        assert_eq!(
            table.add_item(DEFAULT_PRESET, "mined", "stone").unwrap_err().code(),
            "protected_preset"
        );
        assert_eq!(
            table.create(DEFAULT_PRESET, None, None, None).unwrap_err().code(),
            "protected_preset"
        );
        assert!(table.clear_items(DEFAULT_PRESET).is_err());
        assert!(!table.get(DEFAULT_PRESET).unwrap().is_empty());
    }

    #[test]
    fn test_create_duplicate_rejected() {
        let mut table = PresetTable::default();
        table.create("mining", Some("Mining"), None, None).unwrap();
        let err = table.create("mining", None, None, None).unwrap_err();
        assert_eq!(err.code(), "preset_exists");
        assert_eq!(table.get("mining").unwrap().display_name, "Mining");
    }

    #[test]
    fn test_remove_item_drops_category_and_reabbreviates() {
        let mut preset = Preset::new("tools", None, None, None);
        preset.add_item("used", "iron_pick").unwrap();
        preset.add_item("used", "iron_pickaxe").unwrap();
        let abbrs: Vec<String> = preset.entries().into_iter().map(|e| e.abbreviation).collect();
        assert_eq!(abbrs, vec!["ip", "iq"]);

        assert!(preset.remove_item("used", "iron_pick").unwrap());
        assert_eq!(preset.entries()[0].abbreviation, "ip");
        assert!(preset.remove_item("used", "iron_pickaxe").unwrap());
        assert!(preset.is_empty());
        assert!(!preset.remove_item("used", "iron_pickaxe").unwrap());
    }

    #[test]
    fn test_shared_item_gets_distinct_registers() {
        let mut preset = Preset::new("tools", None, None, None);
        preset.add_item("used", "diamond_pickaxe").unwrap();
        preset.add_item("crafted", "diamond_pickaxe").unwrap();
        let entries = preset.entries();
        assert_eq!(entries[0].abbreviation, "cdp");
        assert_eq!(entries[1].abbreviation, "udp");
    }

    #[test]
    fn test_remove_item_keeps_table_consistent() {
        let mut preset = Preset::new("tools", None, None, None);
        preset.add_item("used", "diamond_pickaxe").unwrap();
        preset.add_item("crafted", "diamond_pickaxe").unwrap();
        let before = preset.clone();

        assert!(!preset.remove_item("used", "iron_axe").unwrap());
        assert_eq!(preset, before);

        assert!(preset.remove_item("crafted", "diamond_pickaxe").unwrap());
        let entries = preset.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].abbreviation, "dp");
    }

    #[test]
    fn test_table_json_shape() {
        let json = r#"{"mining": {"name": "Mining", "list": {"mined": {"stone": "stone"}}}}"#;
        let table: PresetTable = serde_json::from_str(json).unwrap();
        let preset = table.get("mining").unwrap();
        assert_eq!(preset.id, "mining");
        assert_eq!(preset.prefix_dummy, "m");
        assert_eq!(preset.prefix_true, "mt");

        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(value["mining"]["name"], "Mining");
        assert_eq!(value["mining"]["prefix_true"], "mt");
        assert_eq!(value["mining"]["list"]["minecraft:mined"]["minecraft:stone"], "stone");
    }
}
