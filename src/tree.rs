//! Sparse two-level statistics tree.
//!
//! A `StatTree` maps a category (`minecraft:mined`) to a map of items
//! (`minecraft:stone`) to non-negative counts. Absence is meaningful:
//! [`StatTree::get`] distinguishes "never recorded" from "recorded as zero".
//! Categories whose item map becomes empty are removed, so an empty
//! category is never persisted.

use crate::error::{Result, StatError};
use crate::stat_key::StatKey;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::Path;

type RawTree = BTreeMap<StatKey, BTreeMap<StatKey, u64>>;

/// Per-player (or aggregated) statistics, keyed by category then item.
///
/// # Examples
///
/// ```rust
/// use scorecraft::StatTree;
///
/// let mut tree = StatTree::new();
/// tree.insert("mined", "stone", 10);
///
/// assert_eq!(tree.get("minecraft:mined", "stone"), Some(10));
/// assert_eq!(tree.get("mined", "dirt"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawTree")]
pub struct StatTree {
    categories: RawTree,
}

impl From<RawTree> for StatTree {
    fn from(mut categories: RawTree) -> Self {
        categories.retain(|_, items| !items.is_empty());
        Self { categories }
    }
}

impl Serialize for StatTree {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.categories.serialize(serializer)
    }
}

impl StatTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when no (category, item) path is recorded.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Number of recorded (category, item) paths.
    pub fn len(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    /// Set the value at a path, replacing any previous value.
    pub fn insert(&mut self, category: impl Into<StatKey>, item: impl Into<StatKey>, value: u64) {
        self.categories
            .entry(category.into())
            .or_default()
            .insert(item.into(), value);
    }

    /// Add to the value at a path, treating absence as zero.
    pub fn add(&mut self, category: impl Into<StatKey>, item: impl Into<StatKey>, value: u64) {
        let slot = self
            .categories
            .entry(category.into())
            .or_default()
            .entry(item.into())
            .or_insert(0);
        *slot = slot.saturating_add(value);
    }

    /// Remove a path, dropping its category if it becomes empty.
    pub fn remove(&mut self, category: &str, item: &str) -> Option<u64> {
        let category = StatKey::new(category);
        let items = self.categories.get_mut(&category)?;
        let removed = items.remove(&StatKey::new(item));
        if items.is_empty() {
            self.categories.remove(&category);
        }
        removed
    }

    /// Value at `(category, item)`, or `None` if the path was never recorded.
    pub fn get(&self, category: &str, item: &str) -> Option<u64> {
        self.categories
            .get(&StatKey::new(category))?
            .get(&StatKey::new(item))
            .copied()
    }

    /// All items of one category (empty when the category is absent).
    pub fn get_category(&self, category: &str) -> BTreeMap<StatKey, u64> {
        self.categories
            .get(&StatKey::new(category))
            .cloned()
            .unwrap_or_default()
    }

    /// The value of one item in every category that records it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scorecraft::{StatKey, StatTree};
    ///
    /// let mut tree = StatTree::new();
    /// tree.insert("used", "diamond_pickaxe", 2);
    /// tree.insert("crafted", "diamond_pickaxe", 1);
    /// tree.insert("mined", "stone", 10);
    ///
    /// let across = tree.get_item_across_categories("diamond_pickaxe");
    /// assert_eq!(across.len(), 2);
    /// assert_eq!(across[&StatKey::new("used")], 2);
    /// ```
    pub fn get_item_across_categories(&self, item: &str) -> BTreeMap<StatKey, u64> {
        let item = StatKey::new(item);
        self.categories
            .iter()
            .filter_map(|(category, items)| {
                items.get(&item).map(|value| (category.clone(), *value))
            })
            .collect()
    }

    /// Iterate over categories and their item maps.
    pub fn categories(&self) -> impl Iterator<Item = (&StatKey, &BTreeMap<StatKey, u64>)> {
        self.categories.iter()
    }

    /// Iterate over every `(category, item, value)` triple.
    pub fn iter(&self) -> impl Iterator<Item = (&StatKey, &StatKey, u64)> {
        self.categories.iter().flat_map(|(category, items)| {
            items.iter().map(move |(item, value)| (category, item, *value))
        })
    }

    /// Add every value of `other` into this tree.
    pub fn merge_from(&mut self, other: &StatTree) {
        for (category, item, value) in other.iter() {
            self.add(category.clone(), item.clone(), value);
        }
    }

    /// Sum any number of trees path by path.
    ///
    /// A path recorded by only one input keeps that input's value. The
    /// operation is associative and commutative.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scorecraft::StatTree;
    ///
    /// let mut a = StatTree::new();
    /// a.insert("mined", "stone", 5);
    /// let mut b = StatTree::new();
    /// b.insert("mined", "stone", 3);
    /// b.insert("used", "axe", 1);
    ///
    /// let merged = StatTree::merge([&a, &b]);
    /// assert_eq!(merged.get("mined", "stone"), Some(8));
    /// assert_eq!(merged.get("used", "axe"), Some(1));
    /// ```
    pub fn merge<'a, I>(trees: I) -> StatTree
    where
        I: IntoIterator<Item = &'a StatTree>,
    {
        let mut merged = StatTree::new();
        for tree in trees {
            merged.merge_from(tree);
        }
        merged
    }

    /// Absolute per-path difference between two trees.
    ///
    /// Missing paths count as zero, zero differences are dropped and so
    /// are categories left empty. `diff(a, b) == diff(b, a)` and
    /// `diff(a, a)` is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scorecraft::StatTree;
    ///
    /// let mut a = StatTree::new();
    /// a.insert("mined", "stone", 5);
    /// let mut b = a.clone();
    /// b.insert("used", "axe", 2);
    ///
    /// let diff = StatTree::diff(&a, &b);
    /// assert_eq!(diff.get("used", "axe"), Some(2));
    /// assert!(diff.get_category("mined").is_empty());
    /// ```
    pub fn diff(a: &StatTree, b: &StatTree) -> StatTree {
        let mut result = StatTree::new();
        let categories = a.categories.keys().chain(b.categories.keys());
        for category in categories {
            if result.categories.contains_key(category) {
                continue;
            }
            let empty = BTreeMap::new();
            let left = a.categories.get(category).unwrap_or(&empty);
            let right = b.categories.get(category).unwrap_or(&empty);

            let mut items = BTreeMap::new();
            for item in left.keys().chain(right.keys()) {
                let l = left.get(item).copied().unwrap_or(0);
                let r = right.get(item).copied().unwrap_or(0);
                let delta = l.abs_diff(r);
                if delta > 0 {
                    items.insert(item.clone(), delta);
                }
            }
            if !items.is_empty() {
                result.categories.insert(category.clone(), items);
            }
        }
        result
    }
}

/// The on-disk shape of a statistics file: a tree plus an optional
/// format-version marker (`DataVersion`).
///
/// The version is carried through merges (last one wins) but is never
/// inspected by the tree algorithms themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsFile {
    #[serde(rename = "DataVersion", default, skip_serializing_if = "Option::is_none")]
    pub data_version: Option<u32>,
    #[serde(default)]
    pub stats: StatTree,
}

impl StatsFile {
    /// Wrap a tree without a version marker.
    pub fn new(stats: StatTree) -> Self {
        Self {
            data_version: None,
            stats,
        }
    }

    /// Read and parse a statistics file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| StatError::io(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| StatError::json(path, e))
    }

    /// Write this file as pretty JSON, replacing any previous file atomically.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self).map_err(|e| StatError::json(path, e))?;
        crate::fs::write_atomic(path, &bytes)
    }

    /// Merge files in order; the last present `DataVersion` wins.
    pub fn merge<'a, I>(files: I) -> StatsFile
    where
        I: IntoIterator<Item = &'a StatsFile>,
    {
        let mut merged = StatsFile::default();
        for file in files {
            merged.stats.merge_from(&file.stats);
            if file.data_version.is_some() {
                merged.data_version = file.data_version;
            }
        }
        merged
    }
}
