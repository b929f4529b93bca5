//! Stat key module.
//!
//! Provides the `StatKey` type, a namespaced identifier for stat categories
//! and items (`minecraft:mined`, `minecraft:stone`). Keys are normalized on
//! construction, so every public operation can accept either the bare or
//! the namespaced form.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// Namespace applied to keys that do not carry one.
pub const MINECRAFT_NAMESPACE: &str = "minecraft";

/// Return the canonical (namespaced) form of a key.
///
/// Normalizing is idempotent, and keys that already carry any namespace
/// are left untouched.
///
/// # Examples
///
/// ```rust
/// use scorecraft::stat_key::normalize;
///
/// assert_eq!(normalize("stone"), "minecraft:stone");
/// assert_eq!(normalize("minecraft:stone"), "minecraft:stone");
/// assert_eq!(normalize(&normalize("stone")), "minecraft:stone");
/// ```
pub fn normalize(key: &str) -> String {
    if key.contains(':') {
        key.to_string()
    } else {
        format!("{}:{}", MINECRAFT_NAMESPACE, key)
    }
}

/// Return a key without its namespace.
///
/// # Examples
///
/// ```rust
/// use scorecraft::stat_key::display;
///
/// assert_eq!(display("minecraft:stone"), "stone");
/// assert_eq!(display("stone"), "stone");
/// ```
pub fn display(key: &str) -> &str {
    match key.split_once(':') {
        Some((_, path)) => path,
        None => key,
    }
}

/// Interned, normalized identifier for a stat category or item.
///
/// Uses `Arc<str>` so that the same key can be shared across many player
/// trees without reallocating.
///
/// # Examples
///
/// ```rust
/// use scorecraft::StatKey;
///
/// let a = StatKey::new("stone");
/// let b: StatKey = "minecraft:stone".into();
///
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "minecraft:stone");
/// assert_eq!(a.display(), "stone");
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct StatKey(Arc<str>);

impl Serialize for StatKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StatKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(StatKey::from(s))
    }
}

impl StatKey {
    /// Create a key, adding the default namespace when it is missing.
    pub fn new(key: &str) -> Self {
        Self(Arc::from(normalize(key)))
    }

    /// The canonical, namespaced form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key without its namespace.
    pub fn display(&self) -> &str {
        display(&self.0)
    }

    /// The namespace part (`minecraft` for vanilla keys).
    pub fn namespace(&self) -> &str {
        match self.0.split_once(':') {
            Some((namespace, _)) => namespace,
            None => MINECRAFT_NAMESPACE,
        }
    }

    /// Scoreboard criterion fragment: `minecraft.stone` for `minecraft:stone`.
    pub fn criterion_part(&self) -> String {
        format!("{}.{}", self.namespace(), self.display())
    }
}

impl From<&str> for StatKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StatKey {
    fn from(s: String) -> Self {
        if s.contains(':') {
            Self(Arc::from(s))
        } else {
            Self::new(&s)
        }
    }
}

impl From<&String> for StatKey {
    fn from(s: &String) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for StatKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
