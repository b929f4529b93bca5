//! Leaderboards over many players' statistics.
//!
//! A [`RankQuery`] selects one of three shapes:
//!
//! ```text
//! ByPair(mined, stone)   → one entry per player:             "Alice"      → 10
//! ByCategory(mined)      → one entry per (player, item):     "Alice.stone" → 10
//! ByItem(diamond_pickaxe)→ one entry per (player, category): "Bob.used"    → 2
//! ```
//!
//! Results are sorted by value, descending, ties kept in player-name then
//! key order. The reported total always covers the full result, even when
//! only the top entries are shown.

use crate::stat_key::StatKey;
use crate::tree::StatTree;
use std::collections::BTreeMap;

/// Lower-case fragments marking a player name as a bot.
pub const BOT_KEYWORDS: &[&str] = &["bot", "b_", "steve", "alex", "dig"];

/// `true` if `name` contains any [`BOT_KEYWORDS`] entry, ignoring case.
///
/// # Examples
///
/// ```rust
/// use scorecraft::ranking::is_bot;
///
/// assert!(is_bot("bot_miner"));
/// assert!(is_bot("DigStation"));
/// assert!(!is_bot("Alice"));
/// ```
pub fn is_bot(name: &str) -> bool {
    let lower = name.to_lowercase();
    BOT_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// The three leaderboard shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RankQuery {
    /// One value per player at `(category, item)`.
    ByPair { category: StatKey, item: StatKey },
    /// Every item of one category, per player.
    ByCategory(StatKey),
    /// One item across every category, per player.
    ByItem(StatKey),
}

impl RankQuery {
    pub fn pair(category: &str, item: &str) -> Self {
        RankQuery::ByPair {
            category: StatKey::new(category),
            item: StatKey::new(item),
        }
    }

    pub fn category(category: &str) -> Self {
        RankQuery::ByCategory(StatKey::new(category))
    }

    pub fn item(item: &str) -> Self {
        RankQuery::ByItem(StatKey::new(item))
    }

    /// Pick the shape from optional parts; `None` when neither is given.
    pub fn from_parts(category: Option<&str>, item: Option<&str>) -> Option<Self> {
        match (category, item) {
            (Some(category), Some(item)) => Some(Self::pair(category, item)),
            (Some(category), None) => Some(Self::category(category)),
            (None, Some(item)) => Some(Self::item(item)),
            (None, None) => None,
        }
    }

    /// Stable text form, used as a cache key.
    pub fn cache_key(&self) -> String {
        match self {
            RankQuery::ByPair { category, item } => format!("pair:{}:{}", category, item),
            RankQuery::ByCategory(category) => format!("category:{}", category),
            RankQuery::ByItem(item) => format!("item:{}", item),
        }
    }

    /// Values of one tree for this query, keyed by the un-namespaced item
    /// (pair and category shapes) or category (item shape).
    pub fn extract(&self, tree: &StatTree) -> BTreeMap<String, u64> {
        let keyed = |map: BTreeMap<StatKey, u64>| {
            map.into_iter()
                .map(|(key, value)| (key.display().to_string(), value))
                .collect()
        };
        match self {
            RankQuery::ByPair { category, item } => tree
                .get(category.as_str(), item.as_str())
                .map(|value| BTreeMap::from([(item.display().to_string(), value)]))
                .unwrap_or_default(),
            RankQuery::ByCategory(category) => keyed(tree.get_category(category.as_str())),
            RankQuery::ByItem(item) => keyed(tree.get_item_across_categories(item.as_str())),
        }
    }

    /// Leaderboard entries contributed by one player.
    fn entries_for(&self, player: &str, tree: &StatTree) -> Vec<(String, u64)> {
        match self {
            RankQuery::ByPair { category, item } => tree
                .get(category.as_str(), item.as_str())
                .map(|value| vec![(player.to_string(), value)])
                .unwrap_or_default(),
            RankQuery::ByCategory(_) | RankQuery::ByItem(_) => self
                .extract(tree)
                .into_iter()
                .map(|(key, value)| (format!("{}.{}", player, key), value))
                .collect(),
        }
    }
}

/// Whose statistics a single-player lookup reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerTarget {
    /// Every loaded player, merged into one tree first.
    All,
    /// One player, by name or uuid.
    Player(String),
}

impl PlayerTarget {
    /// `*` selects every player; anything else names one.
    pub fn parse(target: &str) -> Self {
        if target == "*" {
            PlayerTarget::All
        } else {
            PlayerTarget::Player(target.to_string())
        }
    }
}

/// A sorted leaderboard plus the sum over all of its entries.
///
/// # Examples
///
/// ```rust
/// use scorecraft::{RankQuery, StatTree};
/// use scorecraft::ranking::rank;
///
/// let mut alice = StatTree::new();
/// alice.insert("mined", "stone", 10);
/// let mut bob = StatTree::new();
/// bob.insert("mined", "stone", 4);
///
/// let ranking = rank(
///     [("Alice", &alice), ("Bob", &bob)],
///     &RankQuery::pair("mined", "stone"),
///     false,
/// );
/// assert_eq!(ranking.entries(), &[("Alice".to_string(), 10), ("Bob".to_string(), 4)]);
/// assert_eq!(ranking.total(), 14);
///
/// let top = ranking.limit(1);
/// assert_eq!(top.len(), 1);
/// assert_eq!(top.total(), 14);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ranking {
    entries: Vec<(String, u64)>,
    total: u64,
}

impl Ranking {
    fn from_unsorted(mut entries: Vec<(String, u64)>) -> Self {
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        let total = entries.iter().fold(0u64, |sum, (_, v)| sum.saturating_add(*v));
        Self { entries, total }
    }

    /// Entries in rank order.
    pub fn entries(&self) -> &[(String, u64)] {
        &self.entries
    }

    /// Sum over the full, untruncated result.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| *value)
    }

    /// Keep only the first `limit` entries; the total is preserved.
    pub fn limit(mut self, limit: usize) -> Self {
        self.entries.truncate(limit);
        self
    }
}

/// Build a leaderboard over `(player name, tree)` pairs.
///
/// Players matching [`is_bot`] are skipped unless `include_bots` is set.
/// For the pair shape, players without the path are left out rather
/// than ranked at zero.
pub fn rank<'a, I>(players: I, query: &RankQuery, include_bots: bool) -> Ranking
where
    I: IntoIterator<Item = (&'a str, &'a StatTree)>,
{
    let entries = players
        .into_iter()
        .filter(|(name, _)| include_bots || !is_bot(name))
        .flat_map(|(name, tree)| query.entries_for(name, tree))
        .collect();
    Ranking::from_unsorted(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players() -> Vec<(&'static str, StatTree)> {
        let mut alice = StatTree::new();
        alice.insert("mined", "stone", 10);
        let mut bob = StatTree::new();
        bob.insert("mined", "stone", 4);
        bob.insert("used", "diamond_pickaxe", 2);
        let mut bot = StatTree::new();
        bot.insert("mined", "stone", 1000);
        vec![("Alice", alice), ("Bob", bob), ("bot_1", bot)]
    }

    fn run(query: RankQuery, include_bots: bool) -> Ranking {
        let players = players();
        rank(players.iter().map(|(n, t)| (*n, t)), &query, include_bots)
    }

    #[test]
    fn test_rank_by_pair_excludes_missing_and_bots() {
        let ranking = run(RankQuery::pair("mined", "stone"), false);
        assert_eq!(
            ranking.entries(),
            &[("Alice".to_string(), 10), ("Bob".to_string(), 4)]
        );
        assert_eq!(ranking.total(), 14);
    }

    #[test]
    fn test_rank_with_bots() {
        let ranking = run(RankQuery::pair("mined", "stone"), true);
        assert_eq!(ranking.entries()[0], ("bot_1".to_string(), 1000));
        assert_eq!(ranking.total(), 1014);
    }

    #[test]
    fn test_rank_by_item() {
        let ranking = run(RankQuery::item("diamond_pickaxe"), false);
        assert_eq!(ranking.entries(), &[("Bob.used".to_string(), 2)]);
    }

    #[test]
    fn test_rank_by_category() {
        let ranking = run(RankQuery::category("minecraft:mined"), false);
        assert_eq!(
            ranking.entries(),
            &[("Alice.stone".to_string(), 10), ("Bob.stone".to_string(), 4)]
        );
    }

    #[test]
    fn test_ties_keep_player_order() {
        let mut a = StatTree::new();
        a.insert("mined", "dirt", 5);
        let b = a.clone();
        let ranking = rank(
            [("Ann", &a), ("Zed", &b)],
            &RankQuery::pair("mined", "dirt"),
            false,
        );
        assert_eq!(ranking.entries()[0].0, "Ann");
        assert_eq!(ranking.entries()[1].0, "Zed");
    }

    #[test]
    fn test_limit_keeps_total() {
        let ranking = run(RankQuery::pair("mined", "stone"), false).limit(1);
        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking.total(), 14);
        assert_eq!(ranking.get("Alice"), Some(10));
        assert_eq!(ranking.get("Bob"), None);
    }

    #[test]
    fn test_from_parts() {
        assert_eq!(
            RankQuery::from_parts(Some("mined"), None),
            Some(RankQuery::category("mined"))
        );
        assert_eq!(RankQuery::from_parts(None, None), None);
    }

    #[test]
    fn test_player_target_parse() {
        assert_eq!(PlayerTarget::parse("*"), PlayerTarget::All);
        assert_eq!(PlayerTarget::parse("Alice"), PlayerTarget::Player("Alice".into()));
    }
}
