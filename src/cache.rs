//! Time-limited caches for ranking and sum results.
//!
//! Entries live for a fixed TTL. Staleness within that window is accepted;
//! anything that changes player data must call
//! [`StatsCache::invalidate_player`] or [`StatsCache::invalidate_all`]
//! instead of waiting for expiry.

use crate::ranking::Ranking;
use crate::tree::{StatTree, StatsFile};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Hit/miss counters of one cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Percentage of lookups that hit, `0.0` before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} entries, {} hits, {} misses ({:.1}%)",
            self.size,
            self.max_size,
            self.hits,
            self.misses,
            self.hit_rate()
        )
    }
}

/// A string-keyed cache whose entries expire after a TTL.
///
/// When full, inserting first drops expired entries and then, if still
/// full, the oldest one.
///
/// # Examples
///
/// ```rust
/// use scorecraft::cache::TtlCache;
/// use std::time::Duration;
///
/// let mut cache = TtlCache::new(Duration::from_secs(30), 2);
/// cache.insert("a", 1);
/// assert_eq!(cache.get("a"), Some(1));
/// assert_eq!(cache.get("b"), None);
/// assert_eq!(cache.stats().hits, 1);
/// ```
#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    ttl: Duration,
    max_size: usize,
    hits: u64,
    misses: u64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            max_size: max_size.max(1),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a live entry. Expired entries are dropped and count as a miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                self.hits += 1;
                Some(entry.value.clone())
            }
            Some(_) => {
                self.entries.remove(key);
                self.misses += 1;
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        let now = Instant::now();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_size {
            self.evict_expired(now);
            if self.entries.len() >= self.max_size {
                self.evict_oldest();
            }
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Drop one entry. Returns `true` if it was present.
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            max_size: self.max_size,
            hits: self.hits,
            misses: self.misses,
        }
    }

    fn evict_expired(&mut self, now: Instant) {
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.created_at)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

/// The three caches used by a stats context.
#[derive(Debug, Clone)]
pub struct StatsCache {
    players: TtlCache<StatTree>,
    rankings: TtlCache<Ranking>,
    sums: TtlCache<StatsFile>,
}

fn ranking_key(query_key: &str, include_bots: bool) -> String {
    format!("rank:{}:{}", query_key, include_bots)
}

fn sum_key(players: Option<&[String]>) -> String {
    match players {
        Some(players) => {
            let mut sorted = players.to_vec();
            sorted.sort();
            format!("sum:{}", sorted.join(","))
        }
        None => "sum:all".to_string(),
    }
}

impl StatsCache {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            players: TtlCache::new(ttl, max_size),
            rankings: TtlCache::new(ttl, max_size),
            sums: TtlCache::new(ttl, max_size),
        }
    }

    pub fn player(&mut self, name: &str) -> Option<StatTree> {
        self.players.get(&format!("player:{}", name))
    }

    pub fn set_player(&mut self, name: &str, stats: StatTree) {
        self.players.insert(format!("player:{}", name), stats);
    }

    pub fn ranking(&mut self, query_key: &str, include_bots: bool) -> Option<Ranking> {
        self.rankings.get(&ranking_key(query_key, include_bots))
    }

    pub fn set_ranking(&mut self, query_key: &str, include_bots: bool, ranking: Ranking) {
        self.rankings.insert(ranking_key(query_key, include_bots), ranking);
    }

    /// Cached sum over `players`, or over everyone with `None`.
    pub fn sum(&mut self, players: Option<&[String]>) -> Option<StatsFile> {
        self.sums.get(&sum_key(players))
    }

    pub fn set_sum(&mut self, players: Option<&[String]>, sum: StatsFile) {
        self.sums.insert(sum_key(players), sum);
    }

    /// Forget one player and every aggregate that may include them.
    pub fn invalidate_player(&mut self, name: &str) {
        self.players.invalidate(&format!("player:{}", name));
        self.rankings.invalidate_all();
        self.sums.invalidate_all();
        tracing::debug!("Invalidated cached results for {}", name);
    }

    pub fn invalidate_all(&mut self) {
        self.players.invalidate_all();
        self.rankings.invalidate_all();
        self.sums.invalidate_all();
        tracing::debug!("Cleared all cached results");
    }

    /// Counters keyed by cache name (`players`, `rankings`, `sums`).
    pub fn stats(&self) -> Vec<(&'static str, CacheStats)> {
        vec![
            ("players", self.players.stats()),
            ("rankings", self.rankings.stats()),
            ("sums", self.sums.stats()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let mut cache = TtlCache::new(Duration::ZERO, 10);
        cache.insert("a", 1);
        assert_eq!(cache.get("a"), None);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_full_cache_evicts_oldest() {
        let mut cache = TtlCache::new(Duration::from_secs(60), 2);
        cache.insert("a", 1);
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("b", 2);
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("c", 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn test_full_cache_prefers_expired() {
        let mut cache = TtlCache::new(Duration::ZERO, 2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let mut cache = TtlCache::new(Duration::from_secs(60), 1);
        cache.insert("a", 1);
        cache.insert("a", 2);
        assert_eq!(cache.get("a"), Some(2));
    }

    #[test]
    fn test_hit_rate_display() {
        let stats = CacheStats {
            size: 1,
            max_size: 10,
            hits: 3,
            misses: 1,
        };
        assert_eq!(stats.to_string(), "1/10 entries, 3 hits, 1 misses (75.0%)");
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_sum_key_ignores_player_order() {
        let mut cache = StatsCache::new(Duration::from_secs(60), 10);
        let a = vec!["Bob".to_string(), "Alice".to_string()];
        let b = vec!["Alice".to_string(), "Bob".to_string()];
        cache.set_sum(Some(a.as_slice()), StatsFile::default());
        assert!(cache.sum(Some(b.as_slice())).is_some());
        assert!(cache.sum(None).is_none());
    }

    #[test]
    fn test_invalidate_player_drops_aggregates() {
        let mut cache = StatsCache::new(Duration::from_secs(60), 10);
        cache.set_player("Alice", StatTree::new());
        cache.set_player("Bob", StatTree::new());
        cache.set_ranking("pair:a:b", false, Ranking::default());
        cache.set_sum(None, StatsFile::default());

        cache.invalidate_player("Alice");
        assert!(cache.player("Alice").is_none());
        assert!(cache.player("Bob").is_some());
        assert!(cache.ranking("pair:a:b", false).is_none());
        assert!(cache.sum(None).is_none());
    }
}
