//! # scorecraft - Deterministic Stats Aggregation and Scoreboard Generation
//!
//! Aggregates Minecraft per-player statistics files and turns them into
//! leaderboards, snapshots and in-game scoreboards:
//! - **Deterministic** aggregation (merge order never changes a sum)
//! - **Lossless** merges and diffs over two-level `category -> item -> value` trees
//! - **Cached** rankings and sums with explicit invalidation
//! - **Compiled** sum scoreboards: a preset becomes objectives, an
//!   accumulation chain of scoreboard operations, and a tick datapack
//!
//! ## Core Concepts
//!
//! ### Pipeline
//!
//! ```text
//! stats/*.json -> [StatsContext] -> rank / sum / score lookups
//!                      |
//!                      +-> [GenRecordStore] sum / record / minus snapshots
//!                      +-> [SumPlan] -> [ScoreboardService] -> CommandSink + datapack
//! ```
//!
//! 1. **Players** are loaded from the world's stats directory, named
//!    through `usercache.json`
//! 2. **Presets** list the stats a sum scoreboard adds up, each with a
//!    short unique abbreviation used in objective names
//! 3. **Commands** go to a [`CommandSink`]; the server behind it is not
//!    part of this crate
//!
//! ## Example
//!
//! ```rust
//! use scorecraft::*;
//!
//! let mut alice = StatTree::new();
//! alice.insert("mined", "stone", 10);
//! let mut bob = StatTree::new();
//! bob.insert("minecraft:mined", "minecraft:stone", 4);
//!
//! let total = StatTree::merge([&alice, &bob]);
//! assert_eq!(total.get("mined", "stone"), Some(14));
//!
//! let ranking = rank(
//!     [("Alice", &alice), ("Bob", &bob)],
//!     &RankQuery::pair("mined", "stone"),
//!     false,
//! );
//! assert_eq!(ranking.entries()[0], ("Alice".to_string(), 10));
//! assert_eq!(ranking.total(), 14);
//! ```
//!
//! ## Modules
//!
//! - [`stat_key`] - Namespaced stat keys
//! - [`tree`] - Stat trees and stats files (merge, diff)
//! - [`player`] - Player records and the name/uuid mapping
//! - [`ranking`] - Leaderboards and bot filtering
//! - [`cache`] - TTL caches for rankings and sums
//! - [`abbrev`] - Abbreviation allocator for objective names
//! - [`preset`] - Sum scoreboard presets
//! - [`compiler`] - Scoreboard command and accumulation chain generation
//! - [`datapack`] - Tick datapack writer
//! - [`scoreboard`] - Command sink and scoreboard service
//! - [`records`] - Sum / record / minus snapshots
//! - [`config`] - Settings, paths and the persisted config document
//! - [`context`] - The stats context tying everything together
//! - [`version`] - Data version detection
//! - [`error`] - Error types

pub mod abbrev;
pub mod cache;
pub mod compiler;
pub mod config;
pub mod context;
pub mod datapack;
pub mod error;
mod fs;
pub mod player;
pub mod preset;
pub mod ranking;
pub mod records;
pub mod scoreboard;
pub mod stat_key;
pub mod tree;
pub mod version;

// Re-export main types for convenience
pub use context::StatsContext;
pub use error::{Result, StatError};
pub use stat_key::StatKey;
pub use tree::{StatTree, StatsFile};

pub use abbrev::{abbreviate, allocate_abbreviations};
pub use cache::{CacheStats, StatsCache};
pub use compiler::{compile_chain, AccumulationChain, SumPlan};
pub use config::{ConfigFile, MergeConfig, ServerPaths, Settings};
pub use datapack::DatapackWriter;
pub use player::{PlayerRecord, UuidMapping};
pub use preset::{Preset, PresetTable};
pub use ranking::{rank, PlayerTarget, RankQuery, Ranking};
pub use records::{GenKind, GenPayload, GenRecord, GenRecordStore};
pub use scoreboard::{CommandSink, ScoreboardService};
pub use version::FormatVersion;
