//! The stats context: loaded players, configuration and caches.
//!
//! `StatsContext` owns all mutable state and is passed explicitly to
//! callers. Player data is replaced wholesale by [`StatsContext::reload`];
//! every operation that changes player files invalidates the affected
//! cache entries itself.

use crate::cache::{CacheStats, StatsCache};
use crate::compiler::SumPlan;
use crate::config::{ConfigFile, MergeConfig, ServerPaths, Settings};
use crate::datapack::DatapackWriter;
use crate::error::{Result, StatError};
use crate::player::{PlayerRecord, UuidMapping};
use crate::preset::{Preset, PresetTable};
use crate::ranking::{rank, PlayerTarget, RankQuery, Ranking};
use crate::records::{GenKind, GenPayload, GenRecord};
use crate::scoreboard::{default_display_name, CommandSink, ScoreboardService};
use crate::stat_key::StatKey;
use crate::tree::{StatTree, StatsFile};
use crate::version::FormatVersion;
use std::collections::BTreeMap;

/// Everything the aggregation, generation and scoreboard operations
/// work on.
///
/// # Examples
///
/// ```rust
/// use scorecraft::{PlayerTarget, RankQuery, ServerPaths, Settings, StatsContext};
///
/// let root = tempfile::tempdir().unwrap();
/// let stats = root.path().join("server/world/stats");
/// std::fs::create_dir_all(&stats).unwrap();
/// std::fs::write(
///     stats.join("uuid-a.json"),
///     r#"{"stats": {"minecraft:mined": {"minecraft:stone": 10}}}"#,
/// ).unwrap();
/// std::fs::write(
///     root.path().join("server/usercache.json"),
///     r#"[{"name": "Alice", "uuid": "uuid-a"}]"#,
/// ).unwrap();
///
/// let mut ctx = StatsContext::open(ServerPaths::new(root.path()), Settings::default()).unwrap();
/// ctx.reload().unwrap();
///
/// let target = PlayerTarget::parse("Alice");
/// assert_eq!(ctx.score(&target, "mined", "stone"), Some(10));
/// assert_eq!(ctx.rank(&RankQuery::pair("mined", "stone"), false, None).total(), 10);
/// ```
#[derive(Debug)]
pub struct StatsContext {
    paths: ServerPaths,
    settings: Settings,
    config: ConfigFile,
    uuids: UuidMapping,
    players: BTreeMap<String, PlayerRecord>,
    version: FormatVersion,
    cache: StatsCache,
    scoreboard: ScoreboardService,
}

impl StatsContext {
    /// Load the config document and prepare an empty context.
    ///
    /// No player data is read until [`StatsContext::reload`].
    pub fn open(paths: ServerPaths, settings: Settings) -> Result<Self> {
        let mut config = ConfigFile::load(&paths.config_file());
        let version = FormatVersion::unknown();
        config.presuppositions.seed_default()?;

        let datapacks = DatapackWriter::new(
            paths.datapacks_dir(),
            &settings.plugin_id,
            settings.pack_format,
        );
        Ok(Self {
            cache: StatsCache::new(settings.cache_ttl(), settings.cache_max_entries),
            scoreboard: ScoreboardService::new(datapacks, &settings.scoreboard_name),
            paths,
            settings,
            config,
            uuids: UuidMapping::default(),
            players: BTreeMap::new(),
            version,
        })
    }

    pub fn paths(&self) -> &ServerPaths {
        &self.paths
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn version(&self) -> FormatVersion {
        self.version
    }

    pub fn uuids(&self) -> &UuidMapping {
        &self.uuids
    }

    pub fn scoreboard(&self) -> &ScoreboardService {
        &self.scoreboard
    }

    /// Loaded players in name order.
    pub fn players(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }

    /// Look up a loaded player by name or uuid.
    pub fn player(&self, identifier: &str) -> Option<&PlayerRecord> {
        self.players.get(&self.uuids.resolve(identifier))
    }

    /// Re-read the uuid mapping and every player's stats file.
    ///
    /// Unreadable player files are skipped with a warning. Returns the
    /// number of players loaded.
    pub fn reload(&mut self) -> Result<usize> {
        self.reload_uuids()?;
        self.players.clear();
        self.cache.invalidate_all();

        let stats_dir = self.paths.stats_dir();
        if !stats_dir.is_dir() {
            tracing::warn!("Stats directory does not exist: {}", stats_dir.display());
            return Ok(0);
        }

        for (name, uuid) in self.uuids.iter() {
            let path = self.paths.player_file(uuid);
            if !path.exists() {
                continue;
            }
            match PlayerRecord::load(&path, name, uuid) {
                Ok(record) => {
                    if let Some(version) = record.data_version() {
                        if self.version.observe(version) {
                            tracing::info!(
                                "Detected data version {} (netherite={}, copper={})",
                                version,
                                self.version.has_netherite(),
                                self.version.has_copper()
                            );
                        }
                    }
                    self.cache.set_player(name, record.stats().clone());
                    self.players.insert(name.to_string(), record);
                }
                Err(e) => tracing::warn!("Skipping stats of {}: {}", name, e),
            }
        }

        self.config.presuppositions.populate_default(self.version)?;
        tracing::debug!("Loaded stats of {} players", self.players.len());
        Ok(self.players.len())
    }

    fn reload_uuids(&mut self) -> Result<()> {
        let uuid_file = self.paths.uuid_file();
        self.uuids = UuidMapping::load(&uuid_file);
        if self.uuids.is_empty() {
            self.uuids =
                UuidMapping::from_usercache(&self.paths.usercache_file(), &self.paths.stats_dir())?;
            if !self.uuids.is_empty() {
                if let Err(e) = self.uuids.save(&uuid_file) {
                    tracing::warn!("Could not save uuid mapping: {}", e);
                }
            }
        }
        Ok(())
    }

    pub fn invalidate_player(&mut self, name: &str) {
        self.cache.invalidate_player(name);
    }

    pub fn invalidate_all(&mut self) {
        self.cache.invalidate_all();
    }

    pub fn cache_stats(&self) -> Vec<(&'static str, CacheStats)> {
        self.cache.stats()
    }

    fn player_tree(&mut self, identifier: &str) -> Option<StatTree> {
        let name = self.uuids.resolve(identifier);
        if let Some(tree) = self.cache.player(&name) {
            return Some(tree);
        }
        let tree = self.players.get(&name)?.stats().clone();
        self.cache.set_player(&name, tree.clone());
        Some(tree)
    }

    fn target_tree(&mut self, target: &PlayerTarget) -> Option<StatTree> {
        match target {
            PlayerTarget::All => Some(self.sum(None).stats),
            PlayerTarget::Player(identifier) => self.player_tree(identifier),
        }
    }

    /// One value of a player (or of everyone summed, for `*`).
    pub fn score(&mut self, target: &PlayerTarget, category: &str, item: &str) -> Option<u64> {
        self.target_tree(target)?.get(category, item)
    }

    /// Every item of a category, keyed without namespace.
    pub fn category_scores(
        &mut self,
        target: &PlayerTarget,
        category: &str,
    ) -> Option<BTreeMap<String, u64>> {
        let tree = self.target_tree(target)?;
        Some(RankQuery::category(category).extract(&tree))
    }

    /// One item in every category that records it, keyed without namespace.
    pub fn item_scores(&mut self, target: &PlayerTarget, item: &str) -> Option<BTreeMap<String, u64>> {
        let tree = self.target_tree(target)?;
        Some(RankQuery::item(item).extract(&tree))
    }

    /// Leaderboard for `query`, truncated to `limit` (the configured
    /// default when `None`). The total covers the untruncated result.
    pub fn rank(&mut self, query: &RankQuery, include_bots: bool, limit: Option<usize>) -> Ranking {
        let limit = limit.unwrap_or(self.settings.default_rank_limit);
        self.full_ranking(query, include_bots).limit(limit)
    }

    fn full_ranking(&mut self, query: &RankQuery, include_bots: bool) -> Ranking {
        let key = query.cache_key();
        if let Some(ranking) = self.cache.ranking(&key, include_bots) {
            return ranking;
        }
        let ranking = rank(
            self.players.iter().map(|(name, record)| (name.as_str(), record.stats())),
            query,
            include_bots,
        );
        self.cache.set_ranking(&key, include_bots, ranking.clone());
        ranking
    }

    /// Merge the stats of the named players, or of everyone with `None`.
    ///
    /// The newest `DataVersion` among them (last in name order) is kept.
    pub fn sum(&mut self, players: Option<&[String]>) -> StatsFile {
        if let Some(sum) = self.cache.sum(players) {
            return sum;
        }
        let wanted: Option<Vec<String>> =
            players.map(|names| names.iter().map(|n| self.uuids.resolve(n)).collect());
        let sum = StatsFile::merge(
            self.players
                .iter()
                .filter(|(name, _)| wanted.as_ref().map_or(true, |w| w.contains(name)))
                .map(|(_, record)| &record.file),
        );
        self.cache.set_sum(players, sum.clone());
        sum
    }

    /// Write a player's stats file and refresh the loaded copy.
    pub fn save_player(&mut self, record: PlayerRecord) -> Result<()> {
        record.file.write_to(&self.paths.player_file(&record.uuid))?;
        if self.uuids.uuid(&record.name).is_none() {
            self.uuids.insert(record.name.clone(), record.uuid.clone());
        }
        self.cache.invalidate_player(&record.name);
        tracing::debug!("Saved stats of {}", record.name);
        self.players.insert(record.name.clone(), record);
        Ok(())
    }

    /// Delete a player's stats file. Returns `false` when the player or
    /// the file is unknown.
    pub fn delete_player(&mut self, identifier: &str) -> Result<bool> {
        let name = self.uuids.resolve(identifier);
        let Some(uuid) = self.uuids.uuid(&name).map(str::to_string) else {
            return Ok(false);
        };
        let removed = crate::fs::remove_path(&self.paths.player_file(&uuid))?;
        self.players.remove(&name);
        self.cache.invalidate_player(&name);
        if removed {
            tracing::info!("Deleted stats of {}", name);
        }
        Ok(removed)
    }

    pub fn save_config(&self) -> Result<()> {
        self.config.save(&self.paths.config_file())
    }

    // Presets

    pub fn presets(&self) -> &PresetTable {
        &self.config.presuppositions
    }

    pub fn preset(&self, id: &str) -> Option<&Preset> {
        self.config.presuppositions.get(id)
    }

    pub fn create_preset(
        &mut self,
        id: &str,
        display_name: Option<&str>,
        prefix_dummy: Option<&str>,
        prefix_true: Option<&str>,
    ) -> Result<()> {
        self.config
            .presuppositions
            .create(id, display_name, prefix_dummy, prefix_true)?;
        self.save_config()
    }

    pub fn remove_preset(&mut self, id: &str) -> Result<Preset> {
        let preset = self.config.presuppositions.remove(id)?;
        self.save_config()?;
        Ok(preset)
    }

    pub fn add_preset_item(&mut self, id: &str, category: &str, item: &str) -> Result<bool> {
        let added = self.config.presuppositions.add_item(id, category, item)?;
        if added {
            self.save_config()?;
        }
        Ok(added)
    }

    pub fn remove_preset_item(&mut self, id: &str, category: &str, item: &str) -> Result<bool> {
        let removed = self.config.presuppositions.remove_item(id, category, item)?;
        if removed {
            self.save_config()?;
        }
        Ok(removed)
    }

    pub fn clear_preset_items(&mut self, id: &str) -> Result<()> {
        self.config.presuppositions.clear_items(id)?;
        self.save_config()
    }

    // Snapshots

    /// Snapshot the merged stats of `players` (everyone with `None`).
    pub fn gen_sum(&mut self, note: Option<&str>, players: Option<&[String]>) -> Result<GenRecord> {
        let sum = self.sum(players);
        let record = self
            .config
            .gen_list
            .create(&self.paths.gen_dirs(), GenPayload::Sum(&sum), note)?;
        self.save_config()?;
        Ok(record)
    }

    /// Snapshot the whole stats directory.
    pub fn gen_record(&mut self, note: Option<&str>) -> Result<GenRecord> {
        let stats_dir = self.paths.stats_dir();
        let record = self
            .config
            .gen_list
            .create(&self.paths.gen_dirs(), GenPayload::Record(&stats_dir), note)?;
        self.save_config()?;
        Ok(record)
    }

    /// Diff two snapshots of `kind`; `None` if either id is unknown.
    pub fn gen_minus(&mut self, kind: GenKind, first: &str, second: &str) -> Result<Option<GenRecord>> {
        let record = self
            .config
            .gen_list
            .diff(&self.paths.gen_dirs(), kind, first, second)?;
        if record.is_some() {
            self.save_config()?;
        }
        Ok(record)
    }

    /// Delete snapshots; `None` selects every kind or every id.
    pub fn delete_gen(&mut self, kind: Option<GenKind>, id: Option<&str>) -> Result<Vec<GenRecord>> {
        let deleted = self.config.gen_list.delete(kind, id)?;
        self.save_config()?;
        Ok(deleted)
    }

    pub fn list_gen(&self, kind: Option<GenKind>) -> Vec<(GenKind, &str, &GenRecord)> {
        self.config.gen_list.list(kind)
    }

    // Player merge

    pub fn merge_config(&self) -> &MergeConfig {
        &self.config.merge_list
    }

    pub fn add_merge_input(&mut self, player: &str) -> Result<bool> {
        let added = self.config.merge_list.add_input(player);
        if added {
            self.save_config()?;
        }
        Ok(added)
    }

    pub fn remove_merge_input(&mut self, player: &str) -> Result<bool> {
        let removed = self.config.merge_list.remove_input(player);
        if removed {
            self.save_config()?;
        }
        Ok(removed)
    }

    pub fn clear_merge_inputs(&mut self) -> Result<()> {
        self.config.merge_list.clear_inputs();
        self.save_config()
    }

    pub fn set_merge_output(&mut self, player: &str) -> Result<()> {
        self.config.merge_list.set_output(player);
        self.save_config()
    }

    /// Fold every input player, plus the output's own data, into the
    /// output player's file, then delete the other inputs' files.
    pub fn execute_merge(&mut self) -> Result<PlayerRecord> {
        let merge = self.config.merge_list.clone();
        merge.validate()?;
        self.reload()?;

        let output = self.uuids.resolve(&merge.output);
        let mut names: Vec<String> = Vec::new();
        for name in merge.input.iter().map(|p| self.uuids.resolve(p)).chain([output.clone()]) {
            if !names.contains(&name) {
                names.push(name);
            }
        }

        let files: Vec<&StatsFile> = names
            .iter()
            .filter_map(|name| self.players.get(name))
            .map(|record| &record.file)
            .collect();
        if files.is_empty() {
            return Err(StatError::UnknownPlayer(names.join(", ")));
        }
        let merged = StatsFile::merge(files);

        let uuid = self
            .uuids
            .uuid(&output)
            .map(str::to_string)
            .ok_or_else(|| StatError::UnknownPlayer(output.clone()))?;
        let record = PlayerRecord::new(output.clone(), uuid, merged);
        self.save_player(record.clone())?;

        for name in names.iter().filter(|name| **name != output) {
            self.delete_player(name)?;
        }
        tracing::info!("Merged {} into {}", merge.input.join(", "), output);
        Ok(record)
    }

    // Scoreboards

    /// Create a single objective for one stat and fill it from the ranking.
    ///
    /// Defaults: the configured scoreboard name as objective and
    /// `§e{category}§r.§b{item}§r` as label.
    pub fn create_scoreboard(
        &mut self,
        sink: &mut impl CommandSink,
        category: &str,
        item: &str,
        display_name: Option<&str>,
        objective: Option<&str>,
        include_bots: bool,
    ) -> Ranking {
        let (category, item) = (StatKey::new(category), StatKey::new(item));
        let ranking = self.full_ranking(
            &RankQuery::ByPair {
                category: category.clone(),
                item: item.clone(),
            },
            include_bots,
        );
        let display = display_name
            .map(str::to_string)
            .unwrap_or_else(|| default_display_name(&category, &item));
        let objective = objective.unwrap_or(&self.settings.scoreboard_name);
        self.scoreboard
            .create_scoreboard(sink, objective, &category, &item, &display, &ranking);
        ranking
    }

    pub fn set_display(&mut self, sink: &mut impl CommandSink, objective: Option<&str>) {
        self.scoreboard.set_display(sink, objective);
    }

    pub fn remove_scoreboard(&self, sink: &mut impl CommandSink, objective: &str) {
        self.scoreboard.remove_scoreboard(sink, objective);
    }

    fn preset_snapshot(&self, id: &str) -> Result<Preset> {
        self.config
            .presuppositions
            .get(id)
            .cloned()
            .ok_or_else(|| StatError::PresetNotFound(id.to_string()))
    }

    /// Enable the sum scoreboard of a preset. Returns the seeded totals.
    pub fn enable_sum(
        &mut self,
        sink: &mut impl CommandSink,
        preset_id: &str,
        include_bots: bool,
    ) -> Result<BTreeMap<String, u64>> {
        let mut preset = self.preset_snapshot(preset_id)?;
        preset.refresh_abbreviations()?;

        let mut rankings: BTreeMap<(StatKey, StatKey), Ranking> = BTreeMap::new();
        for source in SumPlan::new(&preset).sources {
            let query = RankQuery::ByPair {
                category: source.category.clone(),
                item: source.item.clone(),
            };
            let ranking = self.full_ranking(&query, include_bots);
            rankings.insert((source.category, source.item), ranking);
        }

        self.scoreboard
            .enable_sum(sink, &preset, self.version, |category, item| {
                rankings
                    .get(&(category.clone(), item.clone()))
                    .cloned()
                    .unwrap_or_default()
            })
    }

    /// Disable the sum scoreboard of a preset.
    pub fn disable_sum(&mut self, sink: &mut impl CommandSink, preset_id: &str) -> Result<()> {
        let preset = self.preset_snapshot(preset_id)?;
        self.scoreboard.disable_sum(sink, &preset)
    }
}
