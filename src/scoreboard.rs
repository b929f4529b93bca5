//! Issuing scoreboard commands to the game server.
//!
//! The server itself sits behind [`CommandSink`]; this module only decides
//! which commands to send and in what order.

use crate::compiler::{self, SumPlan};
use crate::datapack::DatapackWriter;
use crate::error::Result;
use crate::preset::Preset;
use crate::ranking::Ranking;
use crate::stat_key::StatKey;
use crate::version::FormatVersion;
use std::collections::BTreeMap;

/// Destination for server commands.
///
/// # Examples
///
/// ```rust
/// use scorecraft::CommandSink;
///
/// let mut sink: Vec<String> = Vec::new();
/// sink.execute("reload");
/// assert_eq!(sink, vec!["reload"]);
/// ```
pub trait CommandSink {
    /// Send one command, without the leading slash.
    fn execute(&mut self, command: &str);
}

/// Collects commands in order, for tests and dry runs.
impl CommandSink for Vec<String> {
    fn execute(&mut self, command: &str) {
        self.push(command.to_string());
    }
}

impl<T: CommandSink + ?Sized> CommandSink for &mut T {
    fn execute(&mut self, command: &str) {
        (**self).execute(command);
    }
}

/// Sidebar label used when a single scoreboard is created without one.
pub fn default_display_name(category: &StatKey, item: &StatKey) -> String {
    format!("§e{}§r.§b{}§r", category.display(), item.display())
}

/// Creates, displays and removes objectives, and toggles sum scoreboards.
#[derive(Debug, Clone)]
pub struct ScoreboardService {
    datapacks: DatapackWriter,
    current_display: Option<String>,
}

impl ScoreboardService {
    pub fn new(datapacks: DatapackWriter, default_display: &str) -> Self {
        Self {
            datapacks,
            current_display: Some(default_display.to_string()),
        }
    }

    pub fn datapacks(&self) -> &DatapackWriter {
        &self.datapacks
    }

    /// Objective currently shown on the sidebar, as last set through this
    /// service.
    pub fn current_display(&self) -> Option<&str> {
        self.current_display.as_deref()
    }

    /// Recreate `objective` for one stat and seed it from `scores`.
    ///
    /// The objective is removed first, so repeated calls never fail on an
    /// existing name.
    pub fn create_scoreboard(
        &self,
        sink: &mut impl CommandSink,
        objective: &str,
        category: &StatKey,
        item: &StatKey,
        display_name: &str,
        scores: &Ranking,
    ) {
        sink.execute(&compiler::remove_objective(objective));
        sink.execute(&compiler::add_stat_objective(
            objective,
            category,
            item,
            display_name,
        ));
        for (player, value) in scores.entries() {
            sink.execute(&compiler::set_score(player, objective, *value));
        }
        tracing::debug!(
            "Created objective {} with {} scores",
            objective,
            scores.len()
        );
    }

    /// Show `objective` on the sidebar, or clear the sidebar with `None`.
    pub fn set_display(&mut self, sink: &mut impl CommandSink, objective: Option<&str>) {
        sink.execute(&compiler::set_sidebar(objective));
        self.current_display = objective.map(str::to_string);
    }

    pub fn remove_scoreboard(&self, sink: &mut impl CommandSink, objective: &str) {
        sink.execute(&compiler::remove_objective(objective));
    }

    /// Turn on the sum scoreboard for `preset`.
    ///
    /// `score_of` supplies the current ranking for every source stat; the
    /// per-player sums seed the total before the datapack takes over.
    /// Any previous instance is torn down first. Returns the seeded totals.
    pub fn enable_sum<F>(
        &mut self,
        sink: &mut impl CommandSink,
        preset: &Preset,
        version: FormatVersion,
        mut score_of: F,
    ) -> Result<BTreeMap<String, u64>>
    where
        F: FnMut(&StatKey, &StatKey) -> Ranking,
    {
        self.disable_sum(sink, preset)?;

        let plan = SumPlan::new(preset);
        let mut totals: BTreeMap<String, u64> = BTreeMap::new();
        for source in &plan.sources {
            let scores = score_of(&source.category, &source.item);
            let display = default_display_name(&source.category, &source.item);
            self.create_scoreboard(
                sink,
                &source.objective,
                &source.category,
                &source.item,
                &display,
                &scores,
            );
            for (player, value) in scores.entries() {
                let total = totals.entry(player.clone()).or_insert(0);
                *total = total.saturating_add(*value);
            }
        }

        for command in &plan.creating {
            sink.execute(command);
        }
        for (player, total) in &totals {
            sink.execute(&compiler::set_score(player, plan.total_name(), *total));
        }
        self.current_display = Some(plan.total_name().to_string());

        self.datapacks.write(&preset.id, version, &plan.script())?;
        sink.execute("reload");
        tracing::info!(
            "Enabled sum scoreboard {} over {} stats",
            preset.id,
            plan.sources.len()
        );
        Ok(totals)
    }

    /// Turn off the sum scoreboard for `preset`. Safe to call when it was
    /// never enabled.
    pub fn disable_sum(&mut self, sink: &mut impl CommandSink, preset: &Preset) -> Result<()> {
        let plan = SumPlan::new(preset);
        for command in &plan.removing {
            sink.execute(command);
        }
        self.datapacks.remove(&preset.id)?;
        sink.execute("reload");
        if self.current_display.as_deref() == Some(plan.total_name()) {
            self.current_display = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::{rank, RankQuery};
    use crate::tree::StatTree;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> ScoreboardService {
        ScoreboardService::new(DatapackWriter::new(dir.path(), "statspro", 4), "StatsPro")
    }

    fn mining_preset() -> Preset {
        let mut preset = Preset::new("mining", Some("Mining"), Some("m"), Some("mt"));
        preset.add_item("mined", "stone").unwrap();
        preset.add_item("mined", "dirt").unwrap();
        preset
    }

    #[test]
    fn test_create_scoreboard_commands() {
        let dir = TempDir::new().unwrap();
        let mut alice = StatTree::new();
        alice.insert("mined", "stone", 10);
        let scores = rank([("Alice", &alice)], &RankQuery::pair("mined", "stone"), false);

        let mut sink: Vec<String> = Vec::new();
        service(&dir).create_scoreboard(
            &mut sink,
            "StatsPro",
            &StatKey::new("mined"),
            &StatKey::new("stone"),
            "Stone",
            &scores,
        );
        assert_eq!(
            sink,
            vec![
                "scoreboard objectives remove StatsPro",
                r#"scoreboard objectives add StatsPro minecraft.mined:minecraft.stone {"text": "Stone"}"#,
                "scoreboard players set Alice StatsPro 10",
            ]
        );
    }

    #[test]
    fn test_set_display_tracks_current() {
        let dir = TempDir::new().unwrap();
        let mut service = service(&dir);
        let mut sink: Vec<String> = Vec::new();
        service.set_display(&mut sink, Some("mt_stone"));
        assert_eq!(service.current_display(), Some("mt_stone"));
        service.set_display(&mut sink, None);
        assert_eq!(service.current_display(), None);
        assert_eq!(sink[1], "scoreboard objectives setdisplay sidebar");
    }

    #[test]
    fn test_enable_sum_seeds_totals_and_writes_pack() {
        let dir = TempDir::new().unwrap();
        let mut service = service(&dir);
        let preset = mining_preset();

        let mut alice = StatTree::new();
        alice.insert("mined", "stone", 10);
        alice.insert("mined", "dirt", 5);
        let mut bob = StatTree::new();
        bob.insert("mined", "stone", 4);

        let mut sink: Vec<String> = Vec::new();
        let totals = service
            .enable_sum(&mut sink, &preset, FormatVersion::new(3000), |category, item| {
                rank(
                    [("Alice", &alice), ("Bob", &bob)],
                    &RankQuery::ByPair {
                        category: category.clone(),
                        item: item.clone(),
                    },
                    false,
                )
            })
            .unwrap();

        assert_eq!(totals["Alice"], 15);
        assert_eq!(totals["Bob"], 4);
        assert!(sink.contains(&"scoreboard players set Alice m_total 15".to_string()));
        assert_eq!(sink.last().unwrap(), "reload");
        assert!(service.datapacks().exists("mining"));
        assert_eq!(service.current_display(), Some("m_total"));

        // teardown of the previous instance comes first
        assert_eq!(sink[0], "scoreboard objectives remove mt_dirt");
    }

    #[test]
    fn test_enable_twice_tears_down_first() {
        let dir = TempDir::new().unwrap();
        let mut service = service(&dir);
        let preset = mining_preset();
        let mut sink: Vec<String> = Vec::new();
        service
            .enable_sum(&mut sink, &preset, FormatVersion::unknown(), |_, _| Ranking::default())
            .unwrap();
        let first_len = sink.len();
        service
            .enable_sum(&mut sink, &preset, FormatVersion::unknown(), |_, _| Ranking::default())
            .unwrap();
        assert_eq!(sink.len(), first_len * 2);
        assert_eq!(sink[first_len], "scoreboard objectives remove mt_dirt");
    }

    #[test]
    fn test_disable_without_pack_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut service = service(&dir);
        let mut sink: Vec<String> = Vec::new();
        service.disable_sum(&mut sink, &mining_preset()).unwrap();
        assert_eq!(sink.last().unwrap(), "reload");
        assert!(!service.datapacks().exists("mining"));
    }
}
