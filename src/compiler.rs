//! Compiles a preset into scoreboard commands.
//!
//! The game can only copy one objective into another (`=`) or add one to
//! another (`+=`), per entity. Summing `n` source objectives therefore
//! becomes a chain of accumulators:
//!
//! ```text
//! acc1  = s0      acc1 += s1
//! acc2  = acc1    acc2 += s2
//! ...
//! minor = acc(n-1)
//! total = minor
//! ```
//!
//! One source copies straight into `minor`; zero sources produce no
//! operations at all.

use crate::preset::Preset;
use crate::stat_key::StatKey;
use std::collections::BTreeMap;
use std::fmt;

/// Name of the register the chain copies its result into first.
pub const MINOR_REGISTER: &str = "minor";
/// Name of the externally visible result register.
pub const TOTAL_REGISTER: &str = "total";

/// Quote text as a JSON text component: `{"text": "..."}`.
pub fn json_text(text: &str) -> String {
    format!(
        "{{\"text\": {}}}",
        serde_json::Value::String(text.to_string())
    )
}

pub(crate) fn add_stat_objective(name: &str, category: &StatKey, item: &StatKey, display: &str) -> String {
    format!(
        "scoreboard objectives add {} {}:{} {}",
        name,
        category.criterion_part(),
        item.criterion_part(),
        json_text(display)
    )
}

pub(crate) fn add_dummy_objective(name: &str) -> String {
    format!("scoreboard objectives add {} dummy", name)
}

pub(crate) fn remove_objective(name: &str) -> String {
    format!("scoreboard objectives remove {}", name)
}

pub(crate) fn set_sidebar(name: Option<&str>) -> String {
    match name {
        Some(name) => format!("scoreboard objectives setdisplay sidebar {}", name),
        None => "scoreboard objectives setdisplay sidebar".to_string(),
    }
}

pub(crate) fn set_display_name(name: &str, display: &str) -> String {
    format!(
        "scoreboard objectives modify {} displayname {}",
        name,
        json_text(display)
    )
}

pub(crate) fn set_score(player: &str, objective: &str, value: u64) -> String {
    format!("scoreboard players set {} {} {}", player, objective, value)
}

/// Clears the total of every entity whose total is exactly zero.
pub(crate) fn reset_zero_total(total: &str) -> String {
    format!(
        "execute as @a[scores={{{}=0}}] run scoreboard players reset @s {}",
        total, total
    )
}

/// A per-entity scoreboard operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// `target := source`
    Assign,
    /// `target += source`
    Add,
}

impl OpKind {
    pub fn symbol(self) -> &'static str {
        match self {
            OpKind::Assign => "=",
            OpKind::Add => "+=",
        }
    }
}

/// One `(target, op, source)` step of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operation {
    pub target: String,
    pub op: OpKind,
    pub source: String,
}

impl Operation {
    pub fn assign(target: &str, source: &str) -> Self {
        Self {
            target: target.to_string(),
            op: OpKind::Assign,
            source: source.to_string(),
        }
    }

    pub fn add(target: &str, source: &str) -> Self {
        Self {
            target: target.to_string(),
            op: OpKind::Add,
            source: source.to_string(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "execute as @a run scoreboard players operation @s {} {} @s {}",
            self.target,
            self.op.symbol(),
            self.source
        )
    }
}

/// A compiled summation chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulationChain {
    /// Intermediate registers, `n - 1` of them for `n >= 2` sources.
    pub accumulators: Vec<String>,
    pub minor: String,
    pub total: String,
    pub operations: Vec<Operation>,
}

impl AccumulationChain {
    /// Every dummy register the chain writes to, declaration order.
    pub fn registers(&self) -> Vec<String> {
        self.accumulators
            .iter()
            .cloned()
            .chain([self.minor.clone(), self.total.clone()])
            .collect()
    }

    /// Rendered operation commands, in execution order.
    pub fn commands(&self) -> Vec<String> {
        self.operations.iter().map(Operation::to_string).collect()
    }

    /// Run the operations for one entity. Registers absent from `scores`
    /// read as zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scorecraft::compiler::compile_chain;
    /// use std::collections::BTreeMap;
    ///
    /// let chain = compile_chain(&["a", "b", "c"], "d");
    /// let scores = BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 2), ("c".to_string(), 4)]);
    /// let after = chain.evaluate(&scores);
    /// assert_eq!(after["d_total"], 7);
    /// ```
    pub fn evaluate(&self, scores: &BTreeMap<String, i64>) -> BTreeMap<String, i64> {
        let mut registers = scores.clone();
        for operation in &self.operations {
            let value = registers.get(&operation.source).copied().unwrap_or(0);
            let target = registers.entry(operation.target.clone()).or_insert(0);
            match operation.op {
                OpKind::Assign => *target = value,
                OpKind::Add => *target = target.saturating_add(value),
            }
        }
        registers
    }
}

/// Compile the summation of `sources` into `{dummy_prefix}_*` registers.
///
/// Accumulators are named by position (`{prefix}_acc1`, `{prefix}_acc2`,
/// ...), so the same source order always yields the same command text.
///
/// # Examples
///
/// ```rust
/// use scorecraft::compiler::compile_chain;
///
/// let chain = compile_chain(&["t_a", "t_b", "t_c", "t_d"], "d");
/// assert_eq!(chain.accumulators, ["d_acc1", "d_acc2", "d_acc3"]);
///
/// let single = compile_chain(&["t_a"], "d");
/// assert!(single.accumulators.is_empty());
/// assert_eq!(single.operations.len(), 2);
/// ```
pub fn compile_chain<S: AsRef<str>>(sources: &[S], dummy_prefix: &str) -> AccumulationChain {
    let minor = format!("{}_{}", dummy_prefix, MINOR_REGISTER);
    let total = format!("{}_{}", dummy_prefix, TOTAL_REGISTER);
    let accumulators: Vec<String> = (1..sources.len())
        .map(|k| format!("{}_acc{}", dummy_prefix, k))
        .collect();

    let operations = match sources.split_first() {
        None => Vec::new(),
        Some((first, rest)) => {
            let seed = (first.as_ref().to_string(), Vec::new());
            let (last, mut operations) = rest.iter().zip(&accumulators).fold(
                seed,
                |(previous, mut operations), (source, accumulator)| {
                    operations.push(Operation::assign(accumulator, &previous));
                    operations.push(Operation::add(accumulator, source.as_ref()));
                    (accumulator.clone(), operations)
                },
            );
            operations.push(Operation::assign(&minor, &last));
            operations.push(Operation::assign(&total, &minor));
            operations
        }
    };

    AccumulationChain {
        accumulators,
        minor,
        total,
        operations,
    }
}

/// A source objective fed by one tracked stat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SumSource {
    pub category: StatKey,
    pub item: StatKey,
    /// `{prefix_true}_{abbreviation}`
    pub objective: String,
}

/// Everything needed to enable or disable one preset's sum scoreboard.
///
/// `removing` undoes exactly what the source objectives plus `creating`
/// declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SumPlan {
    pub sources: Vec<SumSource>,
    pub chain: AccumulationChain,
    pub creating: Vec<String>,
    pub removing: Vec<String>,
}

impl SumPlan {
    /// Build the plan from a preset's current entries and abbreviations.
    pub fn new(preset: &Preset) -> Self {
        let sources: Vec<SumSource> = preset
            .entries()
            .into_iter()
            .map(|entry| SumSource {
                objective: format!("{}_{}", preset.prefix_true, entry.abbreviation),
                category: entry.category,
                item: entry.item,
            })
            .collect();
        let true_names = sources.iter().map(|s| s.objective.as_str()).collect::<Vec<_>>();
        let chain = compile_chain(&true_names, &preset.prefix_dummy);

        let mut creating: Vec<String> = chain
            .registers()
            .iter()
            .map(|name| add_dummy_objective(name))
            .collect();
        creating.push(set_sidebar(Some(&chain.total)));
        creating.push(set_display_name(&chain.total, &preset.display_name));

        let removing = true_names
            .iter()
            .map(|name| remove_objective(name))
            .chain(chain.registers().iter().map(|name| remove_objective(name)))
            .collect();

        Self {
            sources,
            chain,
            creating,
            removing,
        }
    }

    pub fn true_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.objective.clone()).collect()
    }

    pub fn dummy_names(&self) -> Vec<String> {
        self.chain.registers()
    }

    pub fn total_name(&self) -> &str {
        &self.chain.total
    }

    /// The per-tick function body: the chain followed by the zero reset.
    /// Empty when the preset tracks nothing.
    pub fn script(&self) -> Vec<String> {
        if self.chain.operations.is_empty() {
            return Vec::new();
        }
        let mut script = self.chain.commands();
        script.push(reset_zero_total(&self.chain.total));
        script
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_sources() {
        let chain = compile_chain(&["s0", "s1", "s2", "s3"], "d");
        assert_eq!(chain.accumulators.len(), 3);
        let ops = &chain.operations;
        assert_eq!(ops[0], Operation::assign("d_acc1", "s0"));
        assert_eq!(ops[1], Operation::add("d_acc1", "s1"));
        assert_eq!(ops[2], Operation::assign("d_acc2", "d_acc1"));
        assert_eq!(ops[3], Operation::add("d_acc2", "s2"));
        let n = ops.len();
        assert_eq!(ops[n - 2], Operation::assign("d_minor", "d_acc3"));
        assert_eq!(ops[n - 1], Operation::assign("d_total", "d_minor"));
    }

    #[test]
    fn test_single_source_copies() {
        let chain = compile_chain(&["s0"], "d");
        assert!(chain.accumulators.is_empty());
        assert_eq!(
            chain.operations,
            vec![
                Operation::assign("d_minor", "s0"),
                Operation::assign("d_total", "d_minor"),
            ]
        );
    }

    #[test]
    fn test_no_sources() {
        let chain = compile_chain::<&str>(&[], "d");
        assert!(chain.operations.is_empty());
        assert_eq!(chain.registers(), vec!["d_minor", "d_total"]);
    }

    #[test]
    fn test_operation_rendering() {
        assert_eq!(
            Operation::add("d_acc1", "dt_dp").to_string(),
            "execute as @a run scoreboard players operation @s d_acc1 += @s dt_dp"
        );
    }

    #[test]
    fn test_json_text_escapes() {
        assert_eq!(json_text("Total"), r#"{"text": "Total"}"#);
        assert_eq!(json_text("a\"b"), r#"{"text": "a\"b"}"#);
    }

    #[test]
    fn test_stat_objective_command() {
        let cmd = add_stat_objective("t_dp", &StatKey::new("used"), &StatKey::new("diamond_pickaxe"), "dp");
        assert_eq!(
            cmd,
            r#"scoreboard objectives add t_dp minecraft.used:minecraft.diamond_pickaxe {"text": "dp"}"#
        );
    }

    #[test]
    fn test_sum_plan_creating_and_removing_match() {
        let mut preset = Preset::new("mining", Some("Mining"), Some("m"), Some("mt"));
        preset.add_item("mined", "stone").unwrap();
        preset.add_item("mined", "dirt").unwrap();
        let plan = SumPlan::new(&preset);

        assert_eq!(plan.true_names(), vec!["mt_dirt", "mt_stone"]);
        assert_eq!(plan.dummy_names(), vec!["m_acc1", "m_minor", "m_total"]);
        assert_eq!(
            plan.creating,
            vec![
                "scoreboard objectives add m_acc1 dummy",
                "scoreboard objectives add m_minor dummy",
                "scoreboard objectives add m_total dummy",
                "scoreboard objectives setdisplay sidebar m_total",
                r#"scoreboard objectives modify m_total displayname {"text": "Mining"}"#,
            ]
        );
        assert_eq!(plan.removing.len(), 5);
        assert_eq!(plan.removing[0], "scoreboard objectives remove mt_dirt");

        let script = plan.script();
        assert_eq!(
            script.last().unwrap(),
            "execute as @a[scores={m_total=0}] run scoreboard players reset @s m_total"
        );
    }

    #[test]
    fn test_empty_preset_has_empty_script() {
        let preset = Preset::new("empty", None, None, None);
        assert!(SumPlan::new(&preset).script().is_empty());
    }

    #[test]
    fn test_evaluate_overwrites_stale_accumulators() {
        let chain = compile_chain(&["a", "b"], "d");
        let scores = BTreeMap::from([
            ("a".to_string(), 3),
            ("b".to_string(), 4),
            ("d_acc1".to_string(), 100),
        ]);
        let after = chain.evaluate(&scores);
        assert_eq!(after["d_acc1"], 7);
        assert_eq!(after["d_total"], 7);
    }
}
