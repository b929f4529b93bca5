//! Short, collision-free identifiers for stat item names.
//!
//! Scoreboard objective names are length-limited, so every tracked item
//! gets an abbreviation of at most [`MAX_ABBREVIATION_LEN`] characters.
//! Abbreviations are derived only from the set of names, so the same set
//! always yields the same mapping and register names stay stable across
//! restarts.

use crate::error::{Result, StatError};
use std::collections::{BTreeMap, BTreeSet};

/// Maximum length of an abbreviation, in characters.
pub const MAX_ABBREVIATION_LEN: usize = 6;

const ALPHABET_LEN: usize = 26;

/// Abbreviate a single name.
///
/// Multi-word names (`diamond_pickaxe`) use the first letter of every
/// word; single words are truncated.
///
/// # Examples
///
/// ```rust
/// use scorecraft::abbrev::abbreviate;
///
/// assert_eq!(abbreviate("diamond_pickaxe"), "dp");
/// assert_eq!(abbreviate("minecraft:netherite_pickaxe"), "np");
/// assert_eq!(abbreviate("shears"), "shears");
/// assert_eq!(abbreviate("cobblestone"), "cobble");
/// ```
pub fn abbreviate(name: &str) -> String {
    let name = crate::stat_key::display(name);
    if name.contains('_') {
        name.split('_')
            .filter_map(|word| word.chars().next())
            .take(MAX_ABBREVIATION_LEN)
            .collect()
    } else {
        name.chars().take(MAX_ABBREVIATION_LEN).collect()
    }
}

/// Advance the last character through the cyclic alphabet `a..=z`.
///
/// Characters outside the alphabet restart at `a`; an empty
/// abbreviation becomes `a`.
fn bump_last(abbr: &str) -> String {
    let mut chars: Vec<char> = abbr.chars().collect();
    match chars.last_mut() {
        Some(last) => {
            let lower = last.to_ascii_lowercase();
            *last = match lower {
                'z' => 'a',
                'a'..='y' => (lower as u8 + 1) as char,
                _ => 'a',
            };
        }
        None => chars.push('a'),
    }
    chars.into_iter().collect()
}

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    abbr: String,
}

/// One allocation round over the current candidates.
///
/// Candidates are sorted by abbreviation (ties by name); for each adjacent
/// equal pair the later one is bumped. Rounds repeat until every
/// abbreviation is distinct or the attempt budget runs out.
fn settle(mut slots: Vec<Slot>, attempts_left: usize, attempts: usize) -> Result<Vec<Slot>> {
    slots.sort_by(|a, b| a.abbr.cmp(&b.abbr).then_with(|| a.name.cmp(&b.name)));

    let distinct = slots.windows(2).all(|pair| pair[0].abbr != pair[1].abbr);
    if distinct {
        return Ok(slots);
    }
    if attempts_left == 0 {
        let mut names: Vec<String> = slots
            .windows(2)
            .filter(|pair| pair[0].abbr == pair[1].abbr)
            .flat_map(|pair| [pair[0].name.clone(), pair[1].name.clone()])
            .collect();
        names.dedup();
        return Err(StatError::AbbreviationExhausted { attempts, names });
    }

    for i in 0..slots.len() - 1 {
        if slots[i].abbr == slots[i + 1].abbr {
            slots[i + 1].abbr = bump_last(&slots[i + 1].abbr);
        }
    }

    settle(slots, attempts_left - 1, attempts + 1)
}

/// Allocate pairwise-distinct abbreviations for a set of names.
///
/// Duplicate input names are collapsed. The result maps every distinct
/// name to an abbreviation of at most [`MAX_ABBREVIATION_LEN`]
/// characters, and is identical for any call over the same set.
///
/// # Errors
///
/// Returns [`StatError::AbbreviationExhausted`] when no distinct
/// assignment is found within `26 × name count` rounds (for example when
/// more than 26 names share the same five-character stem).
///
/// # Examples
///
/// ```rust
/// use scorecraft::abbrev::allocate_abbreviations;
///
/// let abbrs = allocate_abbreviations(["iron_pickaxe", "iron_pick", "stone"]).unwrap();
/// assert_eq!(abbrs["iron_pick"], "ip");
/// assert_eq!(abbrs["iron_pickaxe"], "iq");
/// assert_eq!(abbrs["stone"], "stone");
/// ```
pub fn allocate_abbreviations<I, S>(names: I) -> Result<BTreeMap<String, String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let names: BTreeSet<String> = names
        .into_iter()
        .map(|name| name.as_ref().to_string())
        .collect();

    let slots: Vec<Slot> = names
        .iter()
        .map(|name| Slot {
            name: name.clone(),
            abbr: abbreviate(name),
        })
        .collect();

    let budget = ALPHABET_LEN * slots.len().max(1);
    let settled = settle(slots, budget, 0)?;

    Ok(settled
        .into_iter()
        .map(|slot| (slot.name, slot.abbr))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbreviate_skips_empty_words() {
        assert_eq!(abbreviate("_leading__double_"), "ld");
        assert_eq!(abbreviate(""), "");
    }

    #[test]
    fn test_abbreviate_truncates_initials() {
        assert_eq!(abbreviate("a_b_c_d_e_f_g_h"), "abcdef");
    }

    #[test]
    fn test_bump_last_wraps() {
        assert_eq!(bump_last("dp"), "dq");
        assert_eq!(bump_last("az"), "aa");
        assert_eq!(bump_last("a1"), "aa");
        assert_eq!(bump_last(""), "a");
    }

    #[test]
    fn test_unique_input_passes_through() {
        let abbrs = allocate_abbreviations(["diamond_pickaxe", "shears", "iron_axe"]).unwrap();
        assert_eq!(abbrs["diamond_pickaxe"], "dp");
        assert_eq!(abbrs["shears"], "shears");
        assert_eq!(abbrs["iron_axe"], "ia");
    }

    #[test]
    fn test_default_tools_are_unique() {
        let tools = crate::preset::DEFAULT_TOOLS
            .iter()
            .chain(crate::preset::NETHERITE_TOOLS.iter())
            .chain(crate::preset::COPPER_TOOLS.iter());
        let abbrs = allocate_abbreviations(tools.clone()).unwrap();
        let count = tools.count();
        assert_eq!(abbrs.len(), count);
        let distinct: BTreeSet<&String> = abbrs.values().collect();
        assert_eq!(distinct.len(), count);
        assert!(abbrs.values().all(|a| a.chars().count() <= MAX_ABBREVIATION_LEN));
    }

    #[test]
    fn test_triple_collision() {
        let abbrs = allocate_abbreviations(["stone_a", "stone_b", "stone_c"]).unwrap();
        // every name abbreviates to "sa"/"sb"/"sc" already, so no bumping
        assert_eq!(abbrs["stone_a"], "sa");

        let abbrs = allocate_abbreviations(["abcdefx", "abcdefy", "abcdefz"]).unwrap();
        let values: BTreeSet<&String> = abbrs.values().collect();
        assert_eq!(values.len(), 3);
        assert_eq!(abbrs["abcdefx"], "abcdef");
    }

    #[test]
    fn test_duplicates_collapse() {
        let abbrs = allocate_abbreviations(["stone", "stone", "minecraft:stone"]).unwrap();
        assert_eq!(abbrs.len(), 2);
    }

    #[test]
    fn test_empty_input() {
        let abbrs = allocate_abbreviations(Vec::<String>::new()).unwrap();
        assert!(abbrs.is_empty());
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        // 27 names sharing one stem cannot fit into 26 final letters
        let names: Vec<String> = (0..27).map(|i| format!("ssssss{:02}", i)).collect();
        let err = allocate_abbreviations(&names).unwrap_err();
        assert_eq!(err.code(), "abbreviation_exhausted");
    }

    #[test]
    fn test_deterministic_over_order() {
        let a = allocate_abbreviations(["iron_pick", "iron_pickaxe", "ice", "ingot"]).unwrap();
        let b = allocate_abbreviations(["ingot", "ice", "iron_pickaxe", "iron_pick"]).unwrap();
        assert_eq!(a, b);
    }
}
