//! Sum scoreboard example: compiling a preset into commands and a datapack
//!
//! This example demonstrates:
//! - Creating a preset and adding stats to it
//! - Enabling the sum scoreboard (commands go to a `CommandSink`)
//! - The generated tick function
//! - Snapshots and their diff

use scorecraft::*;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Prints every command instead of sending it to a server.
struct Console;

impl CommandSink for Console {
    fn execute(&mut self, command: &str) {
        println!("  /{}", command);
    }
}

fn write(path: &Path, json: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let root = tempfile::tempdir()?;
    let paths = ServerPaths::new(root.path());
    write(
        &paths.player_file("uuid-notch"),
        r#"{"stats": {"minecraft:mined": {"minecraft:stone": 120, "minecraft:deepslate": 40}, "minecraft:used": {"minecraft:iron_pickaxe": 160}}, "DataVersion": 4189}"#,
    )?;
    write(&paths.uuid_file(), r#"{"Notch": "uuid-notch"}"#)?;

    let mut ctx = StatsContext::open(paths, Settings::default())?;
    ctx.reload()?;

    // ===== Preset =====
    ctx.create_preset("digging", Some("§6Digging§r"), None, None)?;
    for (category, item) in [("mined", "stone"), ("mined", "deepslate"), ("used", "iron_pickaxe")] {
        ctx.add_preset_item("digging", category, item)?;
    }
    if let Some(preset) = ctx.preset("digging") {
        for entry in preset.entries() {
            println!("{}:{} -> {}", entry.category, entry.item, entry.abbreviation);
        }
    }

    // ===== Enable =====
    println!("\nEnabling:");
    let totals = ctx.enable_sum(&mut Console, "digging", false)?;
    println!("Seeded totals: {:?}", totals);

    let pack = ctx.scoreboard().datapacks().pack_dir("digging");
    let layout = scorecraft::datapack::DatapackLayout::new(&ctx.settings().plugin_id, "digging", ctx.version());
    println!("\n{}:", layout.function_file().display());
    println!("{}", std::fs::read_to_string(pack.join(layout.function_file()))?);

    // ===== Snapshots =====
    let before = ctx.gen_sum(Some("before"), None)?;
    let mut notch = ctx.player("Notch").cloned().ok_or("Notch not loaded")?;
    notch.file.stats.add("mined", "stone", 30);
    ctx.save_player(notch)?;
    let after = ctx.gen_sum(Some("after"), None)?;
    if let Some(minus) = ctx.gen_minus(GenKind::Sum, &before.time, &after.time)? {
        println!("\nDiff written to {}", minus.abs_path);
        println!("{}", std::fs::read_to_string(&minus.abs_path)?);
    }

    // ===== Disable =====
    println!("\nDisabling:");
    ctx.disable_sum(&mut Console, "digging")?;
    Ok(())
}
