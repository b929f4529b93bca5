//! Basic example: loading a server's stats and querying them
//!
//! This example demonstrates:
//! - Building a throwaway server directory
//! - Reloading players through the usercache
//! - Score lookups, rankings and whole-server sums
//!
//! Run with `RUST_LOG=scorecraft=debug` to see what the context does.

use scorecraft::*;
use std::path::Path;
use tracing_subscriber::EnvFilter;

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
        &paths.player_file("uuid-alice"),
        r#"{"stats": {"minecraft:mined": {"minecraft:stone": 10, "minecraft:dirt": 3}}, "DataVersion": 3953}"#,
    )?;
    write(
        &paths.player_file("uuid-bob"),
        r#"{"stats": {"minecraft:mined": {"minecraft:stone": 4}, "minecraft:used": {"minecraft:diamond_pickaxe": 2}}}"#,
    )?;
    write(
        &paths.usercache_file(),
        r#"[{"name": "Alice", "uuid": "uuid-alice"}, {"name": "Bob", "uuid": "uuid-bob"}]"#,
    )?;

    let mut ctx = StatsContext::open(paths, Settings::default())?;
    let loaded = ctx.reload()?;
    println!("Loaded {} players (data version {:?})\n", loaded, ctx.version().get());

    // ===== Single lookups =====
    let alice = PlayerTarget::parse("Alice");
    println!("Alice mined stone: {:?}", ctx.score(&alice, "mined", "stone"));
    println!("Alice mined dirt:  {:?}", ctx.score(&alice, "minecraft:mined", "minecraft:dirt"));
    println!("Everyone, stone:   {:?}\n", ctx.score(&PlayerTarget::All, "mined", "stone"));

    // ===== Rankings =====
    for query in [
        RankQuery::pair("mined", "stone"),
        RankQuery::category("mined"),
        RankQuery::item("diamond_pickaxe"),
    ] {
        let ranking = ctx.rank(&query, false, None);
        println!("{} (total {})", query.cache_key(), ranking.total());
        for (i, (name, value)) in ranking.entries().iter().enumerate() {
            println!("  {}. {} - {}", i + 1, name, value);
        }
    }

    // ===== Sums =====
    let sum = ctx.sum(None);
    println!("\nServer sum: {}", serde_json::to_string(&sum)?);

    for (name, stats) in ctx.cache_stats() {
        println!("cache {}: {}", name, stats);
    }
    Ok(())
}
