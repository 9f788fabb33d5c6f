use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use env_logger::Env;
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use tileflow::samples::demo_project;
use tileflow::{GeneratedDungeon, Generator, GeneratorSettings, load_project_from_file};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Seeds the sweep; every generation seed is drawn from it
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    #[arg(short, long, default_value_t = 200)]
    runs: u32,
    /// Project to fuzz; the built-in demo when omitted
    #[arg(short, long)]
    project: Option<PathBuf>,
}

fn check_invariants(dungeon: &GeneratedDungeon, max_overlap: f32) -> Result<(), String> {
    let graph = &dungeon.graph;
    let tiles = graph.all_tiles();
    for (index, a) in tiles.iter().enumerate() {
        let a_bounds = graph.tile(*a).ok_or("dangling tile")?.proxy.bounds;
        for b in &tiles[index + 1..] {
            let b_bounds = graph.tile(*b).ok_or("dangling tile")?.proxy.bounds;
            if a_bounds.is_overlapping(b_bounds, max_overlap) {
                return Err(format!("tiles {a:?} and {b:?} overlap"));
            }
        }
    }
    for connection in graph.connections() {
        let a = graph.doorway(connection.a).ok_or("missing doorway")?;
        let b = graph.doorway(connection.b).ok_or("missing doorway")?;
        if a.connected != Some(connection.b) || b.connected != Some(connection.a) {
            return Err(format!("asymmetric connection {connection:?}"));
        }
    }
    for key in &dungeon.keys {
        let lock = dungeon.locks.get(key.lock).ok_or("key for a missing lock")?;
        let placement = &graph.tile(key.tile).ok_or("key on a missing tile")?.placement;
        if placement.normalized_path_depth > lock.depth + 1e-6 {
            return Err(format!("key {:?} lies deeper than its lock", key.key));
        }
    }
    if dungeon.stats.total_rooms != graph.len() {
        return Err("room count disagrees with the graph".to_string());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().filter_or("TILEFLOW_LOG", "warn")).init();
    let args = Args::parse();

    let project = match &args.project {
        Some(path) => load_project_from_file(path)
            .with_context(|| format!("Failed to load project: {}", path.display()))?,
        None => demo_project(),
    };
    println!("Fuzzing {} generations from sweep seed {}...", args.runs, args.seed);

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut failures = 0;
    let mut violations = Vec::new();
    for _ in 0..args.runs {
        let seed = rng.next_u64();
        let settings = GeneratorSettings { seed: Some(seed), ..project.settings.clone() };
        let max_overlap = settings.overlap_threshold;
        let mut generator = Generator::new(&project.flow, &project.library, settings)
            .context("Project failed validation")?;
        match generator.generate() {
            Ok(dungeon) => {
                if let Err(violation) = check_invariants(dungeon, max_overlap) {
                    violations.push(format!("seed {seed}: {violation}"));
                }
            }
            Err(err) => {
                log::warn!("seed {seed}: {err}");
                failures += 1;
            }
        }
    }

    println!("{} runs, {} failed generations", args.runs, failures);
    if !violations.is_empty() {
        for violation in &violations {
            println!("Invariant failed: {violation}");
        }
        bail!("{} runs broke invariants", violations.len());
    }
    println!("Fuzzing completed successfully.");
    Ok(())
}
