use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use env_logger::Env;
use tileflow::samples::demo_project;
use tileflow::{Generator, Project, SnapshotRealizer, load_project_from_file};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Project file (.json or .toml) holding the flow, tile library and settings
    #[arg(short, long, conflicts_with = "demo")]
    project: Option<PathBuf>,

    /// Generate the built-in demo dungeon instead of loading a project
    #[arg(long)]
    demo: bool,

    /// Overrides the project's seed
    #[arg(short, long, conflicts_with = "randomize")]
    seed: Option<u64>,

    /// Ignore any configured seed and pick one at random
    #[arg(long)]
    randomize: bool,

    /// Write a JSON snapshot of the finished dungeon here
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().filter_or("TILEFLOW_LOG", "info")).init();
    let args = Args::parse();

    let mut project: Project = match (&args.project, args.demo) {
        (Some(path), _) => load_project_from_file(path)
            .with_context(|| format!("Failed to load project: {}", path.display()))?,
        (None, true) => demo_project(),
        (None, false) => bail!("pass --project <file> or --demo"),
    };
    if let Some(seed) = args.seed {
        project.settings.seed = Some(seed);
        project.settings.randomize_seed = false;
    }
    if args.randomize {
        project.settings.randomize_seed = true;
    }

    let mut generator = Generator::with_realizer(
        &project.flow,
        &project.library,
        project.settings.clone(),
        SnapshotRealizer::default(),
    )
    .context("Project failed validation")?;
    let seed = generator.seed();
    let stats = generator
        .generate()
        .with_context(|| format!("Generation failed for seed {seed}"))?
        .stats
        .clone();

    println!("Generation complete.");
    println!("Seed: {seed}");
    println!("Attempts: {} ({} backtracks)", stats.attempts, stats.backtracks);
    println!(
        "Rooms: {} main path, {} branch, {} total",
        stats.main_path_rooms, stats.branch_path_rooms, stats.total_rooms
    );
    println!(
        "Branches: {} grown, max depth {}, {} tiles pruned",
        stats.branches_grown, stats.max_branch_depth, stats.pruned_tiles
    );
    println!(
        "Locks: {} placed, {} abandoned, {} keys",
        stats.locks_placed, stats.locks_abandoned, stats.keys_placed
    );
    println!("Time: {:?}", stats.timings.total());

    let snapshot = generator
        .realizer_mut()
        .take_snapshot()
        .context("Generator finished without a snapshot")?;
    println!("Fingerprint: {:016x}", snapshot.fingerprint);

    if let Some(out) = &args.out {
        let json = serde_json::to_string_pretty(&snapshot).context("Failed to encode snapshot")?;
        fs::write(out, json)
            .with_context(|| format!("Failed to write snapshot: {}", out.display()))?;
        println!("Snapshot written to {}", out.display());
    }

    Ok(())
}
