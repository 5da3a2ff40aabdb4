//! # Cadence - Workout Playlist Generator
//!
//! Command-line front end. Loads settings and the song catalog, then routes
//! each subcommand to the library.
//!
//! ## Usage
//!
//! ```bash
//! # Import a catalog export
//! cadence import liked_songs.json
//!
//! # Generate a playlist for a built-in plan
//! cadence generate --preset progressive_build
//!
//! # Inspect the model
//! cadence matrix --phase push_pace
//! cadence hitting-time --target sprint
//! ```

use anyhow::{Context, Result};
use cadence::analytics::{compare_strategies, hitting_times, sensitivity};
use cadence::cli::{self, CatalogFormat};
use cadence::config::{get_settings_path, Settings};
use cadence::model::{base_transition, phase_transition_for};
use cadence::plan::{self, WorkoutPlan, PRESET_NAMES};
use cadence::queue::Playlist;
use cadence::song::{classify_catalog, read_csv_catalog_file, read_json_catalog, ClassificationReport, SongRecord};
use cadence::state::WorkoutState;
use cadence::{completion, db};
use clap::{CommandFactory, Parser};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

/// Main entry point.
///
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=debug cadence generate` - Enable debug logging
/// - `RUST_LOG=cadence::chain=trace cadence generate` - Trace every chain step
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();
    let settings_path = match &args.settings {
        Some(path) => path.clone(),
        None => get_settings_path()?,
    };
    let mut settings = Settings::load(&settings_path)?;
    if let Some(db_path) = &args.db {
        settings.db_path = Some(db_path.clone());
    }

    match args.command {
        cli::Command::Import { file, format, replace } => {
            import(&settings, &file, format, replace)?;
        }
        cli::Command::List { state } => {
            let report = load_catalog(&settings, args.catalog.as_deref())?;
            print_catalog(&report, state);
        }
        cli::Command::Matrix { tau, phase, json } => {
            let report = load_catalog(&settings, args.catalog.as_deref())?;
            let tau = tau.unwrap_or(settings.tau);
            let base = base_transition(&report.songs, tau)?;
            let matrix = match phase {
                Some(phase) => phase_transition_for(&base, &settings.phase_weights, phase)?,
                None => base,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&matrix.labeled())?);
            } else {
                match phase {
                    Some(phase) => println!("Transition matrix for {phase} (tau = {tau})"),
                    None => println!("Base transition matrix (tau = {tau})"),
                }
                print!("{matrix}");
            }
        }
        cli::Command::Generate { preset, plan, tau, seed, json, ids } => {
            let plan = match (plan, preset) {
                (Some(plan), _) => plan,
                (None, Some(name)) => lookup_preset(&name)?,
                (None, None) => lookup_preset("default")?,
            };
            let report = load_catalog(&settings, args.catalog.as_deref())?;
            let generator = settings.generator(tau)?;

            info!("Generating playlist for plan: {}", plan.summary());
            let playlist = match seed {
                Some(seed) => generator.generate_with_rng(&report.songs, &plan, &mut StdRng::seed_from_u64(seed))?,
                None => generator.generate(&report.songs, &plan)?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&playlist)?);
            } else if ids {
                for id in playlist.track_ids() {
                    println!("{id}");
                }
            } else {
                print_playlist(&playlist);
            }
        }
        cli::Command::HittingTime { target, tau, json } => {
            let report = load_catalog(&settings, args.catalog.as_deref())?;
            let tau = tau.unwrap_or(settings.tau);
            let times = hitting_times(&base_transition(&report.songs, tau)?, target);
            if json {
                println!("{}", serde_json::to_string_pretty(&times)?);
            } else {
                println!("Expected songs until first {target} (tau = {tau})");
                for state in WorkoutState::ALL {
                    println!("  {:<14} {:>8.2}", state.name(), times.from_state(state));
                }
                if times.method == cadence::linalg::SolveMethod::LeastSquares {
                    println!("  (singular system: least-squares estimate)");
                }
            }
        }
        cli::Command::Sensitivity { taus, preset, seed, json } => {
            let plan = lookup_preset(&preset)?;
            let report = load_catalog(&settings, args.catalog.as_deref())?;
            let points = sensitivity(&report.songs, &plan, &settings.phase_weights, &taus, seed)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&points)?);
            } else {
                println!("{:>8} {:>14} {:>22}", "tau", "variance", "warmup -> sprint");
                for point in points {
                    println!("{:>8.2} {:>14.2} {:>22.2}", point.tau, point.variance, point.hitting_time);
                }
            }
        }
        cli::Command::Evaluate { preset, trials, seed, json } => {
            let plan = lookup_preset(&preset)?;
            let report = load_catalog(&settings, args.catalog.as_deref())?;
            let generator = settings.generator(None)?;
            let reports = compare_strategies(&report.songs, &plan, &generator, &settings.ranges, trials, seed)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                println!("{trials} trials of '{preset}' ({})", plan.summary());
                println!("{:<8} {:>24} {:>24}", "strategy", "transition variance", "phase error");
                for r in reports {
                    println!(
                        "{:<8} {:>15.2} ± {:<6.2} {:>15.2} ± {:<6.2}",
                        format!("{:?}", r.strategy),
                        r.variance.mean,
                        r.variance.std_dev,
                        r.phase_error.mean,
                        r.phase_error.std_dev
                    );
                }
            }
        }
        cli::Command::Presets => {
            for name in PRESET_NAMES {
                if let Some(plan) = plan::preset(name) {
                    println!("{name:<18} {:>3} songs  {}", plan.total_slots(), plan);
                }
            }
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(&shell), &mut cmd);
        }
    }

    Ok(())
}

fn lookup_preset(name: &str) -> Result<WorkoutPlan> {
    plan::preset(name)
        .with_context(|| format!("Unknown preset '{name}'. Available: {}", PRESET_NAMES.join(", ")))
}

fn read_records(path: &Path, format: Option<CatalogFormat>) -> Result<Vec<SongRecord>> {
    let format = format
        .or_else(|| CatalogFormat::from_path(path))
        .with_context(|| format!("Cannot tell the format of {}; pass --format", path.display()))?;
    match format {
        CatalogFormat::Json => read_json_catalog(path),
        CatalogFormat::Csv => read_csv_catalog_file(path),
    }
}

fn db_path(settings: &Settings) -> Result<PathBuf> {
    let path = settings.resolved_db_path()?;
    debug!("Using catalog database {}", path.display());
    Ok(path)
}

fn import(settings: &Settings, file: &Path, format: Option<CatalogFormat>, replace: bool) -> Result<()> {
    let records = read_records(file, format)?;
    let path = db_path(settings)?;
    let mut conn = db::open(&path)?;
    let written = db::import_records(&mut conn, &records, replace)?;
    info!("Imported {written} records from {}", file.display());

    let report = classify_catalog(records, &settings.ranges);
    println!("Imported {written} songs into {} ({} total)", path.display(), db::count(&conn)?);
    print_counts(&report);
    Ok(())
}

/// Songs from `--catalog` if given, else from the database.
fn load_catalog(settings: &Settings, catalog: Option<&Path>) -> Result<ClassificationReport> {
    let records = match catalog {
        Some(file) => read_records(file, None)?,
        None => {
            let path = db_path(settings)?;
            if !path.exists() {
                anyhow::bail!(
                    "No catalog database at {}. Run `cadence import <file>` or pass --catalog.",
                    path.display()
                );
            }
            db::load_records(&db::open(&path)?)?
        }
    };

    let report = classify_catalog(records, &settings.ranges);
    if report.songs.is_empty() {
        warn!("Catalog has no usable songs");
    }
    Ok(report)
}

fn print_counts(report: &ClassificationReport) {
    let counts = report.state_counts();
    for state in WorkoutState::ALL {
        println!("  {:<14} {:>5}", state.name(), counts[state.index()]);
    }
    println!("  {:<14} {:>5}", "unclassified", report.unclassified_count());

    let rejected = report.rejected();
    if !rejected.is_empty() {
        println!("  {:<14} {:>5}", "rejected", rejected.len());
        for (id, err) in rejected {
            println!("    {id}: {err}");
        }
    }
}

fn print_catalog(report: &ClassificationReport, filter: Option<WorkoutState>) {
    let mut songs: Vec<_> = report
        .songs
        .iter()
        .filter(|s| filter.map_or(true, |state| s.state == Some(state)))
        .collect();
    songs.sort_by(|a, b| a.bpm.total_cmp(&b.bpm));

    for song in &songs {
        let state = song.state.map_or("-", |s| s.name());
        println!("{:>7.1} BPM  {:<14} {}", song.bpm, state, song.display_name());
    }
    println!();
    println!("{} songs", songs.len());
    if filter.is_none() {
        print_counts(report);
    }
}

fn print_playlist(playlist: &Playlist) {
    for (i, entry) in playlist.entries.iter().enumerate() {
        let marker = if entry.fallback { " (fallback)" } else { "" };
        println!(
            "{:>3}. [{:<12} -> {:<12}] {:>6.1} BPM  {}{marker}",
            i + 1,
            entry.phase.name(),
            entry.requested.name(),
            entry.song.bpm,
            entry.song.display_name()
        );
    }

    println!();
    println!("{} of {} slots filled", playlist.len(), playlist.planned_slots);
    if playlist.fallback_count() > 0 {
        println!("{} songs picked outside their requested state", playlist.fallback_count());
    }
    if playlist.skipped() > 0 {
        println!("{} slots skipped: catalog exhausted", playlist.skipped());
    }
}
