//! # Command-Line Interface
//!
//! Clap derive definitions for the `cadence` binary. Parsing only; the
//! binary routes each [`Command`] to the library.
//!
//! ## Commands
//!
//! - `import`: Load a JSON or CSV catalog export into the catalog database
//! - `list`: Show the classified catalog
//! - `matrix`: Print the base or a phase transition matrix
//! - `generate`: Build a playlist for a workout plan
//! - `hitting-time`: Expected steps to reach a state under the base chain
//! - `sensitivity`: Sweep the kernel temperature
//! - `evaluate`: Compare the generator against random and sorted baselines
//! - `presets`: Show the built-in workout plans
//!
//! ## Examples
//!
//! ```bash
//! cadence import ~/exports/liked_songs.json
//! cadence generate --preset hiit_intervals --seed 7
//! cadence generate --plan "warmup:2,push_pace:3,sprint:1" --ids
//! cadence matrix --phase sprint --json
//! ```

use crate::plan::WorkoutPlan;
use crate::state::WorkoutState;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Catalog file formats accepted by `import` and `--catalog`
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CatalogFormat {
    Json,
    Csv,
}

impl CatalogFormat {
    /// Guess the format from a file extension; `None` if unrecognized
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Main application arguments.
#[derive(Parser, Debug)]
#[command(name = "cadence")]
#[command(about = "Cadence: BPM-adaptive workout playlists from a Markov chain over intensity states")]
#[command(version)]
pub struct Args {
    /// Catalog database to use instead of the one in the data directory
    #[arg(long, global = true, env = "CADENCE_DB", value_hint = clap::ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    /// Settings file to use instead of the one in the data directory
    #[arg(long, global = true, env = "CADENCE_SETTINGS", value_hint = clap::ValueHint::FilePath)]
    pub settings: Option<PathBuf>,

    /// Read songs from a JSON or CSV file instead of the catalog database
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub catalog: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import a catalog export into the database
    ///
    /// Records are stored as given; songs with an unparseable tempo are
    /// kept and reported when the catalog is classified.
    Import {
        /// JSON array or CSV file with at least `id` and `bpm` fields
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,

        /// File format (guessed from the extension if omitted)
        #[arg(long, value_enum)]
        format: Option<CatalogFormat>,

        /// Empty the catalog before importing
        #[arg(long)]
        replace: bool,
    },

    /// List the classified catalog
    ///
    /// Shows every song with its tempo and workout state, followed by the
    /// per-state counts and any rejected records.
    List {
        /// Only show songs in this state
        #[arg(long)]
        state: Option<WorkoutState>,
    },

    /// Print a transition matrix
    ///
    /// Without `--phase` prints the base matrix built from the catalog's
    /// per-state tempo centers.
    Matrix {
        /// Kernel temperature (defaults to the configured value)
        #[arg(long)]
        tau: Option<f64>,

        /// Print the matrix reweighted for this phase
        #[arg(long)]
        phase: Option<WorkoutState>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a workout playlist
    ///
    /// Uses the `default` preset unless `--preset` or `--plan` is given.
    Generate {
        /// Built-in plan name (see `cadence presets`)
        #[arg(long, conflicts_with = "plan")]
        preset: Option<String>,

        /// Plan as `phase:count` steps, e.g. `warmup:2,steady_state:4,sprint:1`
        #[arg(long)]
        plan: Option<WorkoutPlan>,

        /// Kernel temperature (defaults to the configured value)
        #[arg(long)]
        tau: Option<f64>,

        /// Seed for a reproducible playlist
        #[arg(long)]
        seed: Option<u64>,

        /// Print the playlist as JSON
        #[arg(long, conflicts_with = "ids")]
        json: bool,

        /// Print only track ids, one per line
        #[arg(long)]
        ids: bool,
    },

    /// Expected number of songs until a state is first reached
    HittingTime {
        /// Target state
        #[arg(long, default_value = "sprint")]
        target: WorkoutState,

        /// Kernel temperature (defaults to the configured value)
        #[arg(long)]
        tau: Option<f64>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sweep the kernel temperature
    ///
    /// For each value reports the transition variance of a generated
    /// playlist and the expected warmup to sprint hitting time.
    Sensitivity {
        /// Comma separated temperatures
        #[arg(long, value_delimiter = ',', default_values_t = [5.0, 10.0, 15.0, 20.0])]
        taus: Vec<f64>,

        /// Plan to generate with
        #[arg(long, default_value = "default")]
        preset: String,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare the generator with random and sorted baselines
    Evaluate {
        /// Plan to evaluate
        #[arg(long, default_value = "default")]
        preset: String,

        /// Number of trials per strategy
        #[arg(long, default_value_t = 100)]
        trials: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the built-in workout plans
    Presets,

    /// Generate shell completions
    ///
    /// Usage: cadence completion bash > ~/.local/share/bash-completion/completions/cadence
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}
