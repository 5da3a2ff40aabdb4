//! # Cadence Library
//!
//! BPM-adaptive workout playlists. Songs are binned into four intensity
//! states by tempo, a Laplace similarity kernel over the per-state mean
//! tempos gives a base transition matrix, and each workout phase reweights
//! that matrix. Simulating the resulting time-inhomogeneous Markov chain
//! yields one target state per playlist slot, and a song is drawn for each.
//!
//! ## Architecture
//!
//! - `state`: Workout states and the BPM range table
//! - `song`: Catalog records, classification and catalog file readers
//! - `matrix`: Row-stochastic transition matrices
//! - `model`: Similarity kernel, base matrix and phase reweighting
//! - `chain`: Time-inhomogeneous chain simulation
//! - `queue`: Song selection and playlist generation
//! - `plan`: Workout plans and built-in presets
//! - `linalg`: Small dense linear solver with a least-squares fallback
//! - `analytics`: Hitting times, playlist metrics and baselines
//! - `db`: `SQLite` catalog store
//! - `config`: Data directory and settings
//! - `cli` / `completion`: Command-line definitions
//!
//! ## Quick Start
//!
//! ```rust
//! use cadence::{classify_catalog, PlaylistGenerator, SongRecord, StateRanges, WorkoutPlan, WorkoutState};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let records = vec![
//!     SongRecord::new("a", "Slow Start", "Band", 95.0),
//!     SongRecord::new("b", "Cruise", "Band", 125.0),
//!     SongRecord::new("c", "Climb", "Band", 155.0),
//!     SongRecord::new("d", "All Out", "Band", 182.0),
//! ];
//! let catalog = classify_catalog(records, &StateRanges::default()).songs;
//!
//! let plan = WorkoutPlan::from_pairs(&[(WorkoutState::Warmup, 1), (WorkoutState::Sprint, 2)])?;
//! let playlist = PlaylistGenerator::default().generate_with_rng(&catalog, &plan, &mut StdRng::seed_from_u64(7))?;
//!
//! assert_eq!(playlist.len(), 3);
//! assert_eq!(playlist.path.len(), 4);
//! # Ok::<(), cadence::CadenceError>(())
//! ```
//!
//! ## Randomness
//!
//! Every random operation takes its generator as a parameter. Seeding a
//! [`rand::rngs::StdRng`] reproduces a playlist exactly; the
//! convenience entry points fall back to `thread_rng`.
//!
//! ## Error Handling
//!
//! Library operations return [`CadenceError`] for invalid configuration:
//! empty plans, non-positive temperatures, missing phase weights, malformed
//! range tables. A sparse or exhausted catalog is not an error; it shows up
//! as fallback picks or a short playlist. File and database helpers return
//! `anyhow::Result` with context.

pub mod analytics;
pub mod chain;
pub mod cli;
pub mod completion;
pub mod config;
pub mod db;
pub mod error;
pub mod linalg;
pub mod matrix;
pub mod model;
pub mod plan;
pub mod queue;
pub mod song;
pub mod state;

pub use chain::{simulate, StatePath, START_STATE};
pub use error::{CadenceError, Result};
pub use matrix::TransitionMatrix;
pub use model::{base_transition, phase_transition, PhaseWeights, DEFAULT_TAU};
pub use plan::{PlanStep, WorkoutPlan};
pub use queue::{generate, select, Playlist, PlaylistGenerator, Selection};
pub use song::{classify_catalog, Song, SongRecord};
pub use state::{StateRanges, WorkoutState, STATE_COUNT};
