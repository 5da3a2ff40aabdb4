//! # Configuration
//!
//! Data directory layout and user settings.
//!
//! ## Data Storage
//!
//! Cadence keeps its files in the platform-standard data directory:
//! - Linux: `~/.local/share/cadence/`
//! - macOS: `~/Library/Application Support/cadence/`
//! - Windows: `%APPDATA%\cadence\`
//!
//! The directory holds the catalog database (`catalog.db`) and an optional
//! `settings.json`.
//!
//! ## Settings File
//!
//! Every field is optional; omitted fields take their defaults.
//!
//! ```json
//! {
//!   "tau": 12.0,
//!   "ranges": [
//!     { "state": "warmup", "lower": 80, "upper": 110 },
//!     { "state": "steady_state", "lower": 110, "upper": 140 },
//!     { "state": "push_pace", "lower": 140, "upper": 170 },
//!     { "state": "sprint", "lower": 170, "upper": 1000 }
//!   ],
//!   "phase_weights": { "warmup": [2.0, 1.2, 0.8, 0.5] },
//!   "db_path": "/tmp/catalog.db"
//! }
//! ```
//!
//! A `phase_weights` table given in the file replaces the default table as a
//! whole, so a plan using a phase that is missing from it fails to generate.

use crate::error::Result as CadenceResult;
use crate::model::{validate_tau, PhaseWeights, DEFAULT_TAU};
use crate::queue::PlaylistGenerator;
use crate::state::StateRanges;
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "cadence";
const DB_FILE: &str = "catalog.db";
const SETTINGS_FILE: &str = "settings.json";

/// Returns the cadence data directory, creating it if needed.
///
/// # Errors
///
/// Fails if the system data directory cannot be determined or the
/// subdirectory cannot be created.
///
/// # Examples
///
/// ```no_run
/// use cadence::config::get_data_dir;
///
/// let dir = get_data_dir()?;
/// println!("Data lives in {}", dir.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let app_dir = data_dir.join(APP_DIR);
    fs::create_dir_all(&app_dir).with_context(|| {
        format!("Failed to create data directory at {}. Please check file permissions.", app_dir.display())
    })?;

    Ok(app_dir)
}

/// Default catalog database path
///
/// # Errors
///
/// Same as [`get_data_dir`].
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(DB_FILE))
}

/// Default settings file path
///
/// # Errors
///
/// Same as [`get_data_dir`].
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(SETTINGS_FILE))
}

/// Tunable model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Kernel temperature (BPM)
    pub tau: f64,
    pub ranges: StateRanges,
    pub phase_weights: PhaseWeights,
    /// Catalog database override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tau: DEFAULT_TAU,
            ranges: StateRanges::default(),
            phase_weights: PhaseWeights::default(),
            db_path: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read, is not valid JSON, or
    /// holds invalid values (ranges are checked while parsing).
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        settings
            .validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// # Errors
    ///
    /// Returns the first invalid value: temperature, then phase weights.
    pub fn validate(&self) -> CadenceResult<()> {
        validate_tau(self.tau)?;
        self.phase_weights.validate()
    }

    /// Catalog location: the override if set, else the data directory.
    ///
    /// # Errors
    ///
    /// Same as [`get_db_path`] when no override is set.
    pub fn resolved_db_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => get_db_path(),
        }
    }

    /// Generator configured with these settings, optionally at another temperature.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CadenceError::InvalidTemperature`] for a bad `tau`.
    pub fn generator(&self, tau: Option<f64>) -> CadenceResult<PlaylistGenerator> {
        PlaylistGenerator::new(tau.unwrap_or(self.tau), self.phase_weights.clone())
    }
}
