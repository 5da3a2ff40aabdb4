//! # Songs and the Classified Catalog
//!
//! Catalog records arrive from outside (JSON export, CSV file, catalog
//! database) in the loose shape of [`SongRecord`]. Classification turns them
//! into [`Song`]s with an assigned [`WorkoutState`] and reports the outcome of
//! every record, so partial failures are visible instead of swallowed.

use crate::error::{CadenceError, Result};
use crate::state::{StateRanges, WorkoutState, STATE_COUNT};
use anyhow::Context;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// A numeric field that may arrive as a number or as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{n}"),
            RawValue::Text(s) => f.write_str(s),
        }
    }
}

impl RawValue {
    /// Parse as a plain floating point number
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n),
            RawValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Parse as a duration in seconds; text may be `"225"`, `"225.4"` or `"3:45"`.
    #[must_use]
    pub fn as_seconds(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n),
            RawValue::Text(s) => parse_duration(s),
        }
    }
}

fn parse_duration(text: &str) -> Option<f64> {
    let text = text.trim();
    match text.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: u32 = minutes.parse().ok()?;
            let seconds: f64 = seconds.parse().ok()?;
            (0.0..60.0).contains(&seconds).then(|| f64::from(minutes) * 60.0 + seconds)
        }
        None => text.parse().ok(),
    }
}

/// Catalog record as delivered by an external collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: String,
    #[serde(default)]
    pub duration: Option<RawValue>,
    #[serde(default)]
    pub bpm: Option<RawValue>,
    #[serde(default)]
    pub energy: Option<f64>,
    #[serde(default)]
    pub danceability: Option<f64>,
}

impl SongRecord {
    /// Minimal record with a numeric tempo
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, artists: impl Into<String>, bpm: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            artists: artists.into(),
            duration: None,
            bpm: Some(RawValue::Number(bpm)),
            energy: None,
            danceability: None,
        }
    }
}

/// A catalog song with a parsed tempo and its classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub name: String,
    pub artists: String,
    /// Duration in seconds, when known
    pub duration: Option<f64>,
    pub bpm: f64,
    pub energy: Option<f64>,
    pub danceability: Option<f64>,
    /// `None` means unclassified: the tempo matched no configured range
    pub state: Option<WorkoutState>,
}

impl Song {
    /// Parse a record and classify it against `ranges`.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::MissingId`] for a blank id and
    /// [`CadenceError::InvalidBpm`] when the tempo is absent or not numeric.
    /// A song is never silently given a default state.
    pub fn from_record(record: SongRecord, ranges: &StateRanges) -> Result<Self> {
        if record.id.trim().is_empty() {
            return Err(CadenceError::MissingId);
        }

        let bpm = record
            .bpm
            .as_ref()
            .and_then(RawValue::as_f64)
            .filter(|bpm| bpm.is_finite())
            .ok_or_else(|| CadenceError::InvalidBpm {
                id: record.id.clone(),
                raw: record.bpm.as_ref().map_or_else(|| "<missing>".to_string(), ToString::to_string),
            })?;

        let duration = record.duration.as_ref().and_then(RawValue::as_seconds);

        Ok(Self {
            state: ranges.classify(bpm),
            id: record.id,
            name: record.name,
            artists: record.artists,
            duration,
            bpm,
            energy: record.energy,
            danceability: record.danceability,
        })
    }

    /// `"Name by Artist"`, the display form used in listings
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.artists.is_empty() {
            self.name.clone()
        } else {
            format!("{} by {}", self.name, self.artists)
        }
    }
}

/// What happened to one catalog record during classification.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifyOutcome {
    Classified(WorkoutState),
    /// Parsed fine but the tempo matched no range
    Unclassified,
    /// Excluded from the catalog
    Rejected(CadenceError),
}

/// Result of classifying a whole catalog.
#[derive(Debug, Clone, Default)]
pub struct ClassificationReport {
    /// Usable songs, classified or not, in input order
    pub songs: Vec<Song>,
    /// One entry per input record, in input order
    pub outcomes: Vec<(String, ClassifyOutcome)>,
}

impl ClassificationReport {
    /// Songs per state, canonical order
    #[must_use]
    pub fn state_counts(&self) -> [usize; STATE_COUNT] {
        let mut counts = [0; STATE_COUNT];
        for state in self.songs.iter().filter_map(|s| s.state) {
            counts[state.index()] += 1;
        }
        counts
    }

    #[must_use]
    pub fn unclassified_count(&self) -> usize {
        self.songs.iter().filter(|s| s.state.is_none()).count()
    }

    #[must_use]
    pub fn rejected(&self) -> Vec<(&str, &CadenceError)> {
        self.outcomes
            .iter()
            .filter_map(|(id, outcome)| match outcome {
                ClassifyOutcome::Rejected(err) => Some((id.as_str(), err)),
                _ => None,
            })
            .collect()
    }
}

/// Classify every record. Pure map over [`Song::from_record`]; nothing else
/// is consulted or mutated.
#[must_use]
pub fn classify_catalog(records: Vec<SongRecord>, ranges: &StateRanges) -> ClassificationReport {
    let mut report = ClassificationReport::default();

    for record in records {
        let id = record.id.clone();
        match Song::from_record(record, ranges) {
            Ok(song) => {
                let outcome = song.state.map_or(ClassifyOutcome::Unclassified, ClassifyOutcome::Classified);
                if song.state.is_none() {
                    debug!("Song '{}' at {:.1} BPM matches no range", song.id, song.bpm);
                }
                report.outcomes.push((id, outcome));
                report.songs.push(song);
            }
            Err(err) => {
                warn!("Excluding song from catalog: {err}");
                report.outcomes.push((id, ClassifyOutcome::Rejected(err)));
            }
        }
    }

    report
}

/// Read a JSON array of song records.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or is not a JSON array of
/// records.
pub fn read_json_catalog(path: &Path) -> anyhow::Result<Vec<SongRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open catalog file {}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("Catalog file {} is not a JSON array of songs", path.display()))
}

/// One CSV row; every field is text so bad tempos reach classification.
#[derive(Debug, Deserialize)]
struct CsvSongRow {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    artists: Option<String>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    bpm: Option<String>,
    #[serde(default)]
    energy: Option<String>,
    #[serde(default)]
    danceability: Option<String>,
}

impl From<CsvSongRow> for SongRecord {
    fn from(row: CsvSongRow) -> Self {
        let energy = parse_feature(&row.id, "energy", row.energy.as_deref());
        let danceability = parse_feature(&row.id, "danceability", row.danceability.as_deref());
        Self {
            id: row.id,
            name: row.name.unwrap_or_default(),
            artists: row.artists.unwrap_or_default(),
            duration: row.duration.map(RawValue::Text),
            bpm: row.bpm.map(RawValue::Text),
            energy,
            danceability,
        }
    }
}

/// Optional audio feature; a value that is present but not a number is
/// dropped with a warning.
fn parse_feature(id: &str, field: &str, value: Option<&str>) -> Option<f64> {
    let text = value.map(str::trim).filter(|v| !v.is_empty())?;
    match text.parse() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Song {id:?}: ignoring {field} {text:?} ({e})");
            None
        }
    }
}

/// Read song records from CSV with an `id,name,artists,duration,bpm,...` header.
///
/// # Errors
///
/// Returns an error on malformed CSV. Unparseable tempos are kept as text
/// and surface during classification.
pub fn read_csv_catalog<R: Read>(reader: R) -> anyhow::Result<Vec<SongRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();
    for (line, row) in csv_reader.deserialize::<CsvSongRow>().enumerate() {
        let row = row.with_context(|| format!("Malformed CSV row {}", line + 2))?;
        records.push(row.into());
    }
    Ok(records)
}

/// Read a CSV catalog file
///
/// # Errors
///
/// Returns an error if the file cannot be opened or parsed.
pub fn read_csv_catalog_file(path: &Path) -> anyhow::Result<Vec<SongRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open catalog file {}", path.display()))?;
    read_csv_catalog(file).with_context(|| format!("Failed to read CSV catalog {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_numeric_and_text_bpm() {
        let ranges = StateRanges::default();
        let mut record = SongRecord::new("a", "Song A", "Artist", 125.0);
        let song = Song::from_record(record.clone(), &ranges).unwrap();
        assert_eq!(song.state, Some(WorkoutState::SteadyState));

        record.bpm = Some(RawValue::Text(" 171.5 ".to_string()));
        let song = Song::from_record(record, &ranges).unwrap();
        assert_eq!(song.state, Some(WorkoutState::Sprint));
    }

    #[test]
    fn test_bad_bpm_is_an_explicit_error() {
        let ranges = StateRanges::default();
        let mut record = SongRecord::new("x", "Broken", "Nobody", 0.0);
        record.bpm = Some(RawValue::Text("fast".to_string()));
        let err = Song::from_record(record.clone(), &ranges).unwrap_err();
        assert_eq!(err, CadenceError::InvalidBpm { id: "x".to_string(), raw: "fast".to_string() });

        record.bpm = None;
        assert!(matches!(Song::from_record(record, &ranges), Err(CadenceError::InvalidBpm { .. })));
    }

    #[test]
    fn test_report_tracks_every_record() {
        let mut broken = SongRecord::new("broken", "Broken", "", 0.0);
        broken.bpm = Some(RawValue::Text("n/a".to_string()));
        let records = vec![
            SongRecord::new("slow", "Slow", "", 60.0),
            SongRecord::new("warm", "Warm", "", 95.0),
            broken,
            SongRecord::new("fast", "Fast", "", 180.0),
        ];

        let report = classify_catalog(records, &StateRanges::default());
        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(report.songs.len(), 3);
        assert_eq!(report.unclassified_count(), 1);
        assert_eq!(report.state_counts(), [1, 0, 0, 1]);
        assert_eq!(report.rejected().len(), 1);
        assert_eq!(report.outcomes[0].1, ClassifyOutcome::Unclassified);
        assert_eq!(report.outcomes[1].1, ClassifyOutcome::Classified(WorkoutState::Warmup));
    }

    #[test]
    fn test_duration_formats() {
        assert_eq!(RawValue::Text("3:45".to_string()).as_seconds(), Some(225.0));
        assert_eq!(RawValue::Text("200".to_string()).as_seconds(), Some(200.0));
        assert_eq!(RawValue::Number(61.5).as_seconds(), Some(61.5));
        assert_eq!(RawValue::Text("3:75".to_string()).as_seconds(), None);
    }

    #[test]
    fn test_json_records_accept_mixed_types() {
        let json = r#"[
            {"id": "1", "name": "One", "artists": "A", "duration": 200, "bpm": 100.5},
            {"id": "2", "name": "Two", "artists": "B", "duration": "3:10", "bpm": "145", "energy": 0.8}
        ]"#;
        let records: Vec<SongRecord> = serde_json::from_str(json).unwrap();
        let report = classify_catalog(records, &StateRanges::default());
        assert_eq!(report.songs[0].state, Some(WorkoutState::Warmup));
        assert_eq!(report.songs[1].state, Some(WorkoutState::PushPace));
        assert_eq!(report.songs[1].duration, Some(190.0));
        assert_eq!(report.songs[1].energy, Some(0.8));
    }

    #[test]
    fn test_csv_catalog() {
        let data = "id,name,artists,duration,bpm,energy,danceability\n\
                    t1,First,Band,210,128.0,0.7,0.6\n\
                    t2,Second,Band,,unknown,,\n";
        let records = read_csv_catalog(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].energy, Some(0.7));

        let report = classify_catalog(records, &StateRanges::default());
        assert_eq!(report.songs.len(), 1);
        assert_eq!(report.songs[0].state, Some(WorkoutState::SteadyState));
        assert_eq!(report.rejected()[0].0, "t2");
    }

    #[test]
    fn test_csv_bad_feature_keeps_record() {
        let data = "id,name,artists,duration,bpm,energy,danceability\n\
                    t1,First,Band,210,128.0,loud,0.6\n";
        let records = read_csv_catalog(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].energy, None);
        assert_eq!(records[0].danceability, Some(0.6));
        assert_eq!(records[0].bpm, Some(RawValue::Text("128.0".to_string())));
    }

    #[test]
    fn test_parse_feature() {
        assert_eq!(parse_feature("t", "energy", Some(" 0.5 ")), Some(0.5));
        assert_eq!(parse_feature("t", "energy", Some("")), None);
        assert_eq!(parse_feature("t", "energy", Some("high")), None);
        assert_eq!(parse_feature("t", "energy", None), None);
    }

    #[test]
    fn test_display_name() {
        let song = Song::from_record(SongRecord::new("1", "Run", "Band", 150.0), &StateRanges::default()).unwrap();
        assert_eq!(song.display_name(), "Run by Band");
    }
}
