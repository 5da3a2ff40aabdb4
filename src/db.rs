//! # Catalog Store
//!
//! `SQLite` persistence for imported song records. Records are stored as
//! imported: duration and BPM keep their raw text so that a song with a
//! malformed tempo survives the round trip and is rejected at
//! classification time, not at import time.

use crate::song::{RawValue, SongRecord};
use anyhow::{Context, Result};
use log::{debug, trace};
use rusqlite::{params, Connection};
use std::path::Path;

/// Open (or create) the catalog at `path` and make sure the schema exists.
///
/// # Errors
///
/// Fails if the file cannot be opened or the schema cannot be created.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Could not open catalog database at {}", path.display()))?;
    init(&conn)?;
    Ok(conn)
}

/// Create the `songs` table if it does not exist. Safe to call repeatedly.
///
/// # Errors
///
/// Fails on invalid SQL or a read-only database.
pub fn init(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS songs (
            id           TEXT PRIMARY KEY,
            name         TEXT NOT NULL,
            artists      TEXT NOT NULL,
            duration     TEXT,
            bpm          TEXT,
            energy       REAL,
            danceability REAL
        )",
        (),
    )
    .context("Invalid SQL command when creating songs table")?;
    Ok(())
}

fn raw_to_text(value: Option<&RawValue>) -> Option<String> {
    value.map(ToString::to_string)
}

fn text_to_raw(value: Option<String>) -> Option<RawValue> {
    value.map(|text| match text.trim().parse::<f64>() {
        Ok(n) => RawValue::Number(n),
        Err(_) => RawValue::Text(text),
    })
}

/// Insert or update `records` in one transaction. Returns the number written.
///
/// A record whose id already exists replaces the stored one. With `replace`
/// set, the table is emptied first.
///
/// # Errors
///
/// Rolls back and fails if any statement fails.
pub fn import_records(conn: &mut Connection, records: &[SongRecord], replace: bool) -> Result<usize> {
    let tx = conn.transaction()?;

    if replace {
        let removed = tx.execute("DELETE FROM songs", ())?;
        debug!("Cleared {removed} stored songs before import");
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO songs (id, name, artists, duration, bpm, energy, danceability)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                artists = excluded.artists,
                duration = excluded.duration,
                bpm = excluded.bpm,
                energy = excluded.energy,
                danceability = excluded.danceability",
        )?;

        for record in records {
            stmt.execute(params![
                record.id,
                record.name,
                record.artists,
                raw_to_text(record.duration.as_ref()),
                raw_to_text(record.bpm.as_ref()),
                record.energy,
                record.danceability,
            ])
            .with_context(|| format!("Failed to store song {:?}", record.id))?;
            trace!("Stored {}", record.id);
        }
    }

    tx.commit().context("Committing import transaction failed")?;
    Ok(records.len())
}

/// All stored records, ordered by id.
///
/// # Errors
///
/// Fails if the query cannot run or a row has an unexpected type.
pub fn load_records(conn: &Connection) -> Result<Vec<SongRecord>> {
    let mut stmt = conn
        .prepare("SELECT id, name, artists, duration, bpm, energy, danceability FROM songs ORDER BY id")
        .context("Invalid SQL statement when selecting songs")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(SongRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                artists: row.get(2)?,
                duration: text_to_raw(row.get(3)?),
                bpm: text_to_raw(row.get(4)?),
                energy: row.get(5)?,
                danceability: row.get(6)?,
            })
        })
        .context("Cannot query songs")?;

    let mut records = Vec::new();
    for record in rows {
        records.push(record.context("Failed to read stored song")?);
    }
    Ok(records)
}

/// Number of stored songs
///
/// # Errors
///
/// Fails if the count query fails.
pub fn count(conn: &Connection) -> Result<usize> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM songs", [], |row| row.get(0))
        .context("Could not count catalog entries")?;
    Ok(usize::try_from(n).unwrap_or(0))
}

/// Delete one song. Returns whether it existed.
///
/// # Errors
///
/// Fails on a database error.
pub fn remove(conn: &Connection, id: &str) -> Result<bool> {
    let removed = conn
        .execute("DELETE FROM songs WHERE id = ?1", [id])
        .with_context(|| format!("Failed to delete song {id:?}"))?;
    Ok(removed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init(&conn).unwrap();
        conn
    }

    #[test]
    fn test_round_trip_keeps_raw_bpm() {
        let mut conn = memory();
        let mut broken = SongRecord::new("b", "Broken", "Nobody", 0.0);
        broken.bpm = Some(RawValue::Text("fast".to_string()));
        let mut timed = SongRecord::new("a", "Timed", "Somebody", 128.5);
        timed.duration = Some(RawValue::Text("3:05".to_string()));
        timed.energy = Some(0.8);

        assert_eq!(import_records(&mut conn, &[timed, broken], false).unwrap(), 2);

        let records = load_records(&conn).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "a");
        assert_eq!(records[0].bpm, Some(RawValue::Number(128.5)));
        assert_eq!(records[0].duration, Some(RawValue::Text("3:05".to_string())));
        assert_eq!(records[0].energy, Some(0.8));
        assert_eq!(records[1].bpm, Some(RawValue::Text("fast".to_string())));
    }

    #[test]
    fn test_upsert_and_replace() {
        let mut conn = memory();
        import_records(&mut conn, &[SongRecord::new("a", "Old", "X", 100.0)], false).unwrap();
        import_records(&mut conn, &[SongRecord::new("a", "New", "X", 150.0)], false).unwrap();
        assert_eq!(count(&conn).unwrap(), 1);
        assert_eq!(load_records(&conn).unwrap()[0].name, "New");

        import_records(&mut conn, &[SongRecord::new("z", "Z", "Y", 90.0)], true).unwrap();
        assert_eq!(count(&conn).unwrap(), 1);
        assert_eq!(load_records(&conn).unwrap()[0].id, "z");
    }

    #[test]
    fn test_remove() {
        let mut conn = memory();
        import_records(&mut conn, &[SongRecord::new("a", "A", "X", 100.0)], false).unwrap();
        assert!(remove(&conn, "a").unwrap());
        assert!(!remove(&conn, "a").unwrap());
        assert_eq!(count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_open_on_disk_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.db");
        {
            let mut conn = open(&path).unwrap();
            import_records(&mut conn, &[SongRecord::new("a", "A", "X", 100.0)], false).unwrap();
        }
        let conn = open(&path).unwrap();
        assert_eq!(count(&conn).unwrap(), 1);
    }
}
