use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub mod models;
use models::*;

use crate::scoring::Comparison;

/// Thread-safe SQLite connection pool (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    /// Private in-memory database
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database mutex poisoned"))
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to run migrations")?;
        Ok(())
    }

    // ── Response cache ────────────────────────────────────────────────────────

    /// Cached payload for `key`, if present and not yet expired
    pub fn cache_get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let payload = conn
            .query_row(
                "SELECT payload FROM response_cache WHERE key = ?1 AND expires_at > ?2",
                params![key, Utc::now().timestamp()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(payload)
    }

    /// Insert or replace a cache entry that lives for `ttl`
    pub fn cache_put(&self, key: &str, payload: &str, ttl: Duration) -> Result<()> {
        let now = Utc::now().timestamp();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO response_cache (key, payload, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                payload = excluded.payload,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at",
            params![key, payload, now, now + ttl.as_secs() as i64],
        )?;
        Ok(())
    }

    /// Drop every cache entry; returns how many were removed
    pub fn cache_clear(&self) -> Result<usize> {
        let conn = self.lock()?;
        Ok(conn.execute("DELETE FROM response_cache", [])?)
    }

    /// Drop expired cache entries; returns how many were removed
    pub fn purge_expired_cache(&self) -> Result<usize> {
        let conn = self.lock()?;
        Ok(conn.execute(
            "DELETE FROM response_cache WHERE expires_at <= ?1",
            params![Utc::now().timestamp()],
        )?)
    }

    /// Number of live (unexpired) cache entries
    pub fn cache_len(&self) -> Result<i64> {
        let conn = self.lock()?;
        let n = conn.query_row(
            "SELECT COUNT(*) FROM response_cache WHERE expires_at > ?1",
            params![Utc::now().timestamp()],
            |r| r.get(0),
        )?;
        Ok(n)
    }

    // ── Comparison history ────────────────────────────────────────────────────

    /// Append a comparison to the history; returns its new id
    pub fn insert_history(&self, sport: &str, comparison: &Comparison) -> Result<String> {
        let created_at = Utc::now();
        let id = history_id(created_at);
        let payload = serde_json::to_string(comparison)?;
        let m = &comparison.matchup;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO comparison_history (
                id, created_at, team1, team2, sport,
                predicted_winner, win_probability, confidence_label, payload
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            params![
                id,
                created_at,
                comparison.team1.name,
                comparison.team2.name,
                sport,
                m.predicted_winner,
                m.win_probability,
                m.confidence_label.as_str(),
                payload,
            ],
        )?;
        Ok(id)
    }

    /// Most recent comparisons first, optionally only those involving `team`
    pub fn list_history(&self, limit: i64, team: Option<&str>) -> Result<Vec<MatchupSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, created_at, team1, team2, sport,
                    predicted_winner, win_probability, confidence_label
             FROM comparison_history
             WHERE ?2 IS NULL OR lower(team1) = lower(?2) OR lower(team2) = lower(?2)
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit, team], map_summary)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Drop the whole history; returns how many entries were removed
    pub fn clear_history(&self) -> Result<usize> {
        let conn = self.lock()?;
        Ok(conn.execute("DELETE FROM comparison_history", [])?)
    }

    pub fn get_history(&self, id: &str) -> Result<Option<HistoryEntry>> {
        let conn = self.lock()?;
        let entry = conn
            .query_row(
                "SELECT id, created_at, sport, payload FROM comparison_history WHERE id = ?1",
                params![id],
                map_history_entry,
            )
            .optional()?;
        Ok(entry)
    }
}

/// Sortable, collision-resistant id: UTC timestamp plus random suffix.
fn history_id(created_at: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..0x100_0000);
    format!("{}-{:06x}", created_at.format("%Y%m%d%H%M%S"), suffix)
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn map_summary(row: &rusqlite::Row) -> rusqlite::Result<MatchupSummary> {
    Ok(MatchupSummary {
        id: row.get(0)?,
        created_at: row.get(1)?,
        team1: row.get(2)?,
        team2: row.get(3)?,
        sport: row.get(4)?,
        predicted_winner: row.get(5)?,
        win_probability: row.get(6)?,
        confidence_label: row.get(7)?,
    })
}

fn map_history_entry(row: &rusqlite::Row) -> rusqlite::Result<HistoryEntry> {
    let payload: String = row.get(3)?;
    let comparison = serde_json::from_str(&payload).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(HistoryEntry {
        id: row.get(0)?,
        created_at: row.get(1)?,
        sport: row.get(2)?,
        comparison,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS response_cache (
    key         TEXT    PRIMARY KEY,
    payload     TEXT    NOT NULL,
    created_at  INTEGER NOT NULL,
    expires_at  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS comparison_history (
    id                TEXT    PRIMARY KEY,
    created_at        TEXT    NOT NULL,
    team1             TEXT    NOT NULL,
    team2             TEXT    NOT NULL,
    sport             TEXT    NOT NULL,
    predicted_winner  TEXT    NOT NULL,
    win_probability   REAL    NOT NULL,
    confidence_label  TEXT    NOT NULL,
    payload           TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cache_expires ON response_cache(expires_at);
CREATE INDEX IF NOT EXISTS idx_history_created ON comparison_history(created_at);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{Pipeline, ScoringConfig, TeamInput};

    fn comparison(team1: &str, team2: &str) -> Comparison {
        let pipeline = Pipeline::new(Arc::new(ScoringConfig::basketball()));
        let input = |name: &str| TeamInput {
            name: name.into(),
            ..Default::default()
        };
        pipeline.compare(&input(team1), &input(team2))
    }

    #[test]
    fn test_cache_roundtrip_and_clear() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.cache_get("k").unwrap(), None);

        db.cache_put("k", "{\"a\":1}", Duration::from_secs(3600)).unwrap();
        assert_eq!(db.cache_get("k").unwrap().as_deref(), Some("{\"a\":1}"));

        db.cache_put("k", "{\"a\":2}", Duration::from_secs(3600)).unwrap();
        assert_eq!(db.cache_get("k").unwrap().as_deref(), Some("{\"a\":2}"));
        assert_eq!(db.cache_len().unwrap(), 1);

        assert_eq!(db.cache_clear().unwrap(), 1);
        assert_eq!(db.cache_get("k").unwrap(), None);
    }

    #[test]
    fn test_expired_entries_are_invisible_and_purged() {
        let db = Database::open_in_memory().unwrap();
        db.cache_put("stale", "{}", Duration::ZERO).unwrap();
        db.cache_put("fresh", "{}", Duration::from_secs(3600)).unwrap();

        assert_eq!(db.cache_get("stale").unwrap(), None);
        assert_eq!(db.cache_len().unwrap(), 1);
        assert_eq!(db.purge_expired_cache().unwrap(), 1);
        assert!(db.cache_get("fresh").unwrap().is_some());
    }

    #[test]
    fn test_history_insert_list_get() {
        let db = Database::open_in_memory().unwrap();
        let first = db
            .insert_history("basketball", &comparison("Los Angeles Lakers", "Boston Celtics"))
            .unwrap();
        let second = db
            .insert_history("basketball", &comparison("Miami Heat", "Denver Nuggets"))
            .unwrap();
        assert_ne!(first, second);

        let all = db.list_history(20, None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second);
        assert_eq!(all[0].confidence_label, "Low confidence");

        let lakers = db.list_history(20, Some("los angeles lakers")).unwrap();
        assert_eq!(lakers.len(), 1);
        assert_eq!(lakers[0].team1, "Los Angeles Lakers");
        assert_eq!(db.list_history(1, None).unwrap().len(), 1);

        let entry = db.get_history(&first).unwrap().unwrap();
        assert_eq!(entry.sport, "basketball");
        assert_eq!(entry.comparison.team2.name, "Boston Celtics");
        assert_eq!(db.get_history("nope").unwrap(), None);

        assert_eq!(db.clear_history().unwrap(), 2);
        assert!(db.list_history(20, None).unwrap().is_empty());
        assert_eq!(db.get_history(&first).unwrap(), None);
        assert_eq!(db.clear_history().unwrap(), 0);
    }

    #[test]
    fn test_history_id_format() {
        let id = history_id(Utc::now());
        let (stamp, suffix) = id.split_once('-').unwrap();
        assert_eq!(stamp.len(), 14);
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
