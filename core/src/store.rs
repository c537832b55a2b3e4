//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The engine and reports call store methods — they never execute
//! SQL directly.

use rusqlite::{params, Connection};

use crate::allocator::AllocationSnapshot;
use crate::error::PacingResult;
use crate::event::EventLogEntry;
use crate::types::Day;

pub struct PacingStore {
    conn: Connection,
}

impl PacingStore {
    /// Open (or create) the run-log database at `path`.
    pub fn open(path: &str) -> PacingResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PacingResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> PacingResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, run_date: &str, version: &str) -> PacingResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, run_date, version, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, run_date, version, 0i64],
        )?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> PacingResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, day, event_type, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.run_id,
                i64::from(entry.day),
                entry.event_type,
                entry.payload,
                i64::from(entry.day),
            ],
        )?;
        Ok(())
    }

    pub fn events_for_day(&self, run_id: &str, day: Day) -> PacingResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, day, event_type, payload
             FROM event_log WHERE run_id = ?1 AND day = ?2
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id, i64::from(day)], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    run_id: row.get(1)?,
                    day: row.get::<_, i64>(2)? as u32,
                    event_type: row.get(3)?,
                    payload: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Count persisted events of one type for a run. Test helper.
    pub fn event_count(&self, run_id: &str, event_type: &str) -> PacingResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE run_id = ?1 AND event_type = ?2",
            params![run_id, event_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ── Allocations ────────────────────────────────────────────

    pub fn insert_allocation(&self, run_id: &str, snapshot: &AllocationSnapshot) -> PacingResult<()> {
        self.conn.execute(
            "INSERT INTO allocation (run_id, op, account_name, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                run_id,
                snapshot.op,
                snapshot.account,
                serde_json::to_string(snapshot)?,
            ],
        )?;
        Ok(())
    }

    pub fn allocations_for_run(&self, run_id: &str) -> PacingResult<Vec<AllocationSnapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT payload FROM allocation WHERE run_id = ?1 ORDER BY id ASC",
        )?;
        let payloads = stmt
            .query_map(params![run_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        payloads
            .iter()
            .map(|p| Ok(serde_json::from_str(p)?))
            .collect()
    }
}
