//! SQLite-backed implementation of the storage traits.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{HeraldError, HeraldResult};
use crate::traits::{FeedbackStore, KvStore, ProfileStore};
use crate::types::{FeedbackKind, FeedbackRecord, UserNotificationProfile};

/// Timestamps are stored as fixed-width RFC 3339 UTC strings so they sort
/// lexicographically.
fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> HeraldResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| HeraldError::parse(format!("invalid timestamp '{}': {}", s, e)))
}

/// SQLite store holding cache entries, counters, feedback and profiles.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn new(db_path: impl AsRef<Path>) -> HeraldResult<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path.as_ref())?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> HeraldResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> HeraldResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| HeraldError::database(format!("connection lock poisoned: {}", e)))
    }

    fn init_schema(&self) -> HeraldResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS kv_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at TEXT
            );

            CREATE TABLE IF NOT EXISTS feedback (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                conversation_id TEXT NOT NULL,
                message_id TEXT NOT NULL,
                decision TEXT NOT NULL,
                feedback TEXT NOT NULL,
                message_text TEXT,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_feedback_user_time ON feedback(user_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_feedback_time ON feedback(timestamp);

            CREATE TABLE IF NOT EXISTS profiles (
                user_id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                version INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    fn row_to_feedback(row: &rusqlite::Row<'_>) -> HeraldResult<FeedbackRecord> {
        let user_id: String = row.get(0)?;
        let conversation_id: String = row.get(1)?;
        let message_id: String = row.get(2)?;
        let decision: String = row.get(3)?;
        let feedback: String = row.get(4)?;
        let message_text: Option<String> = row.get(5)?;
        let timestamp: String = row.get(6)?;

        Ok(FeedbackRecord {
            user_id,
            conversation_id,
            message_id,
            decision: serde_json::from_str(&decision)
                .map_err(|e| HeraldError::parse(format!("corrupt stored decision: {}", e)))?,
            feedback: feedback
                .parse::<FeedbackKind>()
                .map_err(|e| HeraldError::parse(format!("corrupt feedback value: {}", e)))?,
            message_text,
            timestamp: parse_ts(&timestamp)?,
        })
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> HeraldResult<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_entries
                 WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![key, ts(Utc::now())],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: String, expires_at: Option<DateTime<Utc>>) -> HeraldResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO kv_entries (key, value, expires_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
            "#,
            params![key, value, expires_at.map(ts)],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> HeraldResult<bool> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    fn atomic_increment(&self, key: &str, expires_at: Option<DateTime<Utc>>) -> HeraldResult<u64> {
        let conn = self.conn()?;
        // Single statement: the read-modify-write happens inside SQLite.
        let value: i64 = conn.query_row(
            r#"
            INSERT INTO kv_entries (key, value, expires_at) VALUES (?1, '1', ?2)
            ON CONFLICT(key) DO UPDATE SET
                value = CASE
                    WHEN kv_entries.expires_at IS NOT NULL AND kv_entries.expires_at <= ?3 THEN '1'
                    ELSE CAST(CAST(kv_entries.value AS INTEGER) + 1 AS TEXT)
                END,
                expires_at = excluded.expires_at
            RETURNING CAST(value AS INTEGER)
            "#,
            params![key, expires_at.map(ts), ts(Utc::now())],
            |row| row.get(0),
        )?;
        u64::try_from(value).map_err(|_| HeraldError::parse(format!("counter '{}' is negative", key)))
    }

    fn purge_expired(&self) -> HeraldResult<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM kv_entries WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            params![ts(Utc::now())],
        )?;
        Ok(removed)
    }
}

impl FeedbackStore for SqliteStore {
    fn upsert(&self, record: &FeedbackRecord) -> HeraldResult<String> {
        let id = record.id();
        let decision = serde_json::to_string(&record.decision)?;
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO feedback (
                id, user_id, conversation_id, message_id, decision, feedback, message_text, timestamp
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                decision = excluded.decision,
                feedback = excluded.feedback,
                message_text = excluded.message_text,
                timestamp = excluded.timestamp
            "#,
            params![
                id,
                record.user_id,
                record.conversation_id,
                record.message_id,
                decision,
                record.feedback.to_string(),
                record.message_text,
                ts(record.timestamp),
            ],
        )?;
        Ok(id)
    }

    fn get(&self, id: &str) -> HeraldResult<Option<FeedbackRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, conversation_id, message_id, decision, feedback, message_text, timestamp
             FROM feedback WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::row_to_feedback(row)?)),
            None => Ok(None),
        }
    }

    fn list_for_user_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> HeraldResult<Vec<FeedbackRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, conversation_id, message_id, decision, feedback, message_text, timestamp
             FROM feedback
             WHERE user_id = ?1 AND timestamp >= ?2
             ORDER BY timestamp DESC",
        )?;
        let mut rows = stmt.query(params![user_id, ts(since)])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(Self::row_to_feedback(row)?);
        }
        Ok(records)
    }

    fn users_with_feedback_since(&self, since: DateTime<Utc>) -> HeraldResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT user_id FROM feedback WHERE timestamp >= ?1 ORDER BY user_id",
        )?;
        let users = stmt
            .query_map(params![ts(since)], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }
}

impl ProfileStore for SqliteStore {
    fn get(&self, user_id: &str) -> HeraldResult<Option<UserNotificationProfile>> {
        let conn = self.conn()?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM profiles WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|d| {
            serde_json::from_str(&d)
                .map_err(|e| HeraldError::parse(format!("corrupt profile for '{}': {}", user_id, e)))
        })
        .transpose()
    }

    fn merge_upsert(
        &self,
        mut profile: UserNotificationProfile,
    ) -> HeraldResult<UserNotificationProfile> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let current: Option<i64> = tx
            .query_row(
                "SELECT version FROM profiles WHERE user_id = ?1",
                params![profile.user_id],
                |row| row.get(0),
            )
            .optional()?;
        profile.version = current.map_or(1, |v| v as u64 + 1);

        let now = ts(Utc::now());
        tx.execute(
            r#"
            INSERT INTO profiles (user_id, data, version, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT(user_id) DO UPDATE SET
                data = excluded.data,
                version = excluded.version,
                updated_at = excluded.updated_at
            "#,
            params![
                profile.user_id,
                serde_json::to_string(&profile)?,
                profile.version as i64,
                now,
            ],
        )?;
        tx.commit()?;
        Ok(profile)
    }
}
