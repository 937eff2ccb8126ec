use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::DatabaseError;

/// Latest JSON snapshot of each user's review session.
#[derive(Clone)]
pub struct SessionSnapshotRepo {
    conn: Arc<Mutex<Connection>>,
}

impl SessionSnapshotRepo {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    /// Insert or replace the snapshot for `user_id`.
    pub fn save<T: Serialize>(&self, user_id: &str, snapshot: &T) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(snapshot)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO review_sessions (user_id, snapshot, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET snapshot = excluded.snapshot, updated_at = excluded.updated_at",
            params![user_id, json, Utc::now()],
        )?;
        Ok(())
    }

    /// Every stored snapshot. Rows that no longer deserialize are skipped
    /// with a warning rather than failing startup.
    pub fn load_all<T: DeserializeOwned>(&self) -> Result<Vec<(String, T)>, DatabaseError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT user_id, snapshot FROM review_sessions ORDER BY user_id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut snapshots = Vec::new();
        for row in rows {
            let (user_id, json) = row?;
            match serde_json::from_str(&json) {
                Ok(snapshot) => snapshots.push((user_id, snapshot)),
                Err(e) => tracing::warn!(user_id = %user_id, error = %e, "Skipping unreadable session snapshot"),
            }
        }
        Ok(snapshots)
    }

    pub fn delete(&self, user_id: &str) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM review_sessions WHERE user_id = ?1", params![user_id])?;
        Ok(())
    }
}
