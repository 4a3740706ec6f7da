//! Local friend directory
//!
//! Relationship management belongs to a separate subsystem; this table only
//! mirrors which peers the sync engine should poll.

use rusqlite::{params, Connection};

use super::message_repository::sql_limit;
use crate::error::Result;

/// Friendship status meaning "poll this peer"
pub const ACCEPTED: &str = "accepted";

/// Trait for friend directory storage operations
pub trait FriendRepository {
    /// Insert or update a relationship
    fn upsert(&self, user_id: &str, friend_user_id: &str, status: &str, now: i64) -> Result<()>;

    /// Accepted friends of `user_id`, in the order they were added
    fn list_accepted(&self, user_id: &str, limit: usize) -> Result<Vec<String>>;
}

/// `SQLite` implementation of `FriendRepository`
pub struct SqliteFriendRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteFriendRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl FriendRepository for SqliteFriendRepository<'_> {
    fn upsert(&self, user_id: &str, friend_user_id: &str, status: &str, now: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO friendships (user_id, friend_user_id, status, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, friend_user_id) DO UPDATE SET status = excluded.status",
            params![user_id, friend_user_id, status, now],
        )?;
        Ok(())
    }

    fn list_accepted(&self, user_id: &str, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT friend_user_id FROM friendships
             WHERE user_id = ?1 AND status = ?2
             ORDER BY created_at ASC, friend_user_id ASC
             LIMIT ?3",
        )?;

        let friends = stmt
            .query_map(params![user_id, ACCEPTED, sql_limit(limit)], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(friends)
    }
}
