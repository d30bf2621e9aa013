//! Durable persistence for users and conversations
//!
//! SQLite-backed store with three concerns: the single current-user slot,
//! the registered-users collection keyed by email (local login/signup
//! simulation), and the conversation collection keyed by id.
//!
//! All operations are synchronous. Deserialization is validated at the
//! boundary: corrupt rows are dropped with a warning, never fatal.

use crate::account::user::{RegisteredUser, User};
use crate::chat::conversation::Conversation;
use crate::chat::message::Message;
use crate::error::{ParlanceError, Result};
use anyhow::Context;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;

pub mod types;
pub use types::ConversationSummary;

/// Storage backend for users and conversation history
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Create a new storage instance
    ///
    /// Initializes the database file in the user's data directory. The
    /// `PARLANCE_DB` environment variable overrides the location, which
    /// makes it easy to point the binary at a test DB or alternate file.
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var("PARLANCE_DB") {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("com", "parlance-chat", "parlance")
            .ok_or_else(|| ParlanceError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        let db_path = data_dir.join("parlance.db");
        let storage = Self { db_path };

        storage.init()?;

        Ok(storage)
    }

    /// Create a new storage instance using the specified database path
    ///
    /// Primarily useful for tests where the default application data
    /// directory is not desirable (for example, a temporary directory).
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| ParlanceError::Storage(e.to_string()))?;
        }

        let storage = Self { db_path };
        storage.init()?;
        Ok(storage)
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| ParlanceError::Storage(e.to_string()).into())
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                messages JSON NOT NULL
            );
            CREATE TABLE IF NOT EXISTS registered_users (
                email TEXT PRIMARY KEY,
                record JSON NOT NULL
            );
            CREATE TABLE IF NOT EXISTS current_user (
                slot INTEGER PRIMARY KEY CHECK (slot = 0),
                profile JSON NOT NULL
            );",
        )
        .context("Failed to create tables")
        .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        Ok(())
    }

    // --- current-user slot ---

    /// Write the current user
    pub fn save_user(&self, user: &User) -> Result<()> {
        let conn = self.open()?;
        let profile_json = serde_json::to_string(user)
            .context("Failed to serialize user")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        conn.execute(
            "INSERT INTO current_user (slot, profile) VALUES (0, ?)
             ON CONFLICT(slot) DO UPDATE SET profile = excluded.profile",
            params![profile_json],
        )
        .context("Failed to save current user")
        .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Load the current user, if any
    ///
    /// A corrupt slot is cleared and treated as logged out.
    pub fn load_user(&self) -> Result<Option<User>> {
        let conn = self.open()?;

        let profile_json: Option<String> = conn
            .query_row("SELECT profile FROM current_user WHERE slot = 0", [], |r| {
                r.get(0)
            })
            .optional()
            .context("Failed to query current user")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        match profile_json {
            Some(json) => match serde_json::from_str::<User>(&json) {
                Ok(user) => Ok(Some(user)),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping corrupt current-user record");
                    self.clear_user()?;
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Clear the current-user slot
    pub fn clear_user(&self) -> Result<()> {
        let conn = self.open()?;
        conn.execute("DELETE FROM current_user WHERE slot = 0", [])
            .context("Failed to clear current user")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;
        Ok(())
    }

    // --- registered users ---

    /// Insert or replace a registered account record
    pub fn save_registered_user(&self, record: &RegisteredUser) -> Result<()> {
        let conn = self.open()?;
        let record_json = serde_json::to_string(record)
            .context("Failed to serialize registered user")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        conn.execute(
            "INSERT INTO registered_users (email, record) VALUES (?, ?)
             ON CONFLICT(email) DO UPDATE SET record = excluded.record",
            params![record.profile.email, record_json],
        )
        .context("Failed to save registered user")
        .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Look up a registered account by email
    ///
    /// A corrupt record is treated as absent.
    pub fn find_registered_user(&self, email: &str) -> Result<Option<RegisteredUser>> {
        let conn = self.open()?;

        let record_json: Option<String> = conn
            .query_row(
                "SELECT record FROM registered_users WHERE email = ?",
                params![email],
                |r| r.get(0),
            )
            .optional()
            .context("Failed to query registered user")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        match record_json {
            Some(json) => match serde_json::from_str::<RegisteredUser>(&json) {
                Ok(record) => Ok(Some(record)),
                Err(e) => {
                    tracing::warn!(email, error = %e, "dropping corrupt registered-user record");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Write a user's profile to both the current-user slot and the
    /// registered record (keeping the stored password)
    ///
    /// The two writes are not transactional across concerns; both stores
    /// are recomputed from either source on next load, so a crash between
    /// them is recoverable.
    pub fn persist_user(&self, user: &User) -> Result<()> {
        self.save_user(user)?;

        if let Some(existing) = self.find_registered_user(&user.email)? {
            self.save_registered_user(&RegisteredUser {
                profile: user.clone(),
                password: existing.password,
            })?;
        }

        Ok(())
    }

    // --- conversations ---

    /// Save or update a conversation
    ///
    /// `created_at` is fixed at first save; `updated_at` is refreshed on
    /// every save, which moves the conversation to the front of the
    /// recency ordering.
    pub fn upsert_conversation(&self, conversation: &Conversation) -> Result<()> {
        let mut conn = self.open()?;

        let messages_json = serde_json::to_string(&conversation.messages)
            .context("Failed to serialize messages")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        let now = Utc::now().to_rfc3339();

        let tx = conn
            .transaction()
            .context("Failed to start transaction")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        let exists: bool = tx
            .query_row(
                "SELECT 1 FROM conversations WHERE id = ?",
                params![conversation.id],
                |_| Ok(true),
            )
            .optional()
            .unwrap_or(Some(false))
            .unwrap_or(false);

        if exists {
            tx.execute(
                "UPDATE conversations SET title = ?, updated_at = ?, messages = ? WHERE id = ?",
                params![conversation.title, now, messages_json, conversation.id],
            )
            .context("Failed to update conversation")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;
        } else {
            tx.execute(
                "INSERT INTO conversations (id, title, created_at, updated_at, messages)
                VALUES (?, ?, ?, ?, ?)",
                params![conversation.id, conversation.title, now, now, messages_json],
            )
            .context("Failed to insert conversation")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;
        }

        tx.commit()
            .context("Failed to commit transaction")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Load a conversation by ID (supports full UUID or 8-char prefix)
    ///
    /// A conversation whose message list fails to deserialize is dropped.
    pub fn load_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        // A blank id would otherwise prefix-match an arbitrary row.
        if id.trim().is_empty() {
            return Ok(None);
        }

        let conn = self.open()?;

        let (query, param) = id_query(
            id,
            "SELECT id, title, created_at, updated_at, messages FROM conversations WHERE id = ?",
            "SELECT id, title, created_at, updated_at, messages FROM conversations WHERE id LIKE ?",
        );

        let row = conn
            .query_row(query, params![param], |row| {
                let id: String = row.get(0)?;
                let title: String = row.get(1)?;
                let created_at: String = row.get(2)?;
                let updated_at: String = row.get(3)?;
                let messages_json: String = row.get(4)?;
                Ok((id, title, created_at, updated_at, messages_json))
            })
            .optional()
            .context("Failed to query conversation")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        let (id, title, created_at, updated_at, messages_json) = match row {
            Some(r) => r,
            None => return Ok(None),
        };

        let messages: Vec<Message> = match serde_json::from_str(&messages_json) {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(id, error = %e, "dropping conversation with corrupt messages");
                return Ok(None);
            }
        };

        Ok(Some(Conversation {
            id,
            title,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
            messages,
        }))
    }

    /// List stored conversations, most recently updated first
    ///
    /// Corrupt rows are skipped, not fatal.
    pub fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        let conn = self.open()?;

        let mut stmt = conn
            .prepare(
                "SELECT id, title, created_at, updated_at, messages
                FROM conversations
                ORDER BY updated_at DESC",
            )
            .context("Failed to prepare statement")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let title: String = row.get(1)?;
                let created_at: String = row.get(2)?;
                let updated_at: String = row.get(3)?;
                let messages_json: String = row.get(4)?;
                Ok((id, title, created_at, updated_at, messages_json))
            })
            .context("Failed to query conversations")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        let mut summaries = Vec::new();
        for (id, title, created_at, updated_at, messages_json) in rows.flatten() {
            let message_count = match serde_json::from_str::<Vec<Message>>(&messages_json) {
                Ok(messages) => messages.len(),
                Err(e) => {
                    tracing::warn!(id, error = %e, "skipping conversation with corrupt messages");
                    continue;
                }
            };

            summaries.push(ConversationSummary {
                id,
                title,
                created_at: parse_timestamp(&created_at),
                updated_at: parse_timestamp(&updated_at),
                message_count,
            });
        }

        Ok(summaries)
    }

    /// Delete a conversation (supports full UUID or 8-char prefix)
    ///
    /// # Errors
    ///
    /// Returns `ParlanceError::Storage` for a blank id, which would
    /// otherwise prefix-match every stored conversation.
    pub fn delete_conversation(&self, id: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(
                ParlanceError::Storage("Conversation id must not be empty".to_string()).into(),
            );
        }

        let conn = self.open()?;

        let (query, param) = id_query(
            id,
            "DELETE FROM conversations WHERE id = ?",
            "DELETE FROM conversations WHERE id LIKE ?",
        );

        conn.execute(query, params![param])
            .context("Failed to delete conversation")
            .map_err(|e| ParlanceError::Storage(e.to_string()))?;

        Ok(())
    }
}

/// Pick exact-match or prefix-match query based on whether a full UUID
/// was supplied.
fn id_query<'a>(id: &str, exact: &'a str, prefix: &'a str) -> (&'a str, String) {
    if id.len() == 36 {
        (exact, id.to_string())
    } else {
        (prefix, format!("{}%", id))
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::user::PlanTier;
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Helper: create a temporary storage instance backed by a temp directory.
    ///
    /// Returns both the `SqliteStorage` and the `TempDir` so the caller keeps
    /// ownership of the directory (preventing it from being removed).
    fn create_test_storage() -> (SqliteStorage, tempfile::TempDir) {
        let dir = tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("parlance.db");
        let storage = SqliteStorage::new_with_path(db_path).expect("failed to create storage");
        (storage, dir)
    }

    fn conversation_with_user_message(text: &str) -> Conversation {
        let mut conversation = Conversation::with_greeting("hi");
        conversation.push(Message::user(text));
        conversation.title = conversation.derive_title();
        conversation
    }

    #[test]
    fn test_init_creates_tables() {
        let (storage, _dir) = create_test_storage();
        let conn = Connection::open(&storage.db_path).expect("open connection");
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table'
                 AND name IN ('conversations', 'registered_users', 'current_user')",
                [],
                |r| r.get(0),
            )
            .expect("query row");
        assert_eq!(count, 3);
    }

    #[test]
    fn test_current_user_slot_roundtrip() {
        let (storage, _dir) = create_test_storage();
        assert!(storage.load_user().unwrap().is_none());

        let user = User::new("a@b.com");
        storage.save_user(&user).unwrap();
        assert_eq!(storage.load_user().unwrap().unwrap().id, user.id);

        storage.clear_user().unwrap();
        assert!(storage.load_user().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_current_user_is_dropped() {
        let (storage, _dir) = create_test_storage();
        let conn = Connection::open(&storage.db_path).unwrap();
        conn.execute(
            "INSERT INTO current_user (slot, profile) VALUES (0, 'not json')",
            [],
        )
        .unwrap();

        assert!(storage.load_user().unwrap().is_none());
        // The corrupt slot was cleared, not left to fail again.
        let remaining: i64 = conn
            .query_row("SELECT count(*) FROM current_user", [], |r| r.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_registered_user_roundtrip() {
        let (storage, _dir) = create_test_storage();
        let record = RegisteredUser {
            profile: User::new("a@b.com"),
            password: "abc123".to_string(),
        };
        storage.save_registered_user(&record).unwrap();

        let found = storage.find_registered_user("a@b.com").unwrap().unwrap();
        assert_eq!(found.password, "abc123");
        assert!(storage.find_registered_user("ghost@b.com").unwrap().is_none());
    }

    #[test]
    fn test_persist_user_updates_registered_record() {
        let (storage, _dir) = create_test_storage();
        let mut user = User::new("a@b.com");
        storage
            .save_registered_user(&RegisteredUser {
                profile: user.clone(),
                password: "abc123".to_string(),
            })
            .unwrap();

        user.plan = Some(PlanTier::Free);
        user.daily_message_count = 7;
        storage.persist_user(&user).unwrap();

        let record = storage.find_registered_user("a@b.com").unwrap().unwrap();
        assert_eq!(record.profile.daily_message_count, 7);
        assert_eq!(record.password, "abc123");
        assert_eq!(storage.load_user().unwrap().unwrap().daily_message_count, 7);
    }

    #[test]
    fn test_upsert_preserves_created_at_and_refreshes_updated_at() {
        let (storage, _dir) = create_test_storage();
        let conversation = conversation_with_user_message("first");
        storage.upsert_conversation(&conversation).unwrap();

        let before = &storage.list_conversations().unwrap()[0];
        let (created, updated) = (before.created_at, before.updated_at);

        sleep(Duration::from_millis(10));
        storage.upsert_conversation(&conversation).unwrap();

        let after = &storage.list_conversations().unwrap()[0];
        assert_eq!(after.created_at, created);
        assert!(after.updated_at > updated);
    }

    #[test]
    fn test_list_orders_by_recency() {
        let (storage, _dir) = create_test_storage();
        let first = conversation_with_user_message("first");
        let second = conversation_with_user_message("second");

        storage.upsert_conversation(&first).unwrap();
        sleep(Duration::from_millis(10));
        storage.upsert_conversation(&second).unwrap();

        let list = storage.list_conversations().unwrap();
        assert_eq!(list[0].id, second.id);
        assert_eq!(list[1].id, first.id);

        // Re-saving the older one moves it to the front.
        sleep(Duration::from_millis(10));
        storage.upsert_conversation(&first).unwrap();
        let list = storage.list_conversations().unwrap();
        assert_eq!(list[0].id, first.id);
    }

    #[test]
    fn test_load_conversation_by_prefix() {
        let (storage, _dir) = create_test_storage();
        let conversation = conversation_with_user_message("prefix me");
        storage.upsert_conversation(&conversation).unwrap();

        let loaded = storage
            .load_conversation(&conversation.id[..8])
            .unwrap()
            .unwrap();
        assert_eq!(loaded.id, conversation.id);
        assert_eq!(loaded.messages.len(), 2);
    }

    #[test]
    fn test_load_missing_conversation_returns_none() {
        let (storage, _dir) = create_test_storage();
        assert!(storage.load_conversation("deadbeef").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_conversation_rows_are_skipped() {
        let (storage, _dir) = create_test_storage();
        let good = conversation_with_user_message("good");
        storage.upsert_conversation(&good).unwrap();

        let conn = Connection::open(&storage.db_path).unwrap();
        conn.execute(
            "INSERT INTO conversations (id, title, created_at, updated_at, messages)
             VALUES ('bad-row', 'Bad', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z', '{oops')",
            [],
        )
        .unwrap();

        let list = storage.list_conversations().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, good.id);
        assert!(storage.load_conversation("bad-row").unwrap().is_none());
    }

    #[test]
    fn test_blank_id_never_matches_or_deletes() {
        let (storage, _dir) = create_test_storage();
        storage
            .upsert_conversation(&conversation_with_user_message("one"))
            .unwrap();
        storage
            .upsert_conversation(&conversation_with_user_message("two"))
            .unwrap();

        assert!(storage.load_conversation("").unwrap().is_none());
        assert!(storage.load_conversation("   ").unwrap().is_none());

        assert!(storage.delete_conversation("").is_err());
        assert!(storage.delete_conversation("  ").is_err());
        assert_eq!(storage.list_conversations().unwrap().len(), 2);
    }

    #[test]
    fn test_delete_conversation() {
        let (storage, _dir) = create_test_storage();
        let conversation = conversation_with_user_message("delete me");
        storage.upsert_conversation(&conversation).unwrap();

        storage.delete_conversation(&conversation.id).unwrap();
        assert!(storage.list_conversations().unwrap().is_empty());
    }
}
