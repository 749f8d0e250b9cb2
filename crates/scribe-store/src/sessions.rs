use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use scribe_core::ids::ChatSessionId;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatSessionRow {
    pub id: ChatSessionId,
    pub title: Option<String>,
    pub created_at: String,
}

pub struct ChatSessionRepo {
    db: Database,
}

impl ChatSessionRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a new chat session.
    #[instrument(skip(self))]
    pub fn create(&self, title: Option<&str>) -> Result<ChatSessionRow, StoreError> {
        let id = ChatSessionId::new();
        let now = Utc::now().to_rfc3339();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_sessions (id, title, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![id.as_str(), title, now],
            )?;

            Ok(ChatSessionRow {
                id,
                title: title.map(str::to_owned),
                created_at: now,
            })
        })
    }

    #[instrument(skip(self), fields(chat_session_id = %id))]
    pub fn get(&self, id: &ChatSessionId) -> Result<ChatSessionRow, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, title, created_at FROM chat_sessions WHERE id = ?1")?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => {
                    let id: String = row_helpers::get(row, 0, "chat_sessions", "id")?;
                    Ok(ChatSessionRow {
                        id: ChatSessionId::from_raw(id),
                        title: row_helpers::get_opt(row, 1, "chat_sessions", "title")?,
                        created_at: row_helpers::get(row, 2, "chat_sessions", "created_at")?,
                    })
                }
                None => Err(StoreError::NotFound(format!("chat session {id}"))),
            }
        })
    }
}
