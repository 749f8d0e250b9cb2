use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use scribe_core::document::CitationMap;
use scribe_core::ids::{ChatSessionId, MessageId};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(format!("unknown message role: {other}")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessageRow {
    pub id: MessageId,
    pub chat_session_id: ChatSessionId,
    pub role: MessageRole,
    pub content: String,
    pub citation_map: Option<CitationMap>,
    pub token_count: Option<u32>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct ChatMessageRepo {
    db: Database,
}

impl ChatMessageRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a message row. Assistant messages start empty; the turn
    /// fills in content, citations and token count when it persists.
    #[instrument(skip(self, content), fields(chat_session_id = %chat_session_id))]
    pub fn create(
        &self,
        chat_session_id: &ChatSessionId,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatMessageRow, StoreError> {
        let id = MessageId::new();
        let now = Utc::now().to_rfc3339();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_messages (id, chat_session_id, role, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    id.as_str(),
                    chat_session_id.as_str(),
                    role.to_string(),
                    content,
                    now,
                    now,
                ],
            )?;

            Ok(ChatMessageRow {
                id,
                chat_session_id: chat_session_id.clone(),
                role,
                content: content.to_owned(),
                citation_map: None,
                token_count: None,
                created_at: now.clone(),
                updated_at: now,
            })
        })
    }

    #[instrument(skip(self), fields(message_id = %id))]
    pub fn get(&self, id: &MessageId) -> Result<ChatMessageRow, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, chat_session_id, role, content, citation_map, token_count,
                        created_at, updated_at
                 FROM chat_messages WHERE id = ?1",
            )?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_message(row),
                None => Err(StoreError::NotFound(format!("message {id}"))),
            }
        })
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<ChatMessageRow, StoreError> {
    let id: String = row_helpers::get(row, 0, "chat_messages", "id")?;
    let session: String = row_helpers::get(row, 1, "chat_messages", "chat_session_id")?;
    let role: String = row_helpers::get(row, 2, "chat_messages", "role")?;
    let citation_json: Option<String> =
        row_helpers::get_opt(row, 4, "chat_messages", "citation_map")?;
    let citation_map = citation_json
        .map(|raw| row_helpers::parse_json(&raw, "chat_messages", "citation_map"))
        .transpose()?;

    Ok(ChatMessageRow {
        id: MessageId::from_raw(id),
        chat_session_id: ChatSessionId::from_raw(session),
        role: row_helpers::parse_enum(&role, "chat_messages", "role")?,
        content: row_helpers::get(row, 3, "chat_messages", "content")?,
        citation_map,
        token_count: row_helpers::get_opt(row, 5, "chat_messages", "token_count")?,
        created_at: row_helpers::get(row, 6, "chat_messages", "created_at")?,
        updated_at: row_helpers::get(row, 7, "chat_messages", "updated_at")?,
    })
}
