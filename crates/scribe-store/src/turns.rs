use chrono::Utc;
use tracing::instrument;

use scribe_core::context::{IterationAnswer, IterationInstruction};
use scribe_core::document::{CitationMap, Document};
use scribe_core::ids::MessageId;

use crate::database::Database;
use crate::error::StoreError;

/// Everything a finished turn persists, gathered by the turn loop.
///
/// `cited_documents` is the deduplicated, ordered union across
/// iterations; its position defines the 1-based citation rank.
/// `resolved_ranks` are the ranks that actually appear in the final
/// answer text and passed bounds checking.
#[derive(Clone, Debug)]
pub struct SavedTurn {
    pub message_id: MessageId,
    pub final_answer: String,
    pub cited_documents: Vec<Document>,
    pub resolved_ranks: Vec<u32>,
    pub instructions: Vec<IterationInstruction>,
    pub answers: Vec<IterationAnswer>,
    pub token_count: u32,
}

#[derive(Clone)]
pub struct TurnStore {
    db: Database,
}

impl TurnStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persist a finished turn as one transaction. Inserts the cited
    /// documents, links them to the message with their rank, resolves
    /// ranks to the inserted row ids, updates the message with the final
    /// answer, and records the iteration trail. Any failure rolls the
    /// whole unit back.
    #[instrument(skip(self, turn), fields(message_id = %turn.message_id))]
    pub fn save_iteration(&self, turn: &SavedTurn) -> Result<CitationMap, StoreError> {
        let now = Utc::now().to_rfc3339();

        self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let mut row_ids: Vec<i64> = Vec::with_capacity(turn.cited_documents.len());
            for doc in &turn.cited_documents {
                tx.execute(
                    "INSERT INTO search_documents (document_id, title, url, content, score, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        doc.id.as_str(),
                        doc.title,
                        doc.url,
                        doc.content,
                        doc.score,
                        now,
                    ],
                )?;
                row_ids.push(tx.last_insert_rowid());
            }

            for (idx, row_id) in row_ids.iter().enumerate() {
                tx.execute(
                    "INSERT INTO message_documents (message_id, document_row_id, rank)
                     VALUES (?1, ?2, ?3)",
                    rusqlite::params![turn.message_id.as_str(), row_id, idx as i64 + 1],
                )?;
            }

            let mut citation_map = CitationMap::new();
            for rank in &turn.resolved_ranks {
                let idx = match rank.checked_sub(1) {
                    Some(i) => i as usize,
                    None => continue,
                };
                if let Some(row_id) = row_ids.get(idx) {
                    citation_map.insert(*rank, row_id.to_string());
                }
            }

            let citation_json = if citation_map.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&citation_map)?)
            };

            let updated = tx.execute(
                "UPDATE chat_messages
                 SET content = ?1, citation_map = ?2, token_count = ?3, updated_at = ?4
                 WHERE id = ?5",
                rusqlite::params![
                    turn.final_answer,
                    citation_json,
                    turn.token_count,
                    now,
                    turn.message_id.as_str(),
                ],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound(format!(
                    "message {}",
                    turn.message_id
                )));
            }

            for instruction in &turn.instructions {
                tx.execute(
                    "INSERT INTO iterations (message_id, iteration_nr, plan, purpose, reasoning, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        turn.message_id.as_str(),
                        instruction.iteration_nr,
                        instruction.plan,
                        instruction.purpose,
                        instruction.reasoning,
                        now,
                    ],
                )?;
            }

            for answer in &turn.answers {
                let file_ids = answer
                    .file_ids
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                let additional_data = answer
                    .additional_data
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                tx.execute(
                    "INSERT INTO iteration_sub_steps
                     (message_id, iteration_nr, parallelization_nr, tool_name, tool_id,
                      question, reasoning, answer, cited_documents, generated_images,
                      file_ids, response_type, additional_data, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                    rusqlite::params![
                        turn.message_id.as_str(),
                        answer.iteration_nr,
                        answer.parallelization_nr,
                        answer.tool_name,
                        answer.tool_id.as_str(),
                        answer.question,
                        answer.reasoning,
                        answer.answer,
                        serde_json::to_string(&answer.cited_documents)?,
                        serde_json::to_string(&answer.generated_images)?,
                        file_ids,
                        answer.response_type,
                        additional_data,
                        now,
                    ],
                )?;
            }

            tx.commit()?;
            Ok(citation_map)
        })
    }
}
