use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{Document, GeneratedImage};
use crate::ids::{ChatSessionId, DocumentId, MessageId, ToolCallId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchType {
    Quick,
    Deep,
    Custom,
}

/// Plan recorded when a tool opens an iteration of work.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IterationInstruction {
    pub iteration_nr: u32,
    pub plan: String,
    pub purpose: String,
    pub reasoning: String,
}

/// Result of one completed tool invocation. Immutable once appended to
/// the turn context.
///
/// `cited_documents` is keyed by the rank the tool assigned within its
/// own result set; `parallelization_nr` distinguishes sibling calls
/// issued in the same iteration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IterationAnswer {
    pub tool_name: String,
    pub tool_id: ToolCallId,
    pub iteration_nr: u32,
    pub parallelization_nr: u32,
    pub question: String,
    pub reasoning: String,
    pub answer: String,
    pub cited_documents: BTreeMap<u32, Document>,
    pub generated_images: Vec<GeneratedImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<Value>,
}

/// Accumulated cross-iteration state for one turn.
#[derive(Clone, Debug, Default)]
pub struct AggregatedContext {
    pub iteration_answers: Vec<IterationAnswer>,
}

impl AggregatedContext {
    /// Union of all cited documents across iterations in rank order per
    /// answer, deduplicated by document id with the first occurrence
    /// winning. The resulting order defines the 1-based citation ranks.
    pub fn cited_documents(&self) -> Vec<Document> {
        let mut seen: HashSet<DocumentId> = HashSet::new();
        let mut out = Vec::new();
        for answer in &self.iteration_answers {
            for doc in answer.cited_documents.values() {
                if seen.insert(doc.id.clone()) {
                    out.push(doc.clone());
                }
            }
        }
        out
    }

    pub fn generated_images(&self) -> Vec<GeneratedImage> {
        self.iteration_answers
            .iter()
            .flat_map(|a| a.generated_images.iter().cloned())
            .collect()
    }
}

/// Mutable state of one in-flight turn. Owned by exactly one turn at a
/// time; tools receive `&mut` access only for the duration of their call.
#[derive(Clone, Debug)]
pub struct TurnContext {
    pub chat_session_id: ChatSessionId,
    pub message_id: MessageId,
    pub research_type: ResearchType,
    pub current_step: u64,
    pub instructions: Vec<IterationInstruction>,
    pub aggregated: AggregatedContext,
}

impl TurnContext {
    pub fn new(
        chat_session_id: ChatSessionId,
        message_id: MessageId,
        research_type: ResearchType,
    ) -> Self {
        Self {
            chat_session_id,
            message_id,
            research_type,
            current_step: 0,
            instructions: Vec::new(),
            aggregated: AggregatedContext::default(),
        }
    }

    /// The only way the step counter moves.
    pub fn advance_step(&mut self, by: u64) {
        self.current_step += by;
    }

    pub fn next_iteration_nr(&self) -> u32 {
        self.instructions.len() as u32 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(nr: u32, docs: Vec<Document>) -> IterationAnswer {
        IterationAnswer {
            tool_name: "search".into(),
            tool_id: ToolCallId::new(),
            iteration_nr: nr,
            parallelization_nr: 1,
            question: String::new(),
            reasoning: String::new(),
            answer: String::new(),
            cited_documents: docs
                .into_iter()
                .enumerate()
                .map(|(i, doc)| (i as u32 + 1, doc))
                .collect(),
            generated_images: Vec::new(),
            file_ids: None,
            response_type: None,
            additional_data: None,
        }
    }

    #[test]
    fn cited_documents_dedupes_first_occurrence_wins() {
        let doc_a = Document::new("A", "https://a", "alpha");
        let mut doc_a_later = doc_a.clone();
        doc_a_later.title = "A (revised)".into();
        let doc_b = Document::new("B", "https://b", "beta");

        let aggregated = AggregatedContext {
            iteration_answers: vec![
                answer(1, vec![doc_a.clone(), doc_b.clone()]),
                answer(2, vec![doc_a_later, doc_b]),
            ],
        };

        let docs = aggregated.cited_documents();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].title, "A");
        assert_eq!(docs[1].title, "B");
    }

    #[test]
    fn step_counter_starts_at_zero_and_advances() {
        let mut turn = TurnContext::new(
            ChatSessionId::new(),
            MessageId::new(),
            ResearchType::Quick,
        );
        assert_eq!(turn.current_step, 0);
        turn.advance_step(2);
        turn.advance_step(2);
        assert_eq!(turn.current_step, 4);
    }

    #[test]
    fn iteration_numbers_are_sequential() {
        let mut turn = TurnContext::new(
            ChatSessionId::new(),
            MessageId::new(),
            ResearchType::Deep,
        );
        assert_eq!(turn.next_iteration_nr(), 1);
        turn.instructions.push(IterationInstruction {
            iteration_nr: 1,
            plan: "p".into(),
            purpose: "u".into(),
            reasoning: "r".into(),
        });
        assert_eq!(turn.next_iteration_nr(), 2);
    }

    #[test]
    fn cited_documents_follow_rank_order_within_answer() {
        let doc_a = Document::new("A", "https://a", "alpha");
        let doc_b = Document::new("B", "https://b", "beta");

        let mut out_of_order = answer(1, vec![]);
        out_of_order.cited_documents.insert(2, doc_b.clone());
        out_of_order.cited_documents.insert(1, doc_a.clone());

        let aggregated = AggregatedContext {
            iteration_answers: vec![out_of_order],
        };
        let docs = aggregated.cited_documents();
        assert_eq!(docs[0].id, doc_a.id);
        assert_eq!(docs[1].id, doc_b.id);
    }

    #[test]
    fn answer_serde_omits_absent_optionals() {
        let answer = answer(1, vec![Document::new("A", "https://a", "alpha")]);
        let json = serde_json::to_value(&answer).unwrap();
        assert!(json.get("file_ids").is_none());
        assert!(json.get("response_type").is_none());
        assert!(json.get("additional_data").is_none());
        assert_eq!(json["tool_name"], "search");
        assert_eq!(json["parallelization_nr"], 1);

        let with_extras = IterationAnswer {
            file_ids: Some(vec!["file_1".into()]),
            response_type: Some("summary".into()),
            additional_data: Some(serde_json::json!({"source": "cache"})),
            ..answer
        };
        let json = serde_json::to_value(&with_extras).unwrap();
        assert_eq!(json["file_ids"][0], "file_1");
        assert_eq!(json["response_type"], "summary");
        assert_eq!(json["additional_data"]["source"], "cache");
    }
}
