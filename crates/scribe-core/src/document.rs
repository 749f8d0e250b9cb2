use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::DocumentId;

/// A document surfaced by a tool call and eligible for citation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Document {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: DocumentId::new(),
            title: title.into(),
            url: url.into(),
            content: content.into(),
            score: None,
        }
    }
}

/// An image produced by the image-generation tool family.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
    pub prompt: String,
}

/// A citation marker rank resolved to its cited document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolvedCitation {
    /// 1-based rank as written in the answer text (`[[rank]]`).
    pub rank: u32,
    pub document: Document,
}

/// Rank → stored record identifier, persisted alongside the message.
pub type CitationMap = BTreeMap<u32, String>;
