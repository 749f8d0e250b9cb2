use serde::{Deserialize, Serialize};

use crate::document::{Document, GeneratedImage, ResolvedCitation};

/// One ordered, step-tagged event in a turn's output stream.
///
/// `step_index` is monotonically non-decreasing across a turn; consumers
/// group packets by step to reconstruct a section's full content. Created
/// only by the [`Emitter`](crate::emitter::Emitter), immutable afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Packet {
    pub step_index: u64,
    pub payload: PacketPayload,
}

/// Closed payload union. Ordering contract within a step:
///
/// `*Start → *Delta* → SectionEnd`, and a single `OverallStop` terminates
/// the turn. Every opened step is closed by exactly one `SectionEnd`
/// before its index is reused for a different topic.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PacketPayload {
    #[serde(rename = "message_start")]
    MessageStart { content: String },
    #[serde(rename = "message_delta")]
    MessageDelta { content: String },

    #[serde(rename = "section_end")]
    SectionEnd,

    #[serde(rename = "citation_start")]
    CitationStart,
    #[serde(rename = "citation_delta")]
    CitationDelta { citations: Vec<ResolvedCitation> },

    #[serde(rename = "search_tool_start")]
    SearchToolStart { queries: Vec<String> },
    #[serde(rename = "search_tool_delta")]
    SearchToolDelta { documents: Vec<Document> },

    #[serde(rename = "web_tool_start")]
    WebToolStart { urls: Vec<String> },
    #[serde(rename = "web_tool_delta")]
    WebToolDelta { documents: Vec<Document> },

    #[serde(rename = "image_tool_start")]
    ImageToolStart { prompt: String },
    #[serde(rename = "image_tool_delta")]
    ImageToolDelta { images: Vec<GeneratedImage> },

    #[serde(rename = "profile_tool_start")]
    ProfileToolStart,
    #[serde(rename = "profile_tool_delta")]
    ProfileToolDelta { content: String },

    #[serde(rename = "custom_tool_start")]
    CustomToolStart { tool_name: String },
    #[serde(rename = "custom_tool_delta")]
    CustomToolDelta { data: serde_json::Value },

    #[serde(rename = "overall_stop")]
    OverallStop,
}

impl PacketPayload {
    pub fn packet_type(&self) -> &'static str {
        match self {
            Self::MessageStart { .. } => "message_start",
            Self::MessageDelta { .. } => "message_delta",
            Self::SectionEnd => "section_end",
            Self::CitationStart => "citation_start",
            Self::CitationDelta { .. } => "citation_delta",
            Self::SearchToolStart { .. } => "search_tool_start",
            Self::SearchToolDelta { .. } => "search_tool_delta",
            Self::WebToolStart { .. } => "web_tool_start",
            Self::WebToolDelta { .. } => "web_tool_delta",
            Self::ImageToolStart { .. } => "image_tool_start",
            Self::ImageToolDelta { .. } => "image_tool_delta",
            Self::ProfileToolStart => "profile_tool_start",
            Self::ProfileToolDelta { .. } => "profile_tool_delta",
            Self::CustomToolStart { .. } => "custom_tool_start",
            Self::CustomToolDelta { .. } => "custom_tool_delta",
            Self::OverallStop => "overall_stop",
        }
    }

    /// True for payloads carrying assistant message text.
    pub fn is_message_content(&self) -> bool {
        matches!(self, Self::MessageStart { .. } | Self::MessageDelta { .. })
    }

    /// Message text carried by this payload, if any.
    pub fn message_text(&self) -> Option<&str> {
        match self {
            Self::MessageStart { content } | Self::MessageDelta { content } => Some(content),
            _ => None,
        }
    }

    pub fn is_tool_start(&self) -> bool {
        matches!(
            self,
            Self::SearchToolStart { .. }
                | Self::WebToolStart { .. }
                | Self::ImageToolStart { .. }
                | Self::ProfileToolStart
                | Self::CustomToolStart { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_serialization() {
        let payload = PacketPayload::MessageDelta {
            content: "hi".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "message_delta");
        assert_eq!(json["content"], "hi");
    }

    #[test]
    fn packet_type_matches_serde_tag() {
        let payloads = vec![
            PacketPayload::MessageStart { content: "a".into() },
            PacketPayload::SectionEnd,
            PacketPayload::CitationStart,
            PacketPayload::SearchToolStart { queries: vec![] },
            PacketPayload::OverallStop,
        ];
        for p in &payloads {
            let json = serde_json::to_value(p).unwrap();
            assert_eq!(json["type"], p.packet_type());
        }
    }

    #[test]
    fn message_content_classification() {
        assert!(PacketPayload::MessageStart { content: "x".into() }.is_message_content());
        assert!(PacketPayload::MessageDelta { content: "x".into() }.is_message_content());
        assert!(!PacketPayload::SectionEnd.is_message_content());
        assert!(!PacketPayload::OverallStop.is_message_content());
    }

    #[test]
    fn tool_start_classification() {
        assert!(PacketPayload::SearchToolStart { queries: vec![] }.is_tool_start());
        assert!(PacketPayload::ProfileToolStart.is_tool_start());
        assert!(!PacketPayload::SearchToolDelta { documents: vec![] }.is_tool_start());
    }

    #[test]
    fn packet_serde_roundtrip() {
        let packet = Packet {
            step_index: 4,
            payload: PacketPayload::CustomToolDelta {
                data: serde_json::json!({"rows": 3}),
            },
        };
        let json = serde_json::to_string(&packet).unwrap();
        let parsed: Packet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.step_index, 4);
        assert_eq!(parsed.payload.packet_type(), "custom_tool_delta");
    }
}
