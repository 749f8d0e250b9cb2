use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::ToolCallRequest;
use crate::context::TurnContext;
use crate::emitter::Emitter;
use crate::packet::PacketPayload;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolFamily {
    Search,
    Web,
    Image,
    Profile,
    Custom,
}

impl ToolFamily {
    /// Start packet announcing a tool call of this family, derived from
    /// the call's arguments where the family carries any.
    pub fn start_payload(&self, call: &ToolCallRequest) -> PacketPayload {
        match self {
            Self::Search => PacketPayload::SearchToolStart {
                queries: string_list_arg(call, "queries"),
            },
            Self::Web => PacketPayload::WebToolStart {
                urls: string_list_arg(call, "urls"),
            },
            Self::Image => PacketPayload::ImageToolStart {
                prompt: call
                    .arguments
                    .get("prompt")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_owned(),
            },
            Self::Profile => PacketPayload::ProfileToolStart,
            Self::Custom => PacketPayload::CustomToolStart {
                tool_name: call.name.clone(),
            },
        }
    }
}

fn string_list_arg(call: &ToolCallRequest, key: &str) -> Vec<String> {
    call.arguments
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments for tool '{tool}': {detail}")]
    InvalidArguments { tool: String, detail: String },

    #[error("tool '{tool}' failed: {detail}")]
    ExecutionFailed { tool: String, detail: String },

    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

/// A tool invocable during a turn. Runs synchronously on the turn's
/// thread; may emit delta packets at the entry step and append at most
/// one instruction and one answer to the turn context.
pub trait TurnTool: Send + Sync {
    fn name(&self) -> &str;

    fn family(&self) -> ToolFamily;

    fn invoke(
        &self,
        call: &ToolCallRequest,
        turn: &mut TurnContext,
        emitter: &Emitter,
    ) -> Result<(), ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ToolCallId;
    use serde_json::json;

    fn call(name: &str, arguments: serde_json::Value) -> ToolCallRequest {
        ToolCallRequest {
            id: ToolCallId::new(),
            name: name.into(),
            arguments,
        }
    }

    #[test]
    fn search_start_extracts_queries() {
        let payload = ToolFamily::Search
            .start_payload(&call("search", json!({"queries": ["rust", "sqlite"]})));
        match payload {
            PacketPayload::SearchToolStart { queries } => {
                assert_eq!(queries, vec!["rust".to_owned(), "sqlite".to_owned()]);
            }
            other => panic!("unexpected payload: {}", other.packet_type()),
        }
    }

    #[test]
    fn missing_args_yield_empty_lists() {
        let payload = ToolFamily::Web.start_payload(&call("web", json!({})));
        match payload {
            PacketPayload::WebToolStart { urls } => assert!(urls.is_empty()),
            other => panic!("unexpected payload: {}", other.packet_type()),
        }
    }

    #[test]
    fn image_start_carries_prompt() {
        let payload =
            ToolFamily::Image.start_payload(&call("image", json!({"prompt": "a cat"})));
        match payload {
            PacketPayload::ImageToolStart { prompt } => assert_eq!(prompt, "a cat"),
            other => panic!("unexpected payload: {}", other.packet_type()),
        }
    }

    #[test]
    fn custom_start_names_the_tool() {
        let payload = ToolFamily::Custom.start_payload(&call("weather", json!({})));
        match payload {
            PacketPayload::CustomToolStart { tool_name } => assert_eq!(tool_name, "weather"),
            other => panic!("unexpected payload: {}", other.packet_type()),
        }
    }
}
