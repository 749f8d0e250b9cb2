use tracing::{instrument, warn};

use scribe_core::agent::ToolCallRequest;
use scribe_core::context::TurnContext;
use scribe_core::emitter::Emitter;
use scribe_core::packet::PacketPayload;
use scribe_core::tools::{ToolError, TurnTool};

use crate::error::EngineError;
use crate::registry::ToolRegistry;

/// Run a tool inside the packet accounting frame.
///
/// Emits the family start packet at the entry step, runs the tool, then
/// closes the section and advances the step counter by two whether the
/// tool succeeded or not. Downstream consumers rely on every tool call
/// occupying exactly one closed section, so the frame must not be
/// skipped on error. The tool's own error is propagated unchanged.
#[instrument(skip(tool, call, turn, emitter), fields(tool = %call.name, step = turn.current_step))]
pub fn invoke_with_accounting(
    tool: &dyn TurnTool,
    call: &ToolCallRequest,
    turn: &mut TurnContext,
    emitter: &Emitter,
) -> Result<(), EngineError> {
    let step = turn.current_step;
    emitter.emit(step, tool.family().start_payload(call));

    let result = tool.invoke(call, turn, emitter);

    emitter.emit(step, PacketPayload::SectionEnd);
    turn.advance_step(2);

    result.map_err(EngineError::from)
}

/// Look up a tool by name and run it through the accounting frame.
/// Unknown names still produce a closed section so the stream stays
/// well-formed.
pub fn dispatch(
    registry: &ToolRegistry,
    call: &ToolCallRequest,
    turn: &mut TurnContext,
    emitter: &Emitter,
) -> Result<(), EngineError> {
    match registry.get(&call.name) {
        Some(tool) => invoke_with_accounting(tool.as_ref(), call, turn, emitter),
        None => {
            warn!(tool = %call.name, "unknown tool requested");
            let step = turn.current_step;
            emitter.emit(
                step,
                PacketPayload::CustomToolStart {
                    tool_name: call.name.clone(),
                },
            );
            emitter.emit(step, PacketPayload::SectionEnd);
            turn.advance_step(2);
            Err(ToolError::UnknownTool(call.name.clone()).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use scribe_core::context::ResearchType;
    use scribe_core::document::Document;
    use scribe_core::ids::{ChatSessionId, MessageId, ToolCallId};
    use scribe_core::tools::ToolFamily;
    use serde_json::json;

    struct OkSearchTool;

    impl TurnTool for OkSearchTool {
        fn name(&self) -> &str {
            "search"
        }
        fn family(&self) -> ToolFamily {
            ToolFamily::Search
        }
        fn invoke(
            &self,
            _call: &ToolCallRequest,
            turn: &mut TurnContext,
            emitter: &Emitter,
        ) -> Result<(), ToolError> {
            emitter.emit(
                turn.current_step,
                PacketPayload::SearchToolDelta {
                    documents: vec![Document::new("A", "https://a", "alpha")],
                },
            );
            Ok(())
        }
    }

    struct FailingTool;

    impl TurnTool for FailingTool {
        fn name(&self) -> &str {
            "broken"
        }
        fn family(&self) -> ToolFamily {
            ToolFamily::Custom
        }
        fn invoke(
            &self,
            _call: &ToolCallRequest,
            _turn: &mut TurnContext,
            _emitter: &Emitter,
        ) -> Result<(), ToolError> {
            Err(ToolError::ExecutionFailed {
                tool: "broken".into(),
                detail: "boom".into(),
            })
        }
    }

    fn turn() -> TurnContext {
        TurnContext::new(ChatSessionId::new(), MessageId::new(), ResearchType::Quick)
    }

    fn call(name: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: ToolCallId::new(),
            name: name.into(),
            arguments: json!({"queries": ["rust"]}),
        }
    }

    #[test]
    fn success_emits_start_delta_end_and_advances_two() {
        let mut turn = turn();
        let emitter = Emitter::new();

        invoke_with_accounting(&OkSearchTool, &call("search"), &mut turn, &emitter).unwrap();

        let types: Vec<&str> = emitter
            .history()
            .iter()
            .map(|p| p.payload.packet_type())
            .collect();
        assert_eq!(
            types,
            vec!["search_tool_start", "search_tool_delta", "section_end"]
        );
        assert!(emitter.history().iter().all(|p| p.step_index == 0));
        assert_eq!(turn.current_step, 2);
    }

    #[test]
    fn failure_still_closes_section_and_advances_two() {
        let mut turn = turn();
        let emitter = Emitter::new();

        let result = invoke_with_accounting(&FailingTool, &call("broken"), &mut turn, &emitter);
        assert!(matches!(
            result,
            Err(EngineError::Tool(ToolError::ExecutionFailed { .. }))
        ));

        let types: Vec<&str> = emitter
            .history()
            .iter()
            .map(|p| p.payload.packet_type())
            .collect();
        assert_eq!(types, vec!["custom_tool_start", "section_end"]);
        assert_eq!(turn.current_step, 2);
    }

    #[test]
    fn repeated_calls_occupy_consecutive_even_steps() {
        let mut turn = turn();
        let emitter = Emitter::new();

        invoke_with_accounting(&OkSearchTool, &call("search"), &mut turn, &emitter).unwrap();
        invoke_with_accounting(&OkSearchTool, &call("search"), &mut turn, &emitter).unwrap();

        let steps: Vec<u64> = emitter.history().iter().map(|p| p.step_index).collect();
        assert_eq!(steps, vec![0, 0, 0, 2, 2, 2]);
        assert_eq!(turn.current_step, 4);
    }

    #[test]
    fn unknown_tool_produces_closed_section_and_error() {
        let registry = ToolRegistry::new();
        let mut turn = turn();
        let emitter = Emitter::new();

        let result = dispatch(&registry, &call("missing"), &mut turn, &emitter);
        assert!(matches!(
            result,
            Err(EngineError::Tool(ToolError::UnknownTool(_)))
        ));

        let types: Vec<&str> = emitter
            .history()
            .iter()
            .map(|p| p.payload.packet_type())
            .collect();
        assert_eq!(types, vec!["custom_tool_start", "section_end"]);
        assert_eq!(turn.current_step, 2);
    }

    #[test]
    fn dispatch_finds_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(OkSearchTool));
        let mut turn = turn();
        let emitter = Emitter::new();

        dispatch(&registry, &call("search"), &mut turn, &emitter).unwrap();
        assert_eq!(turn.current_step, 2);
    }
}
