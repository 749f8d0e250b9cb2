use std::sync::Arc;

use tracing::{info, instrument, warn};

use scribe_core::cancel::CancelFlagStore;
use scribe_core::context::TurnContext;
use scribe_core::document::CitationMap;
use scribe_core::emitter::Emitter;
use scribe_core::packet::PacketPayload;
use scribe_core::tokens::TokenCounter;
use scribe_store::{SavedTurn, TurnStore};
use scribe_telemetry::TurnMetrics;

use crate::bridge::RunBridge;
use crate::citations;
use crate::error::EngineError;
use crate::registry::ToolRegistry;
use crate::wrapper;

/// Everything a turn needs besides its own context. Immutable for the
/// duration of the turn.
pub struct TurnDeps {
    pub emitter: Arc<Emitter>,
    pub registry: Arc<ToolRegistry>,
    pub cancel_flags: Arc<dyn CancelFlagStore>,
    pub store: TurnStore,
    pub tokens: Arc<dyn TokenCounter>,
    pub metrics: Arc<TurnMetrics>,
    pub model: String,
}

/// What a finished turn reports back to its caller.
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    pub cancelled: bool,
    pub final_answer: String,
    pub citation_map: CitationMap,
}

pub struct TurnRunner;

impl TurnRunner {
    /// Drive one turn to completion: translate raw run events into
    /// packets, dispatch tool calls, resolve citations, persist, and
    /// close the stream with `OverallStop`.
    ///
    /// The client's connection flag is polled before every event; a
    /// disconnected client cancels the run. Errors propagate to the
    /// caller; the bridge worker is torn down on drop either way.
    #[instrument(skip_all, fields(chat_session_id = %turn.chat_session_id, message_id = %turn.message_id))]
    pub fn run(
        deps: &TurnDeps,
        mut turn: TurnContext,
        mut bridge: RunBridge,
    ) -> Result<TurnOutcome, EngineError> {
        deps.metrics.turn_started();

        let result = Self::run_inner(deps, &mut turn, &mut bridge);
        match &result {
            Ok(outcome) if outcome.cancelled => deps.metrics.turn_cancelled(),
            Ok(_) => deps.metrics.turn_completed(),
            Err(_) => deps.metrics.turn_failed(),
        }
        result
    }

    fn run_inner(
        deps: &TurnDeps,
        turn: &mut TurnContext,
        bridge: &mut RunBridge,
    ) -> Result<TurnOutcome, EngineError> {
        use scribe_core::agent::RunEvent;

        let emitter = &deps.emitter;
        let mut message_open = false;
        let mut cancelled = false;

        for item in bridge.by_ref() {
            if !deps.cancel_flags.is_connected(&turn.chat_session_id) {
                cancelled = true;
                break;
            }

            match item {
                Ok(RunEvent::MessageStart { text }) | Ok(RunEvent::MessageDelta { text })
                    if !message_open =>
                {
                    message_open = true;
                    emitter.emit(turn.current_step, PacketPayload::MessageStart { content: text });
                }
                Ok(RunEvent::MessageStart { text }) | Ok(RunEvent::MessageDelta { text }) => {
                    emitter.emit(turn.current_step, PacketPayload::MessageDelta { content: text });
                }
                Ok(RunEvent::MessageEnd) => {
                    if message_open {
                        message_open = false;
                        emitter.emit(turn.current_step, PacketPayload::SectionEnd);
                        turn.advance_step(2);
                    }
                }
                Ok(RunEvent::ToolCall(call)) => {
                    if message_open {
                        message_open = false;
                        emitter.emit(turn.current_step, PacketPayload::SectionEnd);
                        turn.advance_step(2);
                    }
                    deps.metrics.tool_call();
                    wrapper::dispatch(&deps.registry, &call, turn, emitter)?;
                }
                Ok(RunEvent::RunError { message }) => {
                    // Normally surfaced by the bridge as an Err item.
                    close_open_section(turn, emitter, &mut message_open);
                    return Err(EngineError::Run(message));
                }
                Err(err) => {
                    close_open_section(turn, emitter, &mut message_open);
                    return Err(err);
                }
            }
        }

        if cancelled {
            warn!("client disconnected - cancelling turn");
            bridge.cancel();

            if message_open {
                emitter.emit(turn.current_step, PacketPayload::SectionEnd);
                turn.advance_step(2);
            } else if !emitter
                .last_payload()
                .is_some_and(|p| p.is_message_content())
            {
                let step = turn.current_step;
                emitter.emit(
                    step,
                    PacketPayload::MessageStart {
                        content: "Cancelled".into(),
                    },
                );
                emitter.emit(step, PacketPayload::SectionEnd);
                turn.advance_step(2);
            }

            deps.cancel_flags.reset_cancel_status(&turn.chat_session_id);
        } else if message_open {
            // Run ended without a MessageEnd; close the section.
            emitter.emit(turn.current_step, PacketPayload::SectionEnd);
            turn.advance_step(2);
        }

        let final_answer = emitter.final_answer_text();
        let cited_documents = turn.aggregated.cited_documents();
        let resolved_ranks =
            citations::resolve_and_emit(&final_answer, &cited_documents, turn, emitter);

        let token_count = deps.tokens.count(&deps.model, &final_answer);

        let saved = SavedTurn {
            message_id: turn.message_id.clone(),
            final_answer: final_answer.clone(),
            cited_documents,
            resolved_ranks,
            instructions: turn.instructions.clone(),
            answers: turn.aggregated.iteration_answers.clone(),
            token_count,
        };
        let citation_map = deps.store.save_iteration(&saved)?;

        emitter.emit(turn.current_step, PacketPayload::OverallStop);
        info!(
            cancelled,
            citations = citation_map.len(),
            token_count,
            "turn finished"
        );

        Ok(TurnOutcome {
            cancelled,
            final_answer,
            citation_map,
        })
    }
}

fn close_open_section(turn: &mut TurnContext, emitter: &Emitter, message_open: &mut bool) {
    if *message_open {
        *message_open = false;
        emitter.emit(turn.current_step, PacketPayload::SectionEnd);
        turn.advance_step(2);
    }
}
