use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::ToolCallId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// What the caller hands to the agent runtime to open a run.
#[derive(Clone, Debug)]
pub struct RunRequest {
    pub messages: Vec<ChatMessage>,
    pub tool_names: Vec<String>,
    pub max_turns: u32,
}

/// A tool invocation requested by the model mid-run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: ToolCallId,
    pub name: String,
    pub arguments: Value,
}

/// Raw event stream produced by an agent run, before translation into
/// packets. `MessageEnd` closes the message that `MessageStart` opened.
#[derive(Clone, Debug)]
pub enum RunEvent {
    MessageStart { text: String },
    MessageDelta { text: String },
    MessageEnd,
    ToolCall(ToolCallRequest),
    RunError { message: String },
}

/// One in-flight agent run. `next_event` returning `None` means the run
/// finished; `cancel` must be safe to call before, during, or after any
/// event, and repeatedly.
#[async_trait]
pub trait AgentRun: Send {
    async fn next_event(&mut self) -> Option<RunEvent>;
    async fn cancel(&mut self);
}

pub trait AgentRuntime: Send + Sync {
    fn start_run(&self, request: RunRequest) -> Box<dyn AgentRun>;
}

/// Replays a fixed event script. Used by tests and the demo bin in place
/// of a real model-backed runtime.
pub struct ScriptedRun {
    events: std::vec::IntoIter<RunEvent>,
    cancelled: bool,
}

impl ScriptedRun {
    pub fn new(events: Vec<RunEvent>) -> Self {
        Self {
            events: events.into_iter(),
            cancelled: false,
        }
    }
}

#[async_trait]
impl AgentRun for ScriptedRun {
    async fn next_event(&mut self) -> Option<RunEvent> {
        if self.cancelled {
            return None;
        }
        self.events.next()
    }

    async fn cancel(&mut self) {
        self.cancelled = true;
    }
}

/// Starts a fresh [`ScriptedRun`] from the same script on every call.
pub struct ScriptedRuntime {
    script: parking_lot::Mutex<Vec<RunEvent>>,
}

impl ScriptedRuntime {
    pub fn new(script: Vec<RunEvent>) -> Self {
        Self {
            script: parking_lot::Mutex::new(script),
        }
    }
}

impl AgentRuntime for ScriptedRuntime {
    fn start_run(&self, _request: RunRequest) -> Box<dyn AgentRun> {
        Box::new(ScriptedRun::new(self.script.lock().clone()))
    }
}
