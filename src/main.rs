use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use scribe_core::agent::{
    AgentRuntime, ChatMessage, RunEvent, RunRequest, ScriptedRuntime, ToolCallRequest,
};
use scribe_core::context::{IterationAnswer, IterationInstruction, ResearchType, TurnContext};
use scribe_core::document::Document;
use scribe_core::emitter::Emitter;
use scribe_core::ids::ToolCallId;
use scribe_core::packet::PacketPayload;
use scribe_core::tokens::HeuristicCounter;
use scribe_core::tools::{ToolError, ToolFamily, TurnTool};
use scribe_engine::bridge::BridgeConfig;
use scribe_engine::{InMemoryCancelStore, RunBridge, ToolRegistry, TurnDeps, TurnRunner};
use scribe_store::{ChatMessageRepo, ChatSessionRepo, Database, MessageRole, TurnStore};
use scribe_telemetry::TurnMetrics;

#[derive(Parser)]
#[command(name = "scribe", about = "Chat-turn execution engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one scripted turn and print its packet stream.
    Demo {
        /// Database file; in-memory when omitted.
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

/// Scripted stand-in for a real search backend.
struct DemoSearchTool;

impl TurnTool for DemoSearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn family(&self) -> ToolFamily {
        ToolFamily::Search
    }

    fn invoke(
        &self,
        call: &ToolCallRequest,
        turn: &mut TurnContext,
        emitter: &Emitter,
    ) -> Result<(), ToolError> {
        let docs = vec![
            Document::new(
                "The Rust Programming Language",
                "https://doc.rust-lang.org/book/",
                "Ownership is Rust's most unique feature.",
            ),
            Document::new(
                "Fearless Concurrency",
                "https://doc.rust-lang.org/book/ch16-00-concurrency.html",
                "Rust's type system prevents data races at compile time.",
            ),
        ];
        emitter.emit(
            turn.current_step,
            PacketPayload::SearchToolDelta {
                documents: docs.clone(),
            },
        );
        let nr = turn.next_iteration_nr();
        turn.instructions.push(IterationInstruction {
            iteration_nr: nr,
            plan: "search for Rust concurrency material".into(),
            purpose: "ground the answer in sources".into(),
            reasoning: "the question needs citations".into(),
        });
        turn.aggregated.iteration_answers.push(IterationAnswer {
            tool_name: "search".into(),
            tool_id: call.id.clone(),
            iteration_nr: nr,
            parallelization_nr: 1,
            question: "what makes Rust concurrency safe".into(),
            reasoning: "two relevant documents found".into(),
            answer: "ownership and the type system".into(),
            cited_documents: docs
                .into_iter()
                .enumerate()
                .map(|(i, doc)| (i as u32 + 1, doc))
                .collect(),
            generated_images: Vec::new(),
            file_ids: None,
            response_type: None,
            additional_data: None,
        });
        Ok(())
    }
}

fn main() {
    scribe_telemetry::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Demo { db } => run_demo(db),
    }
}

fn run_demo(db_path: Option<PathBuf>) {
    let db = match db_path {
        Some(path) => Database::open(&path).expect("open database"),
        None => Database::in_memory().expect("open in-memory database"),
    };

    let session = ChatSessionRepo::new(db.clone())
        .create(Some("demo"))
        .expect("create chat session");
    let messages = ChatMessageRepo::new(db.clone());
    messages
        .create(&session.id, MessageRole::User, "Why is Rust good at concurrency?")
        .expect("create user message");
    let assistant = messages
        .create(&session.id, MessageRole::Assistant, "")
        .expect("create assistant message");

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(DemoSearchTool));

    let deps = TurnDeps {
        emitter: Arc::new(Emitter::new()),
        registry: Arc::new(registry),
        cancel_flags: Arc::new(InMemoryCancelStore::new()),
        store: TurnStore::new(db.clone()),
        tokens: Arc::new(HeuristicCounter),
        metrics: Arc::new(TurnMetrics::new()),
        model: "demo-model".into(),
    };

    let runtime: Arc<dyn AgentRuntime> = Arc::new(ScriptedRuntime::new(vec![
        RunEvent::ToolCall(ToolCallRequest {
            id: ToolCallId::new(),
            name: "search".into(),
            arguments: serde_json::json!({"queries": ["rust concurrency"]}),
        }),
        RunEvent::MessageStart {
            text: "Rust prevents data races at compile time [[2]]".into(),
        },
        RunEvent::MessageDelta {
            text: " and its ownership model removes whole classes of bugs [[1]].".into(),
        },
        RunEvent::MessageEnd,
    ]));
    let request = RunRequest {
        messages: vec![ChatMessage::user("Why is Rust good at concurrency?")],
        tool_names: vec!["search".into()],
        max_turns: 1,
    };

    let bridge =
        RunBridge::spawn(runtime, request, BridgeConfig::default()).expect("spawn run bridge");
    let turn = TurnContext::new(session.id, assistant.id, ResearchType::Quick);

    let outcome = TurnRunner::run(&deps, turn, bridge).expect("run turn");

    for packet in deps.emitter.history() {
        match serde_json::to_string(&packet) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!("serialize packet: {e}"),
        }
    }
    println!(
        "citation_map: {}",
        serde_json::to_string(&outcome.citation_map).unwrap_or_default()
    );

    let snap = deps.metrics.snapshot();
    tracing::info!(
        turns_completed = snap.turns_completed,
        tool_calls = snap.tool_calls,
        "demo finished"
    );
}
