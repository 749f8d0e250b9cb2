pub mod bridge;
pub mod cancel;
pub mod citations;
pub mod error;
pub mod registry;
pub mod turn;
pub mod wrapper;

pub use bridge::{BridgeConfig, RunBridge};
pub use cancel::InMemoryCancelStore;
pub use error::EngineError;
pub use registry::ToolRegistry;
pub use turn::{TurnDeps, TurnRunner};
