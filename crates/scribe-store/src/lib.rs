pub mod database;
pub mod error;
pub mod messages;
pub mod row_helpers;
pub mod schema;
pub mod sessions;
pub mod turns;

pub use database::Database;
pub use error::StoreError;
pub use messages::{ChatMessageRepo, ChatMessageRow, MessageRole};
pub use sessions::{ChatSessionRepo, ChatSessionRow};
pub use turns::{SavedTurn, TurnStore};
