//! 记忆层：消息模型、会话状态、记忆整合、持久化

pub mod consolidator;
pub mod conversation;
pub mod persistence;
pub mod state;

pub use consolidator::MemoryConsolidator;
pub use conversation::{trailing_messages, Message, Role, ToolCall};
pub use persistence::StatePersistence;
pub use state::{ConversationState, ConversationTurn, EMPTY_SUMMARY};
