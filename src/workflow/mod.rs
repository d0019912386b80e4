pub mod builder;
pub mod engine;
pub mod graph;
pub mod types;

pub use builder::{TurnWorkflowBuilder, DEFAULT_HISTORY_WINDOW};
pub use engine::{ConsolidationMode, TurnOutcome, TurnWorkflow};
pub use graph::{route, successors};
pub use types::{AgentState, Step};
