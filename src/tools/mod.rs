pub mod calculator;
pub mod documents;
pub mod executor;
pub mod registry;
pub mod schema;

pub use calculator::{CalculatorTool, CALCULATOR};
pub use documents::{
    Document, DocumentReaderTool, DocumentSearchTool, DocumentStore, DOCUMENT_READER, DOCUMENT_SEARCH,
};
pub use executor::ToolExecutor;
pub use registry::{Tool, ToolRegistry, ToolSpec};
pub use schema::{output_schema, tool_call_schema_json};
