//! 任务处理器：问答 / 摘要 / 计算
//!
//! 三者共享 tool_loop，差异集中在 TaskKind；结果为 StructuredResult 三选一。

pub mod extract;
pub mod kind;
pub mod response;
pub mod tool_loop;

pub use extract::{extract_calculation_result, extract_document_ids, Extraction};
pub use kind::{TaskKind, CALCULATION_FALLBACK_QUERY};
pub use response::{AnswerResponse, CalculationResponse, StructuredResult, SummarizationResponse};
pub use tool_loop::{build_messages, run_tool_loop, HandlerContext, HandlerInput, HandlerOutput, ToolInvocation};
