//! 路由器错误类型
//!
//! 致命错误（分类失败、结构化输出失败、LLM 调用失败、回合未完成）会中止当前回合，
//! 会话状态保持回合开始前的值；工具类错误只在执行器层出现，工具循环会把它转成上下文文本继续。

use thiserror::Error;

/// 回合处理过程中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("Intent classification failed: {0}")]
    ClassificationFailed(String),

    /// 模型输出无法转换为目标 schema
    #[error("Structured output does not conform to {schema}: {reason}")]
    SchemaConformance { schema: String, reason: String },

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    /// 状态机在产出结构化结果之前到达 end（路由键缺失或无法识别）
    #[error("Turn incomplete: {0}")]
    IncompleteTurn(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl AgentError {
    /// 工具类错误：工具循环会把它们作为文本回填给模型，而不是中止回合
    pub fn is_tool_error(&self) -> bool {
        matches!(
            self,
            AgentError::ToolExecutionFailed(_) | AgentError::ToolTimeout(_) | AgentError::UnknownTool(_)
        )
    }
}
