//! 工作流构建器
//!
//! 提供流畅的 API 组装 TurnWorkflow：LLM、工具执行器、提示词、历史窗口、整合模式。

use std::sync::Arc;

use crate::core::AgentError;
use crate::handlers::HandlerContext;
use crate::llm::LlmClient;
use crate::prompts::PromptSet;
use crate::tools::ToolExecutor;
use crate::workflow::engine::{ConsolidationMode, TurnWorkflow};

/// 默认历史窗口（条）
pub const DEFAULT_HISTORY_WINDOW: usize = 4;

/// 工作流构建器
#[derive(Default)]
pub struct TurnWorkflowBuilder {
    llm: Option<Arc<dyn LlmClient>>,
    executor: Option<Arc<ToolExecutor>>,
    prompts: Option<Arc<PromptSet>>,
    history_window: Option<usize>,
    mode: ConsolidationMode,
}

impl TurnWorkflowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn executor(mut self, executor: Arc<ToolExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn prompts(mut self, prompts: Arc<PromptSet>) -> Self {
        self.prompts = Some(prompts);
        self
    }

    pub fn history_window(mut self, n: usize) -> Self {
        self.history_window = Some(n);
        self
    }

    pub fn consolidation(mut self, mode: ConsolidationMode) -> Self {
        self.mode = mode;
        self
    }

    /// 构建；缺少 LLM 或工具执行器时返回 ConfigError
    pub fn build(self) -> Result<TurnWorkflow, AgentError> {
        let llm = self
            .llm
            .ok_or_else(|| AgentError::ConfigError("workflow requires an LLM client".to_string()))?;
        let executor = self
            .executor
            .ok_or_else(|| AgentError::ConfigError("workflow requires a tool executor".to_string()))?;
        let ctx = HandlerContext {
            llm,
            executor,
            prompts: self.prompts.unwrap_or_default(),
            history_window: self.history_window.unwrap_or(DEFAULT_HISTORY_WINDOW),
        };
        Ok(TurnWorkflow::new(ctx).with_consolidation(self.mode))
    }
}
