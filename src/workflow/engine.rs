//! 单轮执行引擎
//!
//! 从 classify_intent 出发，按 route 逐个执行节点直到 end。整轮在会话状态的副本上运行，
//! 只有成功完成才把副本交还调用方；任何致命错误都让调用方的状态保持原样。

use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::handlers::{run_tool_loop, HandlerContext, HandlerInput, TaskKind};
use crate::intent::IntentClassifier;
use crate::memory::{ConversationState, ConversationTurn, MemoryConsolidator};
use crate::workflow::graph::route;
use crate::workflow::types::{AgentState, Step};

/// 记忆整合由谁执行
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsolidationMode {
    /// update_memory 节点在工作流内整合
    #[default]
    Inline,
    /// 调用方在工作流外整合；update_memory 节点只负责路由到 end
    External,
}

/// 一轮的产出
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// 本轮结束后的会话状态
    pub state: ConversationState,
    /// 已定稿的 turn（含意图、结构化结果、工具记录）
    pub turn: ConversationTurn,
    /// 本轮是否已在工作流内整合
    pub consolidated: bool,
}

/// 路由工作流
pub struct TurnWorkflow {
    classifier: IntentClassifier,
    handlers: HandlerContext,
    consolidator: MemoryConsolidator,
    mode: ConsolidationMode,
}

impl TurnWorkflow {
    pub fn new(handlers: HandlerContext) -> Self {
        let classifier = IntentClassifier::new(
            handlers.llm.clone(),
            handlers.prompts.intent_system.clone(),
            handlers.history_window,
        );
        Self {
            classifier,
            handlers,
            consolidator: MemoryConsolidator::new(),
            mode: ConsolidationMode::Inline,
        }
    }

    pub fn with_consolidation(mut self, mode: ConsolidationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn consolidation_mode(&self) -> ConsolidationMode {
        self.mode
    }

    /// 在 conversation 的副本上执行一轮，成功时返回新状态；conversation 本身不会被修改
    pub async fn run_turn(
        &self,
        user_input: &str,
        conversation: &ConversationState,
    ) -> Result<TurnOutcome, AgentError> {
        let mut state = AgentState::new(user_input, conversation.clone());
        let mut step = Step::ClassifyIntent;
        let mut consolidated = false;
        let mut reached_memory = false;

        while !step.is_terminal() {
            state.next_step = None;
            match step {
                Step::ClassifyIntent => self.classify(&mut state).await?,
                Step::QaAgent | Step::SummarizationAgent | Step::CalculationAgent => {
                    self.run_handler(step, &mut state).await?
                }
                Step::UpdateMemory => {
                    reached_memory = true;
                    consolidated = self.update_memory(&mut state)?;
                }
                Step::End => break,
            }
            let next = route(step, &state);
            tracing::info!(
                session_id = %state.conversation.session_id,
                step = %step,
                next = %next,
                "step finished"
            );
            step = next;
        }

        if state.current_response.is_none() {
            return Err(AgentError::IncompleteTurn(
                "workflow ended without a structured result".to_string(),
            ));
        }
        if !reached_memory {
            return Err(AgentError::IncompleteTurn(
                "workflow ended before update_memory".to_string(),
            ));
        }

        let turn = state.finalize_turn().clone();
        tracing::info!(
            session_id = %state.conversation.session_id,
            turn_id = %turn.turn_id,
            tools = turn.tools_used.len(),
            consolidated,
            "turn completed"
        );
        Ok(TurnOutcome {
            state: state.conversation,
            turn,
            consolidated,
        })
    }

    /// 执行一轮并在成功时原地提交到 conversation；失败时 conversation 保持不变
    pub async fn process(
        &self,
        user_input: &str,
        conversation: &mut ConversationState,
    ) -> Result<ConversationTurn, AgentError> {
        let outcome = self.run_turn(user_input, conversation).await?;
        *conversation = outcome.state;
        Ok(outcome.turn)
    }

    async fn classify(&self, state: &mut AgentState) -> Result<(), AgentError> {
        let intent = self
            .classifier
            .classify(&state.conversation.messages, &state.user_input)
            .await?;
        let next = intent.next_step();
        state.intent = Some(intent);
        state.set_next(next);
        Ok(())
    }

    async fn run_handler(&self, step: Step, state: &mut AgentState) -> Result<(), AgentError> {
        let Some(kind) = TaskKind::from_step(step) else {
            return Ok(());
        };
        let input = HandlerInput {
            user_input: &state.user_input,
            summary: state.conversation.summary_or_default(),
            history: &state.conversation.messages,
        };
        let output = run_tool_loop(&self.handlers, kind, input).await?;
        state.current_response = Some(output.response);
        state.tools_used = output.tools_used;
        state.set_next(Step::UpdateMemory);
        Ok(())
    }

    fn update_memory(&self, state: &mut AgentState) -> Result<bool, AgentError> {
        let consolidated = match self.mode {
            ConsolidationMode::Inline => {
                let turn = state.finalize_turn().clone();
                self.consolidator.consolidate(&mut state.conversation, &turn)?
            }
            ConsolidationMode::External => {
                tracing::debug!(turn_id = %state.turn.turn_id, "consolidation left to caller");
                false
            }
        };
        state.set_next(Step::End);
        Ok(consolidated)
    }
}
