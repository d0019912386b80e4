//! 路由状态机类型
//!
//! Step 是状态机的状态；AgentState 是单轮内共享的可变状态（路由键 next_step、草稿 turn、
//! 会话状态的工作副本），回合结束即丢弃。

use serde::{Deserialize, Serialize};

use crate::handlers::StructuredResult;
use crate::intent::UserIntent;
use crate::memory::{ConversationState, ConversationTurn};

/// 状态机状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// 初始状态
    ClassifyIntent,
    QaAgent,
    SummarizationAgent,
    CalculationAgent,
    UpdateMemory,
    /// 终止状态
    End,
}

impl Step {
    /// 路由键
    pub fn as_str(self) -> &'static str {
        match self {
            Step::ClassifyIntent => "classify_intent",
            Step::QaAgent => "qa_agent",
            Step::SummarizationAgent => "summarization_agent",
            Step::CalculationAgent => "calculation_agent",
            Step::UpdateMemory => "update_memory",
            Step::End => "end",
        }
    }

    /// 解析路由键；无法识别返回 None
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "classify_intent" => Some(Step::ClassifyIntent),
            "qa_agent" => Some(Step::QaAgent),
            "summarization_agent" => Some(Step::SummarizationAgent),
            "calculation_agent" => Some(Step::CalculationAgent),
            "update_memory" => Some(Step::UpdateMemory),
            "end" => Some(Step::End),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Step::End
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单轮共享状态
#[derive(Debug, Clone)]
pub struct AgentState {
    pub user_input: String,
    pub intent: Option<UserIntent>,
    /// 由刚执行完的节点写入的路由键
    pub next_step: Option<String>,
    /// 会话状态的工作副本；只有回合成功才会替换调用方的状态
    pub conversation: ConversationState,
    pub turn: ConversationTurn,
    pub current_response: Option<StructuredResult>,
    pub tools_used: Vec<String>,
}

impl AgentState {
    pub fn new(user_input: impl Into<String>, conversation: ConversationState) -> Self {
        let user_input = user_input.into();
        Self {
            turn: ConversationTurn::draft(user_input.clone()),
            user_input,
            intent: None,
            next_step: None,
            conversation,
            current_response: None,
            tools_used: Vec::new(),
        }
    }

    pub fn set_next(&mut self, step: Step) {
        self.next_step = Some(step.as_str().to_string());
    }

    /// 把本轮的意图、结果与工具记录同步到草稿 turn
    pub fn finalize_turn(&mut self) -> &ConversationTurn {
        self.turn.intent = self.intent.clone();
        self.turn.response = self.current_response.clone();
        self.turn.tools_used = self.tools_used.clone();
        &self.turn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_keys_round_trip() {
        for step in [
            Step::ClassifyIntent,
            Step::QaAgent,
            Step::SummarizationAgent,
            Step::CalculationAgent,
            Step::UpdateMemory,
            Step::End,
        ] {
            assert_eq!(Step::from_key(step.as_str()), Some(step));
        }
        assert_eq!(Step::from_key("qa"), None);
    }

    #[test]
    fn test_new_state_has_draft_turn() {
        let state = AgentState::new("hello", ConversationState::new("s", "u"));
        assert_eq!(state.turn.user_input, "hello");
        assert!(state.next_step.is_none());
        assert!(state.turn.response.is_none());
    }
}
