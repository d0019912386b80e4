//! 路由函数
//!
//! 边表：classify_intent → 三个处理器之一 → update_memory → end。
//! route 是纯函数，只读路由键；键缺失、无法识别或不在边表内时一律终止，不会形成环。

use crate::workflow::types::{AgentState, Step};

/// current 允许的后继
pub fn successors(current: Step) -> &'static [Step] {
    match current {
        Step::ClassifyIntent => &[Step::QaAgent, Step::SummarizationAgent, Step::CalculationAgent],
        Step::QaAgent | Step::SummarizationAgent | Step::CalculationAgent => &[Step::UpdateMemory],
        Step::UpdateMemory => &[Step::End],
        Step::End => &[],
    }
}

/// 计算下一个状态
pub fn route(current: Step, state: &AgentState) -> Step {
    if current.is_terminal() {
        return Step::End;
    }
    match state.next_step.as_deref().and_then(Step::from_key) {
        Some(next) if successors(current).contains(&next) => next,
        _ => Step::End,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ConversationState;

    fn state_with(key: Option<&str>) -> AgentState {
        let mut state = AgentState::new("hi", ConversationState::new("s", "u"));
        state.next_step = key.map(String::from);
        state
    }

    #[test]
    fn test_happy_path_edges() {
        assert_eq!(route(Step::ClassifyIntent, &state_with(Some("calculation_agent"))), Step::CalculationAgent);
        assert_eq!(route(Step::QaAgent, &state_with(Some("update_memory"))), Step::UpdateMemory);
        assert_eq!(route(Step::UpdateMemory, &state_with(Some("end"))), Step::End);
    }

    #[test]
    fn test_missing_or_unknown_key_terminates() {
        assert_eq!(route(Step::ClassifyIntent, &state_with(None)), Step::End);
        assert_eq!(route(Step::QaAgent, &state_with(Some("translation_agent"))), Step::End);
    }

    #[test]
    fn test_disallowed_edges_terminate() {
        // 不允许回到 classify_intent，也不允许跳过处理器
        assert_eq!(route(Step::UpdateMemory, &state_with(Some("classify_intent"))), Step::End);
        assert_eq!(route(Step::ClassifyIntent, &state_with(Some("update_memory"))), Step::End);
        assert_eq!(route(Step::QaAgent, &state_with(Some("summarization_agent"))), Step::End);
    }

    #[test]
    fn test_end_is_absorbing() {
        assert_eq!(route(Step::End, &state_with(Some("qa_agent"))), Step::End);
    }
}
