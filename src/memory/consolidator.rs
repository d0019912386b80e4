//! 记忆整合：把一轮的结构化结果写回会话状态
//!
//! 四步（写历史 / 追加 user + assistant 消息 / 合并活跃文档 / 路由键置 end）对单轮原子生效：
//! 所有前置检查在第一次写入之前完成，检查通过后的写入不会失败。
//! 同一轮重复调用是空操作，因此可以在工作流外部（上游调用方）单独执行。

use crate::core::AgentError;
use crate::memory::{ConversationState, ConversationTurn, Message};

/// 记忆整合器（无状态）
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryConsolidator;

impl MemoryConsolidator {
    pub fn new() -> Self {
        Self
    }

    /// 将 turn 写入 state；返回 Ok(false) 表示该轮已整合过，未做任何修改
    pub fn consolidate(
        &self,
        state: &mut ConversationState,
        turn: &ConversationTurn,
    ) -> Result<bool, AgentError> {
        let Some(response) = turn.response.as_ref() else {
            return Err(AgentError::IncompleteTurn(format!(
                "turn {} has no structured result to consolidate",
                turn.turn_id
            )));
        };
        if state.contains_turn(&turn.turn_id) {
            tracing::debug!(turn_id = %turn.turn_id, "turn already consolidated, skipping");
            return Ok(false);
        }

        let agent_message = response.primary_text().map(Message::assistant);
        let new_documents: Vec<String> = response
            .recovered_ids()
            .iter()
            .filter(|id| !state.active_documents.contains(*id))
            .cloned()
            .collect();

        state.history.push(turn.clone());
        state.messages.push(Message::user(turn.user_input.clone()));
        if let Some(msg) = agent_message {
            state.messages.push(msg);
        }
        state.active_documents.extend(new_documents.iter().cloned());

        tracing::info!(
            session_id = %state.session_id,
            turn_id = %turn.turn_id,
            new_documents = new_documents.len(),
            active_documents = state.active_documents.len(),
            "memory consolidated"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::handlers::{AnswerResponse, StructuredResult, SummarizationResponse};
    use crate::memory::Role;

    fn answer_turn(input: &str, answer: &str, sources: &[&str]) -> ConversationTurn {
        let mut turn = ConversationTurn::draft(input);
        turn.response = Some(StructuredResult::Answer(AnswerResponse {
            question: input.into(),
            answer: answer.into(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
            confidence: 0.8,
        }));
        turn.tools_used = vec!["document_search".into()];
        turn
    }

    #[test]
    fn test_consolidate_applies_all_steps() {
        let mut state = ConversationState::new("s1", "u1");
        let turn = answer_turn("What is X?", "X is Y.", &["doc-1"]);

        assert!(MemoryConsolidator::new().consolidate(&mut state, &turn).unwrap());

        assert_eq!(state.history.len(), 1);
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].role, Role::User);
        assert_eq!(state.messages[0].content, "What is X?");
        assert_eq!(state.messages[1].role, Role::Assistant);
        assert_eq!(state.messages[1].content, "X is Y.");
        assert!(state.active_documents.contains("doc-1"));
    }

    #[test]
    fn test_consolidate_twice_is_noop() {
        let mut state = ConversationState::new("s1", "u1");
        let turn = answer_turn("q", "a", &["doc-1"]);
        let consolidator = MemoryConsolidator::new();
        consolidator.consolidate(&mut state, &turn).unwrap();
        let snapshot = state.clone();

        assert!(!consolidator.consolidate(&mut state, &turn).unwrap());
        assert_eq!(state, snapshot);
    }

    #[test]
    fn test_active_documents_union_across_turns() {
        let mut state = ConversationState::new("s1", "u1");
        let consolidator = MemoryConsolidator::new();
        consolidator
            .consolidate(&mut state, &answer_turn("q1", "a1", &["doc-1", "doc-2"]))
            .unwrap();
        consolidator
            .consolidate(&mut state, &answer_turn("q2", "a2", &["doc-2", "doc-3"]))
            .unwrap();

        let expected: BTreeSet<String> =
            ["doc-1", "doc-2", "doc-3"].iter().map(|s| s.to_string()).collect();
        assert_eq!(state.active_documents, expected);
    }

    #[test]
    fn test_incomplete_turn_leaves_state_untouched() {
        let mut state = ConversationState::new("s1", "u1");
        let snapshot = state.clone();
        let turn = ConversationTurn::draft("q");

        let err = MemoryConsolidator::new().consolidate(&mut state, &turn).unwrap_err();
        assert!(matches!(err, AgentError::IncompleteTurn(_)));
        assert_eq!(state, snapshot);
    }

    #[test]
    fn test_empty_primary_text_skips_agent_message() {
        let mut state = ConversationState::new("s1", "u1");
        let mut turn = ConversationTurn::draft("Summarize it");
        turn.response = Some(StructuredResult::Summary(SummarizationResponse {
            summary: String::new(),
            key_points: vec![],
            document_ids: ["doc-5".to_string()].into_iter().collect(),
            original_length: 10,
        }));

        MemoryConsolidator::new().consolidate(&mut state, &turn).unwrap();
        assert_eq!(state.messages.len(), 1);
        assert!(state.active_documents.contains("doc-5"));
    }
}
