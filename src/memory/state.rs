//! 会话状态：对话轮次、消息日志、滚动摘要、活跃文档集合
//!
//! ConversationState 由调用方持有并显式传入每一轮，核心层从不保存全局会话状态。

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::handlers::StructuredResult;
use crate::intent::UserIntent;
use crate::memory::Message;

/// 提示词中摘要为空时使用的占位
pub const EMPTY_SUMMARY: &str = "No previous conversation.";

/// 一轮交互记录：创建于路由开始，由记忆整合写入历史后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub turn_id: String,
    pub user_input: String,
    pub intent: Option<UserIntent>,
    pub response: Option<StructuredResult>,
    #[serde(default)]
    pub tools_used: Vec<String>,
    /// 创建时间（毫秒时间戳）
    pub created_at: i64,
}

impl ConversationTurn {
    /// 路由开始时创建的草稿：尚无意图与结果
    pub fn draft(user_input: impl Into<String>) -> Self {
        Self {
            turn_id: uuid::Uuid::new_v4().to_string(),
            user_input: user_input.into(),
            intent: None,
            response: None,
            tools_used: Vec::new(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// 单个会话的对话状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: String,
    pub user_id: String,
    /// 已完成的轮次，插入顺序即对话顺序
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
    /// 交替的 user / assistant 消息，作为 LLM 上下文
    #[serde(default)]
    pub messages: Vec<Message>,
    /// 滚动摘要（由调用方维护）
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub active_documents: BTreeSet<String>,
}

impl ConversationState {
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            history: Vec::new(),
            messages: Vec::new(),
            summary: String::new(),
            active_documents: BTreeSet::new(),
        }
    }

    /// 以随机 session_id 新建会话
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), user_id)
    }

    /// 供提示词使用的摘要；为空时返回占位文本
    pub fn summary_or_default(&self) -> &str {
        if self.summary.trim().is_empty() {
            EMPTY_SUMMARY
        } else {
            &self.summary
        }
    }

    pub fn contains_turn(&self, turn_id: &str) -> bool {
        self.history.iter().any(|t| t.turn_id == turn_id)
    }

    pub fn last_turn(&self) -> Option<&ConversationTurn> {
        self.history.last()
    }

    /// 清空对话，保留 session / user 标识
    pub fn reset(&mut self) {
        self.history.clear();
        self.messages.clear();
        self.summary.clear();
        self.active_documents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_or_default() {
        let mut state = ConversationState::new("s1", "u1");
        assert_eq!(state.summary_or_default(), EMPTY_SUMMARY);
        state.summary = "Discussed Q3 revenue.".into();
        assert_eq!(state.summary_or_default(), "Discussed Q3 revenue.");
    }

    #[test]
    fn test_draft_turns_have_distinct_ids() {
        let a = ConversationTurn::draft("hi");
        let b = ConversationTurn::draft("hi");
        assert_ne!(a.turn_id, b.turn_id);
        assert!(a.intent.is_none() && a.response.is_none());
    }

    #[test]
    fn test_reset_keeps_identity() {
        let mut state = ConversationState::new("s1", "u1");
        state.messages.push(Message::user("hi"));
        state.active_documents.insert("doc-1".into());
        state.reset();
        assert!(state.messages.is_empty() && state.active_documents.is_empty());
        assert_eq!(state.session_id, "s1");
    }
}
