//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按调用方式分别排队脚本化回复（文本 / 工具调用 / 结构化），并记录每次调用收到的消息。
//! 队列为空时：文本模式回显最后一条 User 消息，工具模式不提议任何调用，结构化模式返回错误。

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::{LlmClient, OutputSchema};
use crate::memory::{Message, Role, ToolCall};
use crate::tools::ToolSpec;

/// 调用方式
#[derive(Debug, Clone, PartialEq)]
pub enum MockMode {
    Text,
    /// 绑定的工具名
    Tools(Vec<String>),
    /// 目标 schema 名
    Structured(String),
}

/// 一次被记录的调用
#[derive(Debug, Clone)]
pub struct MockCall {
    pub mode: MockMode,
    pub messages: Vec<Message>,
}

/// Mock 客户端：脚本化回复 + 调用记录
#[derive(Debug, Default)]
pub struct MockLlmClient {
    text_replies: Mutex<VecDeque<String>>,
    tool_replies: Mutex<VecDeque<Message>>,
    structured_replies: Mutex<VecDeque<Result<Value, String>>>,
    calls: Mutex<Vec<MockCall>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条自由文本回复
    pub fn with_text(self, text: impl Into<String>) -> Self {
        lock(&self.text_replies).push_back(text.into());
        self
    }

    /// 追加一条工具模式回复（提议给定的工具调用）
    pub fn with_tool_calls(self, calls: Vec<ToolCall>) -> Self {
        lock(&self.tool_replies).push_back(Message::assistant_with_tools("", calls));
        self
    }

    /// 追加一条结构化回复
    pub fn with_structured(self, value: Value) -> Self {
        lock(&self.structured_replies).push_back(Ok(value));
        self
    }

    /// 追加一次结构化失败
    pub fn with_structured_error(self, reason: impl Into<String>) -> Self {
        lock(&self.structured_replies).push_back(Err(reason.into()));
        self
    }

    /// 已记录的全部调用（按发生顺序）
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, mode: MockMode, messages: &[Message]) {
        lock(&self.calls).push(MockCall {
            mode,
            messages: messages.to_vec(),
        });
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        self.record(MockMode::Text, messages);
        if let Some(text) = lock(&self.text_replies).pop_front() {
            return Ok(text);
        }
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        Ok(format!("Echo from Mock: {last_user}"))
    }

    async fn complete_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, String> {
        let names = tools.iter().map(|t| t.name.clone()).collect();
        self.record(MockMode::Tools(names), messages);
        Ok(lock(&self.tool_replies)
            .pop_front()
            .unwrap_or_else(|| Message::assistant("")))
    }

    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &OutputSchema,
    ) -> Result<Value, String> {
        self.record(MockMode::Structured(schema.name.clone()), messages);
        lock(&self.structured_replies)
            .pop_front()
            .unwrap_or_else(|| Err(format!("mock: no structured reply scripted for {}", schema.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_when_unscripted() {
        let llm = MockLlmClient::new();
        let out = llm.complete(&[Message::user("ping")]).await.unwrap();
        assert_eq!(out, "Echo from Mock: ping");
    }

    #[tokio::test]
    async fn test_scripted_replies_in_order() {
        let llm = MockLlmClient::new().with_text("first").with_text("second");
        assert_eq!(llm.complete(&[]).await.unwrap(), "first");
        assert_eq!(llm.complete(&[]).await.unwrap(), "second");
        assert_eq!(llm.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_structured_unscripted_is_error() {
        let llm = MockLlmClient::new();
        let schema = OutputSchema {
            name: "UserIntent".into(),
            schema: Value::Null,
        };
        assert!(llm.complete_structured(&[], &schema).await.is_err());
    }
}
