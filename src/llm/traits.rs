//! LLM 客户端抽象
//!
//! 所有后端实现 LlmClient：complete（自由文本）为必需方法；complete_with_tools（可提议工具调用）
//! 与 complete_structured（按 schema 输出 JSON）有基于文本协议的默认实现，原生支持的后端可覆盖。

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::llm::protocol;
use crate::memory::Message;
use crate::tools::ToolSpec;

/// 结构化输出的目标 schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputSchema {
    pub name: String,
    pub schema: Value,
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 自由文本完成
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;

    /// 绑定工具后的完成：返回的 assistant 消息可携带零个或多个 ToolCall
    async fn complete_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, String> {
        let mut full = Vec::with_capacity(messages.len() + 1);
        full.push(Message::system(protocol::tool_instruction(tools)));
        full.extend_from_slice(messages);
        let reply = self.complete(&full).await?;
        Ok(protocol::parse_tool_reply(&reply))
    }

    /// 结构化输出：返回符合 schema 的 JSON 对象（反序列化由调用方完成）
    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &OutputSchema,
    ) -> Result<Value, String> {
        let mut full = messages.to_vec();
        full.push(Message::system(protocol::structured_instruction(schema)));
        let reply = self.complete(&full).await?;
        protocol::parse_structured_reply(&reply)
    }

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
