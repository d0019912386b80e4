//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；支持 DeepSeek、OpenAI、自建代理等。
//! 只实现自由文本 complete：工具调用与结构化输出走 LlmClient 的文本协议默认实现，
//! 因此 tool 消息以 user 消息的形式回传（带调用 ID 前缀）。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::{Message, Role};

/// DeepSeek 的 OpenAI 兼容端点
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";

/// 创建 DeepSeek 客户端：Key 取 DEEPSEEK_API_KEY，缺失时回退 OPENAI_API_KEY；model 缺省取 DEEPSEEK_MODEL 或 deepseek-chat
pub fn create_deepseek_client(model: Option<&str>, base_url: Option<&str>) -> OpenAiClient {
    let api_key = std::env::var("DEEPSEEK_API_KEY")
        .ok()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok());
    let model = model
        .map(String::from)
        .or_else(|| std::env::var("DEEPSEEK_MODEL").ok())
        .unwrap_or_else(|| DEEPSEEK_CHAT.to_string());
    let base_url = base_url.filter(|u| !u.trim().is_empty()).unwrap_or(DEEPSEEK_BASE_URL);
    OpenAiClient::new(Some(base_url), &model, api_key.as_deref())
}

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// OpenAI 兼容客户端：持有 Client 与 model 名，complete 时转 Message 为 API 格式并取首条 content
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    request_timeout: Duration,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = match base_url.filter(|u| !u.trim().is_empty()) {
            Some(url) => OpenAIConfig::new().with_api_base(url).with_api_key(api_key),
            None => OpenAIConfig::new().with_api_key(api_key),
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            request_timeout: Duration::from_secs(60),
            usage: TokenUsage::new(),
        }
    }

    /// 单次请求超时
    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout = Duration::from_secs(secs.max(1));
        self
    }

    fn to_openai_messages(&self, messages: &[Message]) -> Result<Vec<ChatCompletionRequestMessage>, String> {
        messages
            .iter()
            .map(|m| {
                let msg = match m.role {
                    Role::System => ChatCompletionRequestMessage::System(
                        ChatCompletionRequestSystemMessageArgs::default()
                            .content(m.content.clone())
                            .build()
                            .map_err(|e| e.to_string())?,
                    ),
                    Role::User => ChatCompletionRequestMessage::User(
                        ChatCompletionRequestUserMessageArgs::default()
                            .content(m.content.clone())
                            .build()
                            .map_err(|e| e.to_string())?,
                    ),
                    Role::Assistant => ChatCompletionRequestMessage::Assistant(
                        ChatCompletionRequestAssistantMessageArgs::default()
                            .content(assistant_text(m))
                            .build()
                            .map_err(|e| e.to_string())?,
                    ),
                    Role::Tool => ChatCompletionRequestMessage::User(
                        ChatCompletionRequestUserMessageArgs::default()
                            .content(format!(
                                "Tool result [{}]:\n{}",
                                m.tool_call_id.as_deref().unwrap_or("tool"),
                                m.content
                            ))
                            .build()
                            .map_err(|e| e.to_string())?,
                    ),
                };
                Ok(msg)
            })
            .collect()
    }
}

/// assistant 消息的文本：内容为空但有工具调用时，还原为文本协议的 JSON
fn assistant_text(m: &Message) -> String {
    if !m.content.trim().is_empty() || m.tool_calls.is_empty() {
        return m.content.clone();
    }
    serde_json::json!({ "tool_calls": m.tool_calls }).to_string()
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(self.to_openai_messages(messages)?)
            .build()
            .map_err(|e| e.to_string())?;

        let response = tokio::time::timeout(self.request_timeout, self.client.chat().create(request))
            .await
            .map_err(|_| format!("LLM request timed out after {:?}", self.request_timeout))?
            .map_err(|e| e.to_string())?;

        // 提取 token 使用统计
        if let Some(usage) = &response.usage {
            self.usage.add(
                usage.prompt_tokens as u64,
                usage.completion_tokens as u64,
            );
        }

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ToolCall;

    #[test]
    fn test_assistant_text_restores_tool_calls() {
        let m = Message::assistant_with_tools(
            "",
            vec![ToolCall::new("calculator", serde_json::json!({"expression": "1+1"}))],
        );
        assert!(assistant_text(&m).contains("\"tool_calls\""));
        assert_eq!(assistant_text(&Message::assistant("hi")), "hi");
    }

    #[test]
    fn test_tool_messages_are_sent_as_user() {
        let client = OpenAiClient::new(None, "gpt-4o-mini", Some("sk-test"));
        let out = client
            .to_openai_messages(&[Message::tool("ID: doc-1", "call_1")])
            .unwrap();
        assert!(matches!(out[0], ChatCompletionRequestMessage::User(_)));
    }
}
