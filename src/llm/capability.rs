//! 语言模型能力的三种调用方式
//!
//! - invoke_text：自由文本
//! - bind_tools(..).invoke：绑定工具签名，回复可携带工具调用提议
//! - invoke_structured::<T>：按 T 的 JSON Schema 输出，无法转换时返回 SchemaConformance

use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::tools::{output_schema, ToolSpec};

/// 绑定了工具签名的 LLM 句柄
pub struct ToolBoundLlm<'a> {
    llm: &'a dyn LlmClient,
    tools: Vec<ToolSpec>,
}

/// 绑定工具签名
pub fn bind_tools(llm: &dyn LlmClient, tools: Vec<ToolSpec>) -> ToolBoundLlm<'_> {
    ToolBoundLlm { llm, tools }
}

impl ToolBoundLlm<'_> {
    pub fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    pub async fn invoke(&self, messages: &[Message]) -> Result<Message, AgentError> {
        self.llm
            .complete_with_tools(messages, &self.tools)
            .await
            .map_err(AgentError::LlmError)
    }
}

/// 自由文本调用
pub async fn invoke_text(llm: &dyn LlmClient, messages: &[Message]) -> Result<String, AgentError> {
    llm.complete(messages).await.map_err(AgentError::LlmError)
}

/// 结构化输出调用：schema 由 schemars 从 T 生成
pub async fn invoke_structured<T>(llm: &dyn LlmClient, messages: &[Message]) -> Result<T, AgentError>
where
    T: DeserializeOwned + JsonSchema,
{
    let schema = output_schema::<T>();
    let value = llm
        .complete_structured(messages, &schema)
        .await
        .map_err(|reason| AgentError::SchemaConformance {
            schema: schema.name.clone(),
            reason,
        })?;
    serde_json::from_value(value).map_err(|e| AgentError::SchemaConformance {
        schema: schema.name,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::handlers::AnswerResponse;
    use crate::llm::MockLlmClient;

    #[tokio::test]
    async fn test_invoke_structured_deserializes() {
        let llm = MockLlmClient::new().with_structured(json!({
            "question": "q",
            "answer": "a",
            "sources": ["doc-1", "doc-1"],
            "confidence": 0.7
        }));
        let r: AnswerResponse = invoke_structured(&llm, &[Message::user("q")]).await.unwrap();
        assert_eq!(r.sources.len(), 1);
        assert_eq!(r.confidence, 0.7);
    }

    #[tokio::test]
    async fn test_invoke_structured_schema_mismatch() {
        let llm = MockLlmClient::new().with_structured(json!({"answer": 42}));
        let err = invoke_structured::<AnswerResponse>(&llm, &[Message::user("q")])
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::SchemaConformance { ref schema, .. } if schema == "AnswerResponse"));
    }

    #[tokio::test]
    async fn test_bound_invoke_passes_tool_specs() {
        let llm = MockLlmClient::new();
        let specs = vec![ToolSpec {
            name: "calculator".into(),
            description: "math".into(),
            parameters: json!({}),
        }];
        let bound = bind_tools(&llm, specs);
        let reply = bound.invoke(&[Message::user("hi")]).await.unwrap();
        assert!(reply.tool_calls.is_empty());
        assert_eq!(bound.tools().len(), 1);
        assert_eq!(
            llm.calls()[0].mode,
            crate::llm::MockMode::Tools(vec!["calculator".to_string()])
        );
    }
}
