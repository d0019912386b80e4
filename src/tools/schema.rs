//! JSON Schema 生成（schemars）
//!
//! - output_schema::<T>()：结构化输出模式下交给 LLM 的目标 schema
//! - tool_call_schema_json()：文本协议下「合法 tool call 回复」的 JSON 结构，拼入 system prompt 减少格式错误

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

use crate::llm::OutputSchema;

/// 文本协议的工具调用回复格式：与 llm::protocol 的解析一致（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolCallReply {
    /// 按执行顺序排列的工具调用；不需要工具时为空数组
    pub tool_calls: Vec<ToolCallFormat>,
}

#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolCallFormat {
    /// 调用 ID，可省略
    pub id: Option<String>,
    /// 工具名，如 document_search、document_reader、calculator
    pub name: String,
    /// 工具参数对象
    pub args: std::collections::HashMap<String, Value>,
}

/// 生成类型 T 的输出 schema（名称取 schemars 的 schema_name）
pub fn output_schema<T: JsonSchema>() -> OutputSchema {
    let schema = schema_for!(T);
    OutputSchema {
        name: T::schema_name(),
        schema: serde_json::to_value(&schema).unwrap_or(Value::Null),
    }
}

/// 返回工具调用回复的 JSON Schema 字符串，可拼入 system prompt
pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(ToolCallReply);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::AnswerResponse;

    #[test]
    fn test_output_schema_lists_fields() {
        let schema = output_schema::<AnswerResponse>();
        assert_eq!(schema.name, "AnswerResponse");
        let props = &schema.schema["properties"];
        for field in ["question", "answer", "sources", "confidence"] {
            assert!(props.get(field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn test_tool_call_schema_mentions_tool_calls() {
        assert!(tool_call_schema_json().contains("tool_calls"));
    }
}
