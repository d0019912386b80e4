//! 文本协议：让只支持自由文本的后端也能提议工具调用与输出结构化 JSON
//!
//! 工具调用回复格式 `{"tool_calls": [{"id": "...", "name": "...", "args": {...}}]}`，
//! 兼容单调用格式 `{"tool": "...", "args": {...}}`。JSON 可以包在 ```json 代码块里。

use serde::Deserialize;
use serde_json::Value;

use crate::llm::OutputSchema;
use crate::memory::{Message, ToolCall};
use crate::tools::{tool_call_schema_json, ToolSpec};

#[derive(Deserialize)]
#[serde(untagged)]
enum ToolReply {
    Calls { tool_calls: Vec<ToolCall> },
    Single {
        tool: String,
        #[serde(default)]
        args: Value,
    },
}

/// 提取文本中的 JSON 块：优先 ```json ... ```，否则取第一个 '{' 到最后一个 '}'
pub fn extract_json_block(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        let block = rest.find("```").map(|end| &rest[..end]).unwrap_or(rest);
        return Some(block.trim());
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

/// 解析绑定工具后的回复；无法解析为工具调用时视为普通 assistant 回复
pub fn parse_tool_reply(text: &str) -> Message {
    let trimmed = text.trim();
    let calls = extract_json_block(trimmed)
        .and_then(|json| serde_json::from_str::<ToolReply>(json).ok())
        .map(|reply| match reply {
            ToolReply::Calls { tool_calls } => tool_calls,
            ToolReply::Single { tool, args } => vec![ToolCall::new(tool, args)],
        })
        .unwrap_or_default()
        .into_iter()
        .filter(|c| !c.name.trim().is_empty())
        .collect::<Vec<_>>();

    if calls.is_empty() {
        Message::assistant(trimmed)
    } else {
        Message::assistant_with_tools(trimmed, calls)
    }
}

/// 解析结构化输出回复，要求得到一个 JSON 对象
pub fn parse_structured_reply(text: &str) -> Result<Value, String> {
    let json = extract_json_block(text).ok_or_else(|| "no JSON object in model output".to_string())?;
    let value: Value = serde_json::from_str(json).map_err(|e| format!("{e}: {json}"))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(format!("expected a JSON object, got: {json}"))
    }
}

/// 工具模式的 system 指令：列出工具签名与回复格式
pub fn tool_instruction(tools: &[ToolSpec]) -> String {
    let specs = serde_json::to_string_pretty(tools).unwrap_or_else(|_| "[]".to_string());
    format!(
        "You can call the following tools:\n{specs}\n\n\
         To call tools, reply with ONLY a JSON object of the form \
         {{\"tool_calls\": [{{\"id\": \"call_1\", \"name\": \"<tool>\", \"args\": {{...}}}}]}}.\n\
         Reply schema:\n{}\n\
         If no tool is needed, reply with {{\"tool_calls\": []}}.",
        tool_call_schema_json()
    )
}

/// 结构化模式的 system 指令：给出目标 JSON Schema
pub fn structured_instruction(schema: &OutputSchema) -> String {
    let body = serde_json::to_string_pretty(&schema.schema).unwrap_or_default();
    format!(
        "Respond with ONLY a JSON object that conforms to the JSON Schema `{}` below. \
         Do not add any prose or Markdown.\n{body}",
        schema.name
    )
}
