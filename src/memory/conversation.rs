//! 消息模型：与 LLM API 一致的角色与消息
//!
//! 除 user / assistant / system 外还包含 tool 角色：assistant 消息可携带若干 ToolCall，
//! tool 消息通过 tool_call_id 回指对应调用。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// LLM 提议的一次工具调用：名称、参数（JSON 对象）、可选调用 ID
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            args,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// tool 消息回指的 ID：无调用 ID 时退回工具名
    pub fn reply_id(&self) -> String {
        self.id.clone().unwrap_or_else(|| self.name.clone())
    }
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    /// 携带工具调用提议的 assistant 消息
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::plain(Role::Assistant, content)
        }
    }

    /// 工具结果消息，tool_call_id 回指发起调用
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::plain(Role::Tool, content)
        }
    }
}

/// 取最近 n 条消息（保持原有顺序）
pub fn trailing_messages(messages: &[Message], n: usize) -> &[Message] {
    &messages[messages.len().saturating_sub(n)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_messages_keeps_order() {
        let msgs: Vec<Message> = (0..6).map(|i| Message::user(format!("m{i}"))).collect();
        let tail = trailing_messages(&msgs, 4);
        let contents: Vec<&str> = tail.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4", "m5"]);
    }

    #[test]
    fn test_trailing_messages_short_history() {
        let msgs = vec![Message::user("only")];
        assert_eq!(trailing_messages(&msgs, 4).len(), 1);
        assert!(trailing_messages(&[], 4).is_empty());
    }

    #[test]
    fn test_reply_id_falls_back_to_name() {
        let call = ToolCall::new("calculator", Value::Null);
        assert_eq!(call.reply_id(), "calculator");
        let call = call.with_id("call_1");
        assert_eq!(call.reply_id(), "call_1");
    }

    #[test]
    fn test_message_serde_skips_empty_tool_fields() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }
}
