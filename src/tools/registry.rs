//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），由 ToolRegistry 按名注册与查找；
//! specs() 导出供 LLM 绑定的工具签名，ToolExecutor 在调用时加超时并统一转 AgentError。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 为 JSON 对象）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（LLM 调用时使用的名字）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema（供 LLM 生成正确的参数格式）
    /// 默认返回空对象，表示无参数或参数格式不限
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 执行工具
    async fn execute(&self, args: Value) -> Result<String, String>;
}

/// 绑定给 LLM 的工具签名
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// 工具注册表：按名称存储 Arc<dyn Tool>，支持 register / contains / execute / specs
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub async fn execute(&self, name: &str, args: Value) -> Result<String, String> {
        let tool = self.tools.get(name).ok_or_else(|| format!("Unknown tool: {name}"))?;
        tool.execute(args).await
    }

    /// 按名称排序的工具名，保证提示词稳定
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// 全部工具签名（按名称排序）
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tool_names()
            .into_iter()
            .filter_map(|name| {
                let tool = self.tools.get(&name)?;
                Some(ToolSpec {
                    description: tool.description().to_string(),
                    parameters: tool.parameters_schema(),
                    name,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    #[async_trait]
    impl Tool for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "Uppercase text. Args: {\"text\": \"...\"}"
        }

        async fn execute(&self, args: Value) -> Result<String, String> {
            args.get("text")
                .and_then(|v| v.as_str())
                .map(|s| s.to_uppercase())
                .ok_or_else(|| "Missing required argument: text".to_string())
        }
    }

    struct Noop(&'static str);

    #[async_trait]
    impl Tool for Noop {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "noop"
        }

        async fn execute(&self, _args: Value) -> Result<String, String> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_register_and_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(Upper);
        let out = registry
            .execute("upper", serde_json::json!({"text": "abc"}))
            .await
            .unwrap();
        assert_eq!(out, "ABC");
        assert!(registry.execute("missing", Value::Null).await.is_err());
    }

    #[test]
    fn test_specs_sorted_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Noop("zeta"));
        registry.register(Noop("alpha"));
        registry.register(Upper);
        let names: Vec<String> = registry.specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["alpha", "upper", "zeta"]);
    }
}
