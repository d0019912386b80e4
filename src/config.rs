//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HIVE__*` 覆盖（双下划线表示嵌套，如 `HIVE__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::llm::RetryConfig;
use crate::workflow::ConsolidationMode;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub tools: ToolsSection,
    pub prompts: PromptsSection,
}

/// [app] 段：应用名、用户、历史窗口、会话状态文件、整合模式
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    pub user_id: String,
    /// 拼入提示词的历史消息条数
    pub history_window: usize,
    /// 会话状态 JSON 文件；未设置时不持久化
    pub state_path: Option<PathBuf>,
    pub consolidation: ConsolidationMode,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            user_id: "local".to_string(),
            history_window: 4,
            state_path: None,
            consolidation: ConsolidationMode::Inline,
        }
    }
}

/// [llm] 段：后端选择、超时与重试
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：deepseek / openai / mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeouts: LlmTimeoutsSection,
    pub retry: LlmRetrySection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "deepseek".to_string(),
            model: "deepseek-chat".to_string(),
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
            retry: LlmRetrySection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次请求超时（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [llm.retry] 段：调用方层的重试，0 表示不重试
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmRetrySection {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for LlmRetrySection {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
        }
    }
}

impl LlmRetrySection {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            base_delay: std::time::Duration::from_millis(self.base_delay_ms),
        }
    }
}

/// [tools] 段：工具超时、文档集合、检索条数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    /// 文档集合 JSON 文件；未设置或不存在时文档集合为空
    pub documents_path: Option<PathBuf>,
    pub search_max_results: usize,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 30,
            documents_path: None,
            search_max_results: 5,
        }
    }
}

/// [prompts] 段：模板覆盖目录
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PromptsSection {
    pub dir: Option<PathBuf>,
}

/// 从 config 目录加载配置，环境变量 HIVE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HIVE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HIVE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
