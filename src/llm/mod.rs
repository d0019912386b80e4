//! LLM 层：客户端抽象、文本协议、能力调用方式与实现（OpenAI 兼容 / Mock / 重试装饰）

pub mod capability;
pub mod mock;
pub mod openai;
pub mod protocol;
pub mod retry;
pub mod traits;

pub use capability::{bind_tools, invoke_structured, invoke_text, ToolBoundLlm};
pub use mock::{MockCall, MockLlmClient, MockMode};
pub use openai::{create_deepseek_client, OpenAiClient, TokenUsage, DEEPSEEK_BASE_URL, DEEPSEEK_CHAT};
pub use retry::{RetryConfig, RetryingLlmClient};
pub use traits::{LlmClient, OutputSchema};
