//! 调用方层的重试装饰器
//!
//! 核心工作流本身不重试；RetryingLlmClient 包在任意 LlmClient 外层，对传输失败做指数退避重试。
//! 结构化输出的 schema 不符发生在反序列化阶段，不会被这里重试。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::{LlmClient, OutputSchema};
use crate::memory::Message;
use crate::tools::ToolSpec;

/// 重试参数：最多重试 max_retries 次，第 n 次等待 base_delay * 2^n
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryConfig {
    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// 带重试的 LLM 客户端
pub struct RetryingLlmClient {
    inner: Arc<dyn LlmClient>,
    config: RetryConfig,
}

impl RetryingLlmClient {
    pub fn new(inner: Arc<dyn LlmClient>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    async fn with_retry<T, F, Fut>(&self, op: &str, mut call: F) -> Result<T, String>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, String>> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.config.max_retries => {
                    let delay = self.config.delay_for(attempt);
                    tracing::warn!(op, attempt = attempt + 1, error = %e, ?delay, "LLM call failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl LlmClient for RetryingLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        self.with_retry("complete", || self.inner.complete(messages)).await
    }

    async fn complete_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, String> {
        self.with_retry("complete_with_tools", || {
            self.inner.complete_with_tools(messages, tools)
        })
        .await
    }

    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &OutputSchema,
    ) -> Result<Value, String> {
        self.with_retry("complete_structured", || {
            self.inner.complete_structured(messages, schema)
        })
        .await
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.inner.token_usage()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// 前 failures 次调用失败，之后成功
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmClient for Flaky {
        async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err("connection reset".to_string())
            } else {
                Ok("ok".to_string())
            }
        }
    }

    fn config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let inner = Arc::new(Flaky {
            failures: 2,
            calls: AtomicU32::new(0),
        });
        let client = RetryingLlmClient::new(inner.clone(), config(2));
        assert_eq!(client.complete(&[]).await.unwrap(), "ok");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let inner = Arc::new(Flaky {
            failures: 5,
            calls: AtomicU32::new(0),
        });
        let client = RetryingLlmClient::new(inner.clone(), config(1));
        assert!(client.complete(&[]).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_backoff_doubles() {
        let c = RetryConfig {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(c.delay_for(0), Duration::from_millis(100));
        assert_eq!(c.delay_for(2), Duration::from_millis(400));
    }
}
