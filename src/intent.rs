//! 意图识别
//!
//! 把最新用户输入（连同最近几条历史消息）交给 LLM 结构化输出，得到 UserIntent；
//! 再通过固定映射表得到下一步路由键，无法识别的判别值一律落到 qa_agent。

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::llm::{invoke_structured, LlmClient};
use crate::memory::{trailing_messages, Message};
use crate::workflow::Step;

/// 闭合的意图集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Qa,
    Summarization,
    Calculation,
}

impl IntentKind {
    /// 解析判别值（忽略大小写与首尾空白）；集合外的值返回 None
    pub fn from_discriminant(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "qa" => Some(IntentKind::Qa),
            "summarization" => Some(IntentKind::Summarization),
            "calculation" => Some(IntentKind::Calculation),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntentKind::Qa => "qa",
            IntentKind::Summarization => "summarization",
            IntentKind::Calculation => "calculation",
        }
    }

    /// 对应的处理器状态
    pub fn handler_step(self) -> Step {
        match self {
            IntentKind::Qa => Step::QaAgent,
            IntentKind::Summarization => Step::SummarizationAgent,
            IntentKind::Calculation => Step::CalculationAgent,
        }
    }
}

/// 分类器输出：路由只看 intent_type，其余字段原样保留
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UserIntent {
    /// 意图类型：qa / summarization / calculation；缺省为空串，按无法识别处理
    #[serde(default)]
    pub intent_type: String,
    /// 分类置信度，0.0 ~ 1.0
    #[serde(default)]
    pub confidence: f64,
    /// 分类理由（一句话）
    #[serde(default)]
    pub reasoning: String,
}

impl UserIntent {
    pub fn kind(&self) -> Option<IntentKind> {
        IntentKind::from_discriminant(&self.intent_type)
    }

    /// 下一步路由：无法识别时默认 qa_agent
    pub fn next_step(&self) -> Step {
        route_for_intent(&self.intent_type)
    }
}

/// 意图判别值 → 处理器状态（集合外一律 qa_agent）
pub fn route_for_intent(intent_type: &str) -> Step {
    IntentKind::from_discriminant(intent_type)
        .map(IntentKind::handler_step)
        .unwrap_or(Step::QaAgent)
}

/// 意图识别器
pub struct IntentClassifier {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
    /// 拼入上下文的历史消息条数
    history_window: usize,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>, history_window: usize) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
            history_window,
        }
    }

    /// 识别用户意图；LLM 输出不是可解析的 JSON 对象时返回 ClassificationFailed
    pub async fn classify(&self, history: &[Message], user_input: &str) -> Result<UserIntent, AgentError> {
        let mut messages = vec![Message::system(self.system_prompt.clone())];
        messages.extend_from_slice(trailing_messages(history, self.history_window));
        messages.push(Message::user(user_input));

        let intent: UserIntent = invoke_structured(self.llm.as_ref(), &messages)
            .await
            .map_err(|e| AgentError::ClassificationFailed(e.to_string()))?;
        tracing::info!(
            intent = %intent.intent_type,
            confidence = intent.confidence,
            "intent classified"
        );
        Ok(intent)
    }
}
