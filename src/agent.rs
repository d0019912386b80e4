//! 无头运行时
//!
//! 供 REPL 或其它前端调用：create_agent_components 从配置构建 LLM、文档工具、提示词与路由工作流，
//! process_message 对单条用户输入跑完整一轮并返回最终回复文本。
//! 工作流只读取会话摘要，不会更新它；这里作为调用方在每轮成功后用 refresh_summary 维护滚动摘要。

use std::path::Path;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::AgentError;
use crate::intent::IntentKind;
use crate::llm::{
    create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient, RetryingLlmClient, DEEPSEEK_CHAT,
};
use crate::memory::{ConversationState, MemoryConsolidator, StatePersistence};
use crate::prompts::PromptSet;
use crate::tools::{
    CalculatorTool, DocumentReaderTool, DocumentSearchTool, DocumentStore, ToolExecutor, ToolRegistry,
};
use crate::workflow::{ConsolidationMode, TurnWorkflow, TurnWorkflowBuilder};

/// 滚动摘要保留的最近回合数
const SUMMARY_TURNS: usize = 3;
/// 摘要中单段文本的最大字符数
const SUMMARY_SNIPPET_CHARS: usize = 160;

/// 预构建的组件，可多会话共享
pub struct AgentComponents {
    pub workflow: TurnWorkflow,
    /// 外部整合模式下由调用方使用
    pub consolidator: MemoryConsolidator,
    pub persistence: Option<StatePersistence>,
    pub user_id: String,
}

/// 根据配置与环境变量选择 LLM 后端，并包上调用方层的重试
///
/// - provider = mock，或没有任何 API Key：Mock（回显）
/// - 有 DEEPSEEK_API_KEY，或 provider = deepseek 且仅有 OPENAI_API_KEY：DeepSeek 兼容端点
/// - 其余有 OPENAI_API_KEY 的情况：OpenAI（可配置 base_url）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let deepseek_key = std::env::var("DEEPSEEK_API_KEY").ok();
    let openai_key = std::env::var("OPENAI_API_KEY").ok();

    let model = Some(cfg.llm.model.trim()).filter(|m| !m.is_empty());
    let base_url = cfg.llm.base_url.as_deref().filter(|u| !u.trim().is_empty());

    let inner: Arc<dyn LlmClient> = if provider == "mock" {
        tracing::info!("Using Mock LLM");
        Arc::new(MockLlmClient::new())
    } else if deepseek_key.is_some() || (provider == "deepseek" && openai_key.is_some()) {
        let client = create_deepseek_client(model, base_url).with_request_timeout(cfg.llm.timeouts.request);
        tracing::info!("Using DeepSeek LLM ({})", model.unwrap_or(DEEPSEEK_CHAT));
        Arc::new(client)
    } else if openai_key.is_some() {
        let model = model.filter(|_| provider == "openai").unwrap_or("gpt-4o-mini");
        tracing::info!("Using OpenAI LLM ({})", model);
        Arc::new(
            OpenAiClient::new(base_url, model, openai_key.as_deref())
                .with_request_timeout(cfg.llm.timeouts.request),
        )
    } else {
        tracing::warn!("No API key set or provider unknown, using Mock LLM");
        Arc::new(MockLlmClient::new())
    };

    let retry = cfg.llm.retry.to_retry_config();
    if retry.max_retries == 0 {
        inner
    } else {
        Arc::new(RetryingLlmClient::new(inner, retry))
    }
}

/// 文档集合：配置了 documents_path 且可读时加载，否则为空集合
pub fn load_document_store(path: Option<&Path>) -> DocumentStore {
    let Some(path) = path else {
        return DocumentStore::new(Vec::new());
    };
    match DocumentStore::from_json_file(path) {
        Ok(store) => {
            tracing::info!(path = %path.display(), documents = store.len(), "document store loaded");
            store
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "document store unavailable, starting empty");
            DocumentStore::new(Vec::new())
        }
    }
}

/// 注册 document_search、document_reader、calculator
pub fn build_tool_registry(store: Arc<DocumentStore>, search_max_results: usize) -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(DocumentSearchTool::new(store.clone(), search_max_results));
    tools.register(DocumentReaderTool::new(store));
    tools.register(CalculatorTool);
    tools
}

/// 从配置创建全部组件
pub fn create_agent_components(cfg: &AppConfig) -> Result<AgentComponents, AgentError> {
    let llm = create_llm_from_config(cfg);
    let store = Arc::new(load_document_store(cfg.tools.documents_path.as_deref()));
    let registry = build_tool_registry(store, cfg.tools.search_max_results);
    let executor = Arc::new(ToolExecutor::new(registry, cfg.tools.tool_timeout_secs));
    let prompts = Arc::new(PromptSet::load(cfg.prompts.dir.as_deref()));

    let workflow = TurnWorkflowBuilder::new()
        .llm(llm)
        .executor(executor)
        .prompts(prompts)
        .history_window(cfg.app.history_window)
        .consolidation(cfg.app.consolidation)
        .build()?;

    Ok(AgentComponents {
        workflow,
        consolidator: MemoryConsolidator::new(),
        persistence: cfg.app.state_path.as_ref().map(StatePersistence::new),
        user_id: cfg.app.user_id.clone(),
    })
}

/// 恢复上次的会话；没有持久化或读取失败时新建
pub fn new_session(components: &AgentComponents) -> ConversationState {
    if let Some(persistence) = &components.persistence {
        match persistence.load() {
            Ok(Some(state)) => {
                tracing::info!(session_id = %state.session_id, turns = state.history.len(), "session restored");
                return state;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "failed to restore session, starting fresh"),
        }
    }
    ConversationState::for_user(components.user_id.clone())
}

/// 处理单条用户消息：成功时提交状态（外部整合模式下在此整合）并持久化，返回最终回复文本
pub async fn process_message(
    components: &AgentComponents,
    state: &mut ConversationState,
    user_input: &str,
) -> Result<String, AgentError> {
    let mut outcome = components.workflow.run_turn(user_input, state).await?;
    if components.workflow.consolidation_mode() == ConsolidationMode::External {
        components.consolidator.consolidate(&mut outcome.state, &outcome.turn)?;
    }
    *state = outcome.state;
    refresh_summary(state);

    if let Some(persistence) = &components.persistence {
        if let Err(e) = persistence.save(state) {
            tracing::warn!(error = %e, "failed to persist session state");
        }
    }

    Ok(outcome
        .turn
        .response
        .as_ref()
        .and_then(|r| r.primary_text())
        .unwrap_or_default()
        .to_string())
}

/// 用最近几轮（意图、用户输入、回复）与活跃文档重建滚动摘要；没有历史时清空，提示词回落到默认占位
pub fn refresh_summary(state: &mut ConversationState) {
    let start = state.history.len().saturating_sub(SUMMARY_TURNS);
    let mut lines: Vec<String> = state.history[start..]
        .iter()
        .map(|turn| {
            let intent = turn
                .intent
                .as_ref()
                .and_then(|i| i.kind())
                .unwrap_or(IntentKind::Qa)
                .as_str();
            let reply = turn
                .response
                .as_ref()
                .and_then(|r| r.primary_text())
                .unwrap_or("(no response)");
            format!(
                "- [{intent}] User: {} / Assistant: {}",
                snippet(&turn.user_input),
                snippet(reply)
            )
        })
        .collect();
    if !lines.is_empty() && !state.active_documents.is_empty() {
        let docs: Vec<&str> = state.active_documents.iter().map(String::as_str).collect();
        lines.push(format!("Active documents: {}", docs.join(", ")));
    }
    state.summary = lines.join("\n");
}

fn snippet(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() > SUMMARY_SNIPPET_CHARS {
        format!("{}...", text.chars().take(SUMMARY_SNIPPET_CHARS).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::{MockLlmClient, MockMode};
    use crate::memory::ConversationTurn;

    #[test]
    fn test_missing_document_file_gives_empty_store() {
        let store = load_document_store(Some(Path::new("/nonexistent/documents.json")));
        assert!(store.is_empty());
    }

    #[test]
    fn test_registry_has_three_tools() {
        let registry = build_tool_registry(Arc::new(DocumentStore::new(Vec::new())), 5);
        assert_eq!(
            registry.tool_names(),
            vec!["calculator", "document_reader", "document_search"]
        );
    }

    fn scripted_components(llm: Arc<MockLlmClient>) -> AgentComponents {
        let registry = build_tool_registry(Arc::new(DocumentStore::new(Vec::new())), 5);
        let workflow = TurnWorkflowBuilder::new()
            .llm(llm)
            .executor(Arc::new(ToolExecutor::new(registry, 5)))
            .build()
            .unwrap();
        AgentComponents {
            workflow,
            consolidator: MemoryConsolidator::new(),
            persistence: None,
            user_id: "u1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_process_message_maintains_summary() {
        let llm = Arc::new(
            MockLlmClient::new()
                .with_structured(json!({"intent_type": "qa"}))
                .with_structured(json!({"question": "q1", "answer": "a1", "sources": ["doc-42"]}))
                .with_text("Paris is the capital.")
                .with_structured(json!({"intent_type": "qa"}))
                .with_structured(json!({"question": "q2", "answer": "a2"}))
                .with_text("About two million people."),
        );
        let components = scripted_components(llm.clone());
        let mut state = new_session(&components);

        let reply = process_message(&components, &mut state, "What is the capital of France?")
            .await
            .unwrap();
        assert_eq!(reply, "Paris is the capital.");
        assert_eq!(
            state.summary,
            "- [qa] User: What is the capital of France? / Assistant: Paris is the capital.\nActive documents: doc-42"
        );

        process_message(&components, &mut state, "How many people live there?")
            .await
            .unwrap();
        // 第二轮处理器的 system 提示词带上了第一轮的摘要
        let handler_calls: Vec<_> = llm
            .calls()
            .into_iter()
            .filter(|c| matches!(c.mode, MockMode::Tools(_)))
            .collect();
        assert_eq!(handler_calls.len(), 2);
        assert!(handler_calls[0].messages[0].content.contains("No previous conversation."));
        assert!(handler_calls[1].messages[0]
            .content
            .contains("User: What is the capital of France?"));
    }

    #[test]
    fn test_refresh_summary_keeps_recent_turns() {
        let mut state = ConversationState::new("s1", "u1");
        refresh_summary(&mut state);
        assert_eq!(state.summary, "");

        for i in 0..5 {
            state.history.push(ConversationTurn::draft(format!("question {i}")));
        }
        refresh_summary(&mut state);
        let lines: Vec<&str> = state.summary.lines().collect();
        assert_eq!(lines.len(), SUMMARY_TURNS);
        assert_eq!(lines[0], "- [qa] User: question 2 / Assistant: (no response)");

        assert!(snippet(&"x".repeat(500)).ends_with("..."));
    }

    #[tokio::test]
    async fn test_process_message_with_mock_provider() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".to_string();
        cfg.llm.retry.max_retries = 0;
        let components = create_agent_components(&cfg).unwrap();
        let mut state = new_session(&components);
        let before = state.clone();

        // 未脚本化的 Mock 无法给出结构化意图，回合失败且状态不变
        let err = process_message(&components, &mut state, "hello").await.unwrap_err();
        assert!(matches!(err, AgentError::ClassificationFailed(_)));
        assert_eq!(state, before);
    }
}
