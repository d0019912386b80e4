//! 三种任务处理器的能力集
//!
//! 问答、摘要、计算共享同一个工具循环，只在以下几处不同：
//! 模板、结果 schema、缺省参数策略、工具输出的信号提取、润色模板。
//! 这里用带标签的枚举表达这些差异，工具循环按 TaskKind 分派。

use serde_json::{Map, Value};

use crate::core::AgentError;
use crate::handlers::extract::{extract_calculation_result, extract_document_ids, Extraction};
use crate::handlers::response::{
    AnswerResponse, CalculationResponse, StructuredResult, SummarizationResponse,
};
use crate::llm::{invoke_structured, LlmClient};
use crate::memory::Message;
use crate::prompts::{render, ChatTemplate, PromptSet};
use crate::tools::{CALCULATOR, DOCUMENT_READER, DOCUMENT_SEARCH};
use crate::workflow::Step;

/// 计算处理器在缺少检索词时使用的通用短语
pub const CALCULATION_FALLBACK_QUERY: &str = "total amount sum calculate";

/// 摘要处理器缺省检索词取用户输入的前几个词
const SUMMARIZATION_QUERY_WORDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Qa,
    Summarization,
    Calculation,
}

impl TaskKind {
    /// 处理器状态 → 任务类型；非处理器状态返回 None
    pub fn from_step(step: Step) -> Option<Self> {
        match step {
            Step::QaAgent => Some(TaskKind::Qa),
            Step::SummarizationAgent => Some(TaskKind::Summarization),
            Step::CalculationAgent => Some(TaskKind::Calculation),
            _ => None,
        }
    }

    pub fn step(self) -> Step {
        match self {
            TaskKind::Qa => Step::QaAgent,
            TaskKind::Summarization => Step::SummarizationAgent,
            TaskKind::Calculation => Step::CalculationAgent,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Qa => "qa",
            TaskKind::Summarization => "summarization",
            TaskKind::Calculation => "calculation",
        }
    }

    pub fn chat_template(self, prompts: &PromptSet) -> &ChatTemplate {
        match self {
            TaskKind::Qa => &prompts.qa,
            TaskKind::Summarization => &prompts.summarization,
            TaskKind::Calculation => &prompts.calculation,
        }
    }

    /// 为缺少检索词的 document_search 调用补上 query；其它工具与已有 query 不动
    pub fn fill_default_args(self, tool_name: &str, args: &mut Map<String, Value>, user_input: &str) {
        if tool_name != DOCUMENT_SEARCH {
            return;
        }
        let has_query = args
            .get("query")
            .and_then(Value::as_str)
            .is_some_and(|q| !q.trim().is_empty());
        if has_query {
            return;
        }
        let query = match self {
            TaskKind::Qa => user_input.to_string(),
            TaskKind::Summarization => user_input
                .split_whitespace()
                .take(SUMMARIZATION_QUERY_WORDS)
                .collect::<Vec<_>>()
                .join(" "),
            TaskKind::Calculation => CALCULATION_FALLBACK_QUERY.to_string(),
        };
        tracing::debug!(kind = self.as_str(), %query, "filled missing search query");
        args.insert("query".to_string(), Value::String(query));
    }

    /// 记录调用参数本身携带的信号（与工具是否成功无关）
    pub fn note_call(self, tool_name: &str, args: &Value, extraction: &mut Extraction) {
        if self != TaskKind::Calculation {
            return;
        }
        match tool_name {
            DOCUMENT_READER => {
                if let Some(doc_id) = args.get("doc_id").and_then(Value::as_str) {
                    extraction.document_ids.push(doc_id.to_string());
                }
            }
            CALCULATOR => {
                if let Some(expr) = args.get("expression").and_then(Value::as_str) {
                    extraction.expression = Some(expr.to_string());
                }
            }
            _ => {}
        }
    }

    /// 从一次成功的工具输出中累积信号
    pub fn observe(self, tool_name: &str, output: &str, extraction: &mut Extraction) {
        match self {
            TaskKind::Qa => {
                extraction.document_ids.extend(extract_document_ids(output));
            }
            TaskKind::Summarization => {
                extraction.document_ids.extend(extract_document_ids(output));
                extraction.content_length += output.chars().count();
            }
            TaskKind::Calculation => match tool_name {
                DOCUMENT_SEARCH => {
                    extraction.document_ids.extend(extract_document_ids(output));
                }
                CALCULATOR => {
                    if let Some(value) = extract_calculation_result(output) {
                        extraction.result = Some(value);
                    }
                }
                _ => {}
            },
        }
    }

    /// 按本任务的 schema 请求结构化结果
    pub async fn invoke_structured(
        self,
        llm: &dyn LlmClient,
        messages: &[Message],
    ) -> Result<StructuredResult, AgentError> {
        Ok(match self {
            TaskKind::Qa => StructuredResult::Answer(invoke_structured::<AnswerResponse>(llm, messages).await?),
            TaskKind::Summarization => {
                StructuredResult::Summary(invoke_structured::<SummarizationResponse>(llm, messages).await?)
            }
            TaskKind::Calculation => {
                StructuredResult::Calculation(invoke_structured::<CalculationResponse>(llm, messages).await?)
            }
        })
    }

    /// 用（已回填的）结构化字段渲染润色提示
    pub fn polish_prompt(self, result: &StructuredResult, prompts: &PromptSet) -> String {
        match result {
            StructuredResult::Answer(r) => {
                let sources = join_or_none(r.sources.iter());
                let confidence = format!("{:.2}", r.confidence);
                render(
                    &prompts.polish_qa,
                    &[
                        ("question", r.question.as_str()),
                        ("answer", r.answer.as_str()),
                        ("sources", sources.as_str()),
                        ("confidence", confidence.as_str()),
                    ],
                )
            }
            StructuredResult::Summary(r) => {
                let documents = join_or_none(r.document_ids.iter());
                let key_points = bullet_list(&r.key_points);
                render(
                    &prompts.polish_summarization,
                    &[
                        ("documents", documents.as_str()),
                        ("key_points", key_points.as_str()),
                        ("summary", r.summary.as_str()),
                    ],
                )
            }
            StructuredResult::Calculation(r) => {
                let value = r.result.to_string();
                let sources = join_or_none(r.sources.iter());
                render(
                    &prompts.polish_calculation,
                    &[
                        ("expression", r.expression.as_str()),
                        ("result", value.as_str()),
                        ("explanation", r.explanation.as_str()),
                        ("sources", sources.as_str()),
                    ],
                )
            }
        }
    }
}

fn join_or_none<'a>(items: impl Iterator<Item = &'a String>) -> String {
    let joined = items.map(String::as_str).collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "none".to_string()
    } else {
        joined
    }
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "none".to_string();
    }
    items.iter().map(|p| format!("- {p}")).collect::<Vec<_>>().join("\n")
}
