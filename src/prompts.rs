//! 提示词模板
//!
//! 内置默认模板；若配置了 prompts 目录，同名 .txt 文件会覆盖对应模板（与 config/prompts 的加载方式一致）。
//! 模板占位符形如 `{name}`，由 render 做简单替换。

use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};

/// 对话模板：system 段 + human 段
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTemplate {
    pub system: String,
    pub human: String,
}

/// 全部模板
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSet {
    pub intent_system: String,
    pub qa: ChatTemplate,
    pub summarization: ChatTemplate,
    pub calculation: ChatTemplate,
    pub polish_qa: String,
    pub polish_summarization: String,
    pub polish_calculation: String,
}

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

/// 替换模板中的 `{key}` 占位符；只扫描模板一遍，代入的值不会再被展开，未知占位符原样保留
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let re = PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("valid placeholder regex"));
    re.replace_all(template, |caps: &Captures| {
        let key = &caps[1];
        vars.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

const INTENT_SYSTEM: &str = "You are an intent classifier for a document assistant. \
Classify the user's latest message into exactly one intent_type:
- qa: the user asks a question that should be answered from documents or general knowledge
- summarization: the user wants documents or content summarized
- calculation: the user wants a numeric computation, possibly over values found in documents
Also give a confidence between 0 and 1 and a one-sentence reasoning.";

const QA_SYSTEM: &str = "You are a helpful document assistant answering questions.
Use the document_search and document_reader tools to find evidence, and cite document IDs.

Conversation summary:
{conversation_summary}";

const SUMMARIZATION_SYSTEM: &str = "You are a document assistant that writes concise summaries.
Use document_search to find the relevant documents and document_reader to read them.
Capture the key points and note which document IDs you summarized.

Conversation summary:
{conversation_summary}";

const CALCULATION_SYSTEM: &str = "You are a document assistant that performs calculations.
Find any numbers you need with document_search / document_reader, then ALWAYS use the calculator tool \
for the arithmetic. Explain the calculation step by step.

Conversation summary:
{conversation_summary}";

const HUMAN: &str = "{user_input}";

const POLISH_QA: &str = "Rewrite the answer below as a clear, friendly reply to the user's question. \
Keep every fact, mention the sources when there are any, and do not invent information.

Question: {question}
Answer: {answer}
Sources: {sources}
Confidence: {confidence}";

const POLISH_SUMMARIZATION: &str = "Rewrite the summary below as fluent prose for the user. \
Keep it concise and faithful to the key points.

Documents: {documents}
Key points: {key_points}
Summary: {summary}";

const POLISH_CALCULATION: &str = "Explain the calculation below to the user in a few clear sentences. \
State the final result exactly as given.

Expression: {expression}
Result: {result}
Explanation: {explanation}
Sources: {sources}";

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            intent_system: INTENT_SYSTEM.to_string(),
            qa: ChatTemplate {
                system: QA_SYSTEM.to_string(),
                human: HUMAN.to_string(),
            },
            summarization: ChatTemplate {
                system: SUMMARIZATION_SYSTEM.to_string(),
                human: HUMAN.to_string(),
            },
            calculation: ChatTemplate {
                system: CALCULATION_SYSTEM.to_string(),
                human: HUMAN.to_string(),
            },
            polish_qa: POLISH_QA.to_string(),
            polish_summarization: POLISH_SUMMARIZATION.to_string(),
            polish_calculation: POLISH_CALCULATION.to_string(),
        }
    }
}

impl PromptSet {
    /// 从目录加载覆盖：intent.txt、qa_system.txt、qa_human.txt、summarization_system.txt、
    /// summarization_human.txt、calculation_system.txt、calculation_human.txt、polish_qa.txt、
    /// polish_summarization.txt、polish_calculation.txt；缺失的文件保留默认值
    pub fn load(dir: Option<&Path>) -> Self {
        let mut set = Self::default();
        let Some(dir) = dir else {
            return set;
        };
        let overrides: [(&str, &mut String); 10] = [
            ("intent.txt", &mut set.intent_system),
            ("qa_system.txt", &mut set.qa.system),
            ("qa_human.txt", &mut set.qa.human),
            ("summarization_system.txt", &mut set.summarization.system),
            ("summarization_human.txt", &mut set.summarization.human),
            ("calculation_system.txt", &mut set.calculation.system),
            ("calculation_human.txt", &mut set.calculation.human),
            ("polish_qa.txt", &mut set.polish_qa),
            ("polish_summarization.txt", &mut set.polish_summarization),
            ("polish_calculation.txt", &mut set.polish_calculation),
        ];
        for (file, slot) in overrides {
            let path = dir.join(file);
            match std::fs::read_to_string(&path) {
                Ok(text) if !text.trim().is_empty() => {
                    tracing::debug!(path = %path.display(), "prompt override loaded");
                    *slot = text;
                }
                _ => {}
            }
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_all_occurrences() {
        let out = render("{a} and {a} but {b}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x and x but y");
        assert_eq!(render("{missing}", &[]), "{missing}");
    }

    #[test]
    fn test_render_does_not_expand_substituted_values() {
        let out = render(
            POLISH_QA,
            &[
                ("question", "q"),
                ("answer", "use {confidence} here"),
                ("sources", "none"),
                ("confidence", "0.9"),
            ],
        );
        assert!(out.contains("Answer: use {confidence} here"));
        assert!(out.contains("Confidence: 0.9"));
    }

    #[test]
    fn test_load_overrides_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("polish_qa.txt"), "Polish: {answer}").unwrap();
        std::fs::write(dir.path().join("qa_human.txt"), "   ").unwrap();

        let set = PromptSet::load(Some(dir.path()));
        assert_eq!(set.polish_qa, "Polish: {answer}");
        assert_eq!(set.qa.human, HUMAN);
        assert_eq!(set.qa.system, QA_SYSTEM);
    }

    #[test]
    fn test_load_without_dir_is_default() {
        assert_eq!(PromptSet::load(None), PromptSet::default());
    }
}
