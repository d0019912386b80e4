//! 结构化结果：问答 / 摘要 / 计算三种形态
//!
//! 每轮只填充其中一种（由实际运行的处理器决定）。来源 ID 一律用集合表示，天然去重。
//! backfill 只填补模型留空的字段，模型给出的非空值永远优先。

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::handlers::extract::Extraction;

/// 问答结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnswerResponse {
    /// 用户提出的问题
    pub question: String,
    /// 基于检索证据的回答
    pub answer: String,
    /// 引用的文档 ID
    #[serde(default)]
    pub sources: BTreeSet<String>,
    /// 置信度，0.0 ~ 1.0
    #[serde(default)]
    pub confidence: f64,
}

/// 摘要结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SummarizationResponse {
    /// 摘要正文
    pub summary: String,
    /// 要点列表
    #[serde(default)]
    pub key_points: Vec<String>,
    /// 被摘要的文档 ID
    #[serde(default)]
    pub document_ids: BTreeSet<String>,
    /// 原文长度（字符数），0 表示未知
    #[serde(default)]
    pub original_length: usize,
}

/// 计算结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalculationResponse {
    /// 实际求值的表达式
    #[serde(default)]
    pub expression: String,
    /// 数值结果，0 表示未填
    #[serde(default)]
    pub result: f64,
    /// 分步说明
    pub explanation: String,
    /// 取数所依据的文档 ID
    #[serde(default)]
    pub sources: BTreeSet<String>,
}

/// 单轮的结构化结果（三选一）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuredResult {
    Answer(AnswerResponse),
    Summary(SummarizationResponse),
    Calculation(CalculationResponse),
}

impl StructuredResult {
    /// 用确定性提取结果填补模型留空的字段
    pub fn backfill(&mut self, extraction: &Extraction) {
        let recovered = extraction.document_id_set();
        match self {
            StructuredResult::Answer(r) => {
                if r.sources.is_empty() {
                    r.sources = recovered;
                }
            }
            StructuredResult::Summary(r) => {
                if r.document_ids.is_empty() {
                    r.document_ids = recovered;
                }
                if r.original_length == 0 {
                    r.original_length = extraction.content_length;
                }
            }
            StructuredResult::Calculation(r) => {
                if r.sources.is_empty() {
                    r.sources = recovered;
                }
                if r.expression.trim().is_empty() {
                    if let Some(expr) = &extraction.expression {
                        r.expression = expr.clone();
                    }
                }
                if r.result == 0.0 {
                    if let Some(value) = extraction.result {
                        r.result = value;
                    }
                }
            }
        }
    }

    /// 润色后的文本替换主文本字段（answer / summary / explanation），其余字段不变
    pub fn apply_polish(&mut self, polished: String) {
        match self {
            StructuredResult::Answer(r) => r.answer = polished,
            StructuredResult::Summary(r) => r.summary = polished,
            StructuredResult::Calculation(r) => r.explanation = polished,
        }
    }

    /// 主文本：按 answer → summary → explanation 顺序取第一个非空
    pub fn primary_text(&self) -> Option<&str> {
        let text = match self {
            StructuredResult::Answer(r) => r.answer.as_str(),
            StructuredResult::Summary(r) => r.summary.as_str(),
            StructuredResult::Calculation(r) => r.explanation.as_str(),
        };
        (!text.trim().is_empty()).then_some(text)
    }

    /// 本轮引用或恢复出的文档 ID
    pub fn recovered_ids(&self) -> &BTreeSet<String> {
        match self {
            StructuredResult::Answer(r) => &r.sources,
            StructuredResult::Summary(r) => &r.document_ids,
            StructuredResult::Calculation(r) => &r.sources,
        }
    }

    pub fn as_answer(&self) -> Option<&AnswerResponse> {
        match self {
            StructuredResult::Answer(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_summary(&self) -> Option<&SummarizationResponse> {
        match self {
            StructuredResult::Summary(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_calculation(&self) -> Option<&CalculationResponse> {
        match self {
            StructuredResult::Calculation(r) => Some(r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn extraction() -> Extraction {
        Extraction {
            document_ids: vec!["doc-1".into(), "doc-2".into(), "doc-1".into()],
            content_length: 120,
            expression: Some("0.15*200+10".into()),
            result: Some(40.0),
        }
    }

    #[test]
    fn test_backfill_fills_empty_sources() {
        let mut r = StructuredResult::Answer(AnswerResponse {
            question: "q".into(),
            answer: "a".into(),
            sources: BTreeSet::new(),
            confidence: 0.9,
        });
        r.backfill(&extraction());
        assert_eq!(r.recovered_ids(), &ids(&["doc-1", "doc-2"]));
    }

    #[test]
    fn test_backfill_never_overwrites_model_values() {
        let mut r = StructuredResult::Calculation(CalculationResponse {
            expression: "200*0.15+10".into(),
            result: 40.0,
            explanation: "e".into(),
            sources: ids(&["doc-9"]),
        });
        let before = r.clone();
        let mut ex = extraction();
        ex.result = Some(41.0);
        ex.expression = Some("other".into());
        r.backfill(&ex);
        assert_eq!(r, before);
    }

    #[test]
    fn test_backfill_keeps_model_answer_sources() {
        let mut r = StructuredResult::Answer(AnswerResponse {
            question: "q".into(),
            answer: "a".into(),
            sources: ids(&["doc-9"]),
            confidence: 0.8,
        });
        r.backfill(&extraction());
        assert_eq!(r.recovered_ids(), &ids(&["doc-9"]));
    }

    #[test]
    fn test_backfill_keeps_model_summary_fields() {
        let mut r = StructuredResult::Summary(SummarizationResponse {
            summary: "s".into(),
            key_points: vec!["k".into()],
            document_ids: ids(&["doc-9"]),
            original_length: 7,
        });
        let before = r.clone();
        r.backfill(&extraction());
        assert_eq!(r, before);
    }

    #[test]
    fn test_backfill_summary_length_only_when_zero() {
        let mut r = StructuredResult::Summary(SummarizationResponse {
            summary: "s".into(),
            key_points: vec![],
            document_ids: BTreeSet::new(),
            original_length: 0,
        });
        r.backfill(&extraction());
        let s = r.as_summary().unwrap();
        assert_eq!(s.original_length, 120);
        assert_eq!(s.document_ids, ids(&["doc-1", "doc-2"]));
    }

    #[test]
    fn test_backfill_calculation_zero_sentinel() {
        let mut r = StructuredResult::Calculation(CalculationResponse {
            expression: String::new(),
            result: 0.0,
            explanation: "e".into(),
            sources: BTreeSet::new(),
        });
        r.backfill(&extraction());
        let c = r.as_calculation().unwrap();
        assert_eq!(c.result, 40.0);
        assert_eq!(c.expression, "0.15*200+10");
    }

    #[test]
    fn test_apply_polish_replaces_primary_field_only() {
        let mut r = StructuredResult::Answer(AnswerResponse {
            question: "q".into(),
            answer: "raw".into(),
            sources: ids(&["doc-1"]),
            confidence: 0.5,
        });
        r.apply_polish("Polished.".into());
        let a = r.as_answer().unwrap();
        assert_eq!(a.answer, "Polished.");
        assert_eq!(a.sources, ids(&["doc-1"]));
        assert_eq!(a.confidence, 0.5);
        assert_eq!(r.primary_text(), Some("Polished."));
    }

    #[test]
    fn test_primary_text_empty_is_none() {
        let r = StructuredResult::Summary(SummarizationResponse {
            summary: "  ".into(),
            key_points: vec![],
            document_ids: BTreeSet::new(),
            original_length: 0,
        });
        assert_eq!(r.primary_text(), None);
    }

    #[test]
    fn test_serde_tagging() {
        let r = StructuredResult::Calculation(CalculationResponse {
            expression: "1+1".into(),
            result: 2.0,
            explanation: "two".into(),
            sources: BTreeSet::new(),
        });
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["kind"], "calculation");
        let back: StructuredResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }
}
