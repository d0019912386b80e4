//! 工具输出的确定性信号提取
//!
//! - 文档 ID：形如 `ID: <token>`，token 由字母数字、下划线与连字符组成
//! - 计算结果：`result` 之后最近的 `is`，紧跟的数字（允许负号与千分位逗号）
//!
//! 未命中不是错误，只是让对应的 backfill 成为空操作。

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

static DOCUMENT_ID_RE: OnceLock<Regex> = OnceLock::new();
static CALC_RESULT_RE: OnceLock<Regex> = OnceLock::new();

fn document_id_re() -> &'static Regex {
    DOCUMENT_ID_RE.get_or_init(|| Regex::new(r"ID: ([\w-]+)").expect("valid document id regex"))
}

fn calc_result_re() -> &'static Regex {
    CALC_RESULT_RE.get_or_init(|| Regex::new(r"result.*?is\s*(-?[\d.,]+)").expect("valid result regex"))
}

/// 提取全部 `ID: <token>`，按出现顺序返回（可能重复）
pub fn extract_document_ids(text: &str) -> Vec<String> {
    document_id_re()
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// 提取 "result ... is N" 中的 N；数字无法解析时视为未命中
pub fn extract_calculation_result(text: &str) -> Option<f64> {
    let caps = calc_result_re().captures(text)?;
    caps.get(1)?.as_str().replace(',', "").parse().ok()
}

/// 单次处理器运行中从工具输出累积的信号
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub document_ids: Vec<String>,
    /// 已见工具输出的总字符数
    pub content_length: usize,
    pub expression: Option<String>,
    pub result: Option<f64>,
}

impl Extraction {
    pub fn document_id_set(&self) -> BTreeSet<String> {
        self.document_ids.iter().cloned().collect()
    }
}
