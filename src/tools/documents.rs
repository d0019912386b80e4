//! 文档工具：document_search（关键词检索）与 document_reader（按 ID 读取全文）
//!
//! 文档集合从 JSON 文件加载到内存（DocumentStore）。检索结果每条以 `ID: <id>` 开头，
//! 处理器据此提取来源 ID。

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::Tool;

pub const DOCUMENT_SEARCH: &str = "document_search";
pub const DOCUMENT_READER: &str = "document_reader";

/// 检索结果预览最大字符数
const PREVIEW_CHARS: usize = 200;

/// 单篇文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub doc_type: String,
    pub content: String,
}

/// 内存文档库
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    documents: Vec<Document>,
}

impl DocumentStore {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// 从 JSON 文件加载（内容为 Document 数组）
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("read documents from {}", path.display()))?;
        let documents: Vec<Document> = serde_json::from_str(&data)
            .with_context(|| format!("parse documents in {}", path.display()))?;
        Ok(Self::new(documents))
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// 关键词检索：按命中词数打分（标题命中加倍），分数相同保持入库顺序
    pub fn search(&self, query: &str, limit: usize) -> Vec<&Document> {
        let terms: Vec<String> = query
            .split(|c: char| !c.is_alphanumeric() && c != '-')
            .filter(|t| t.chars().count() > 1)
            .map(|t| t.to_lowercase())
            .collect();
        if terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, &Document)> = self
            .documents
            .iter()
            .filter_map(|doc| {
                let title = doc.title.to_lowercase();
                let body = doc.content.to_lowercase();
                let score: usize = terms
                    .iter()
                    .map(|t| {
                        let mut s = 0;
                        if title.contains(t.as_str()) || doc.id.to_lowercase() == *t {
                            s += 2;
                        }
                        if body.contains(t.as_str()) {
                            s += 1;
                        }
                        s
                    })
                    .sum();
                (score > 0).then_some((score, doc))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(limit).map(|(_, d)| d).collect()
    }
}

fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        format!("{}...", content.chars().take(PREVIEW_CHARS).collect::<String>())
    } else {
        content.to_string()
    }
}

/// document_search：关键词检索文档库
pub struct DocumentSearchTool {
    store: Arc<DocumentStore>,
    max_results: usize,
}

impl DocumentSearchTool {
    pub fn new(store: Arc<DocumentStore>, max_results: usize) -> Self {
        Self {
            store,
            max_results: max_results.max(1),
        }
    }
}

#[async_trait]
impl Tool for DocumentSearchTool {
    fn name(&self) -> &str {
        DOCUMENT_SEARCH
    }

    fn description(&self) -> &str {
        "Search documents by keywords. Returns matching document IDs, titles and previews. Args: {\"query\": \"keywords\", \"limit\": 5}"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Keywords to search for"},
                "limit": {"type": "integer", "description": "Maximum number of results"}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| "Missing required argument: query".to_string())?;
        let limit = args
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|n| (n as usize).clamp(1, self.max_results))
            .unwrap_or(self.max_results);

        let hits = self.store.search(query, limit);
        if hits.is_empty() {
            return Ok(format!("No documents found for query: {query}"));
        }
        let mut out = format!("Found {} document(s):\n", hits.len());
        for doc in hits {
            out.push_str(&format!(
                "\nID: {}\nTitle: {}\nType: {}\nPreview: {}\n",
                doc.id,
                doc.title,
                doc.doc_type,
                preview(&doc.content)
            ));
        }
        Ok(out)
    }
}

/// document_reader：按 ID 读取全文
pub struct DocumentReaderTool {
    store: Arc<DocumentStore>,
}

impl DocumentReaderTool {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DocumentReaderTool {
    fn name(&self) -> &str {
        DOCUMENT_READER
    }

    fn description(&self) -> &str {
        "Read the full content of a document. Args: {\"doc_id\": \"doc-1\"}"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "doc_id": {"type": "string", "description": "Document ID to read"}
            },
            "required": ["doc_id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let doc_id = args
            .get("doc_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "Missing required argument: doc_id".to_string())?;
        let doc = self
            .store
            .get(doc_id)
            .ok_or_else(|| format!("Document not found: {doc_id}"))?;
        Ok(format!(
            "Document ID: {}\nTitle: {}\nType: {}\n\n{}",
            doc.id, doc.title, doc.doc_type, doc.content
        ))
    }
}
