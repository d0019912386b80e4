//! 会话持久化
//!
//! 将 ConversationState 写入/从 JSON 文件加载，用于跨进程恢复（由调用方决定是否使用，核心层不依赖）。

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::memory::ConversationState;

/// 简单的文件持久化：单文件 JSON 保存整个会话状态
#[derive(Debug, Clone)]
pub struct StatePersistence {
    path: PathBuf,
}

impl StatePersistence {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 从 JSON 文件加载会话；文件不存在时返回 None
    pub fn load(&self) -> anyhow::Result<Option<ConversationState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read session file {}", self.path.display()))?;
        let state = serde_json::from_str(&data)
            .with_context(|| format!("parse session file {}", self.path.display()))?;
        Ok(Some(state))
    }

    /// 将会话写入 JSON 文件；父目录不存在时自动创建
    pub fn save(&self, state: &ConversationState) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(state)?)
            .with_context(|| format!("write session file {}", self.path.display()))?;
        Ok(())
    }
}
