//! Hive - 对话式任务路由
//!
//! 每一轮：意图识别 → 三个处理器之一（问答 / 摘要 / 计算）的工具循环 → 结构化结果 → 记忆整合。
//!
//! 模块划分：
//! - **agent**: 无头运行时（从配置组装组件、处理单条消息）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型
//! - **handlers**: 共享工具循环、任务能力集、结构化结果与信号提取
//! - **intent**: 意图识别与路由映射
//! - **llm**: LLM 客户端抽象、调用方式与实现（OpenAI 兼容 / Mock / 重试）
//! - **memory**: 消息模型、会话状态、记忆整合与持久化
//! - **observability**: 日志初始化
//! - **prompts**: 提示词模板
//! - **tools**: 文档检索、文档读取、计算器与执行器
//! - **workflow**: 路由状态机与单轮执行引擎

pub mod agent;
pub mod config;
pub mod core;
pub mod handlers;
pub mod intent;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod prompts;
pub mod tools;
pub mod workflow;

pub use crate::core::AgentError;
pub use memory::{ConversationState, ConversationTurn};
pub use workflow::{TurnOutcome, TurnWorkflow};
