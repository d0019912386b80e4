//! 共享工具循环
//!
//! 模板 → 绑定工具调用 → 逐个执行提议的工具 → 结构化输出 → 回填 → 润色。
//! 三种处理器都走这里，差异由 TaskKind 提供。工具失败不会中止回合，
//! 错误文本作为工具结果回传给模型；结构化输出失败是致命错误。

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::core::AgentError;
use crate::handlers::extract::Extraction;
use crate::handlers::kind::TaskKind;
use crate::handlers::response::StructuredResult;
use crate::llm::{bind_tools, invoke_text, LlmClient};
use crate::memory::{trailing_messages, Message};
use crate::prompts::{render, PromptSet};
use crate::tools::ToolExecutor;

/// 处理器运行所需的共享依赖
#[derive(Clone)]
pub struct HandlerContext {
    pub llm: Arc<dyn LlmClient>,
    pub executor: Arc<ToolExecutor>,
    pub prompts: Arc<PromptSet>,
    /// 拼入上下文的历史消息条数
    pub history_window: usize,
}

/// 单次处理器运行的输入
#[derive(Debug, Clone, Copy)]
pub struct HandlerInput<'a> {
    pub user_input: &'a str,
    pub summary: &'a str,
    pub history: &'a [Message],
}

/// 一次实际执行的工具调用（只在本次运行内存在）
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub name: String,
    pub args: Value,
    pub call_id: String,
    pub ok: bool,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutput {
    pub response: StructuredResult,
    /// 按执行顺序记录每次调用的工具名（允许重复）
    pub tools_used: Vec<String>,
}

/// 构造处理器的初始消息：system 模板、最近历史、当前用户回合
pub fn build_messages(kind: TaskKind, prompts: &PromptSet, input: &HandlerInput<'_>, window: usize) -> Vec<Message> {
    let template = kind.chat_template(prompts);
    let mut messages = vec![Message::system(render(
        &template.system,
        &[("conversation_summary", input.summary)],
    ))];
    messages.extend_from_slice(trailing_messages(input.history, window));
    messages.push(Message::user(render(&template.human, &[("user_input", input.user_input)])));
    messages
}

/// 运行一次处理器
pub async fn run_tool_loop(
    ctx: &HandlerContext,
    kind: TaskKind,
    input: HandlerInput<'_>,
) -> Result<HandlerOutput, AgentError> {
    let mut messages = build_messages(kind, &ctx.prompts, &input, ctx.history_window);

    let bound = bind_tools(ctx.llm.as_ref(), ctx.executor.specs());
    let reply = bound.invoke(&messages).await?;
    let proposed = reply.tool_calls.clone();
    messages.push(reply);
    tracing::debug!(kind = kind.as_str(), proposed = proposed.len(), "tool calls proposed");

    let mut extraction = Extraction::default();
    let mut invocations: Vec<ToolInvocation> = Vec::new();
    for call in proposed {
        if !ctx.executor.has_tool(&call.name) {
            tracing::debug!(tool = %call.name, "unknown tool proposed, skipped");
            continue;
        }
        let args = resolve_args(kind, &call.name, call.args.clone(), input.user_input);
        kind.note_call(&call.name, &args, &mut extraction);

        // 工具错误作为文本回填给模型，回合继续
        let (ok, output) = match ctx.executor.execute(&call.name, args.clone()).await {
            Ok(content) => (true, content),
            Err(e) if e.is_tool_error() => {
                tracing::warn!(tool = %call.name, error = %e, "tool failed, feeding error back to model");
                (false, format!("Error: {e}"))
            }
            Err(e) => return Err(e),
        };
        let call_id = call.reply_id();
        messages.push(Message::tool(output.clone(), call_id.clone()));
        if ok {
            kind.observe(&call.name, &output, &mut extraction);
        }
        invocations.push(ToolInvocation {
            name: call.name,
            args,
            call_id,
            ok,
            output,
        });
    }

    let mut response = kind.invoke_structured(ctx.llm.as_ref(), &messages).await?;
    response.backfill(&extraction);

    let polish = kind.polish_prompt(&response, &ctx.prompts);
    let polished = invoke_text(ctx.llm.as_ref(), &[Message::user(polish)]).await?;
    response.apply_polish(polished);

    let failed = invocations.iter().filter(|i| !i.ok).count();
    tracing::info!(
        kind = kind.as_str(),
        tools = invocations.len(),
        failed,
        "handler finished"
    );
    Ok(HandlerOutput {
        response,
        tools_used: invocations.into_iter().map(|i| i.name).collect(),
    })
}

/// 补齐模型遗漏的参数；非对象参数原样透传
fn resolve_args(kind: TaskKind, tool_name: &str, args: Value, user_input: &str) -> Value {
    let mut map = match args {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => return other,
    };
    kind.fill_default_args(tool_name, &mut map, user_input);
    Value::Object(map)
}
