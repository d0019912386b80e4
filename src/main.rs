//! Hive - 对话式任务路由
//!
//! 入口：初始化日志、加载配置、构建路由工作流，并运行行式 REPL。
//! `/reset` 清空当前会话，`/quit` 退出。

use anyhow::Context;
use hive::agent::{create_agent_components, new_session, process_message};
use hive::config::{load_config, AppConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hive::observability::init();

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let components = create_agent_components(&cfg).context("Failed to create agent")?;
    let mut state = new_session(&components);
    tracing::info!(session_id = %state.session_id, "session ready");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                state.reset();
                if let Some(persistence) = &components.persistence {
                    if let Err(e) = persistence.save(&state) {
                        tracing::warn!(error = %e, "failed to persist session state");
                    }
                }
                stdout.write_all(b"Conversation cleared.\n").await?;
                continue;
            }
            _ => {}
        }

        let reply = match process_message(&components, &mut state, input).await {
            Ok(text) => {
                let text = if text.is_empty() { "(no response)".to_string() } else { text };
                match state.last_turn().filter(|t| !t.tools_used.is_empty()) {
                    Some(turn) => format!("{text}\n[tools: {}]", turn.tools_used.join(", ")),
                    None => text,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "turn failed");
                "Sorry, I couldn't process that request. Please try again.".to_string()
            }
        };
        stdout.write_all(format!("{reply}\n").as_bytes()).await?;
    }

    Ok(())
}
