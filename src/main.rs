//! Medical Benefits Administration orchestration core — interactive shell
//!
//! Thin REPL over `Core`/`Orchestrator`, mirroring the teacher's
//! `main.rs` loop (dotenv + tracing setup, banner, `quit`/`history`/`clear`
//! commands) but without the ReAct/autonomous-mode/BitNet branches, which
//! have no counterpart in this core.

use mba_orchestrator_core::config::AppConfig;
use mba_orchestrator_core::core::Core;
use mba_orchestrator_core::entities::Query;
use std::io::{self, Write};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("failed to set tracing subscriber");

    println!("\n{}", "=".repeat(60));
    println!("Medical Benefits Administration orchestration core v0.2.0");
    println!("{}\n", "=".repeat(60));

    let config = AppConfig::from_env();
    let core = Core::from_config(&config).await?;

    let health = core.health().await;
    info!(?health, "core initialized");
    println!(
        "Health: relational={} object_store={} vector_store={}\n",
        health.relational_initialized, health.object_store_initialized, health.vector_store_initialized
    );

    println!("Commands: 'quit' | 'history <session>' | 'clear <session>'\n");

    let session_id = "repl";
    loop {
        print!("query> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let line = input.trim();

        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("history") {
            let session = rest.trim();
            let session = if session.is_empty() { session_id } else { session };
            let history = core.orchestrator.history(session).await;
            if history.is_empty() {
                println!("(no history for '{}')\n", session);
            } else {
                for item in history {
                    println!("  [{}] {} -> {} (success={})", item.timestamp, item.query, item.intent, item.success);
                }
                println!();
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("clear") {
            let session = rest.trim();
            let session = if session.is_empty() { session_id } else { session };
            core.orchestrator.clear_history(session).await;
            println!("History cleared for '{}'.\n", session);
            continue;
        }

        match line.to_lowercase().as_str() {
            "quit" | "exit" | "q" => {
                println!("\nGoodbye.\n");
                break;
            }
            _ => {}
        }

        let response = core.orchestrator.process(Query::new(line).with_session(session_id)).await;
        let status = if response.success { "ok" } else { "failed" };
        println!(
            "[{}] intent={} confidence={:.2} agent={}",
            status, response.intent, response.confidence, response.agent
        );
        println!("{:#?}\n", response.result);
    }

    Ok(())
}
