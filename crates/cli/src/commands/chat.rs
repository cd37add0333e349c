//! `carebridge chat`: single-turn or interactive conversation.

use carebridge_agent::{Runtime, TurnInput, TurnOutput};
use carebridge_config::AppConfig;
use carebridge_core::state::AgentKind;
use std::io::Write;
use tokio::io::{self, AsyncBufReadExt, BufReader};

const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

pub async fn run(
    message: Option<String>,
    user_id: String,
    session_id: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for an API key early and give a clear error
    if !config.has_api_key() && config.default_provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    export UPSTAGE_API_KEY=...      (Upstage Solar, default)");
        eprintln!("    export OPENAI_API_KEY=...       (OpenAI)");
        eprintln!("    export CAREBRIDGE_API_KEY=...   (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let runtime = Runtime::from_config(&config)?;

    if let Some(message) = message {
        let mut input = TurnInput::new(user_id.as_str(), message);
        input.session_id = session_id;

        eprint!("  Thinking...");
        let output = runtime.orchestrator.handle_turn(input).await;
        eprint!("\r              \r");
        println!("{}", output.reply);
        print_annotations(&output);
        return Ok(());
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║      AI 케어브릿지: Interactive Mode         ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Model:     {}", runtime.model_label);
    println!("  User:      {user_id}");
    println!("  Memory:    {}", runtime.memory.name());
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit; saying goodbye ends the session too.");
    println!();

    let mut session_id = session_id;
    let mut lines = BufReader::new(io::stdin()).lines();

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if EXIT_COMMANDS.contains(&line) {
            break;
        }
        if line.is_empty() {
            print!("  You > ");
            std::io::stdout().flush()?;
            continue;
        }

        let mut input = TurnInput::new(user_id.as_str(), line);
        input.session_id = session_id.clone();

        eprint!("  ...");
        let output = runtime.orchestrator.handle_turn(input).await;
        eprint!("\r     \r");
        println!();
        for reply_line in output.reply.lines() {
            println!("  CareBridge > {reply_line}");
        }
        print_annotations(&output);
        println!();

        session_id = Some(output.session_id);
        if output.agent_type == AgentKind::End {
            break;
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    if let Some(session_id) = session_id {
        println!("  Session: {session_id}");
    }
    println!("  안녕히 가세요!");
    println!();

    Ok(())
}

/// Routing and risk details on stderr, so piped replies stay clean.
fn print_annotations(output: &TurnOutput) {
    let risk = output.emotion.as_ref().map_or(0, |e| e.risk_level.as_u8());
    eprintln!("  [agent: {}, risk: {risk}]", output.agent_type);
    if let Some(error) = &output.error {
        eprintln!("  [recovered: {error}]");
    }
}
