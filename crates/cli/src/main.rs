//! CareBridge CLI: the main entry point.
//!
//! Commands:
//! - `init`     Write a default config file
//! - `chat`     Single-turn or interactive conversation
//! - `gateway`  Start the HTTP API server
//! - `status`   Show configuration and collaborator status

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "carebridge",
    about = "AI 케어브릿지: conversational companion for older adults",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,

    /// Talk to CareBridge
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// User whose profile and history to use
        #[arg(short, long, default_value = "user_001")]
        user: String,

        /// Continue an existing session
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show system status
    Status {
        /// Also check that the default provider is reachable
        #[arg(long)]
        check: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Chat { message, user, session } => commands::chat::run(message, user, session).await?,
        Commands::Gateway { port } => commands::gateway::run(port).await?,
        Commands::Status { check } => commands::status::run(check).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_defaults_to_sample_user() {
        let cli = Cli::try_parse_from(["carebridge", "chat", "-m", "안녕하세요"]).unwrap();
        match cli.command {
            Commands::Chat { message, user, session } => {
                assert_eq!(message.as_deref(), Some("안녕하세요"));
                assert_eq!(user, "user_001");
                assert!(session.is_none());
            }
            _ => panic!("Expected chat command"),
        }
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["carebridge", "gateway", "--port", "9000", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Gateway { port: Some(9000) }));
    }

    #[test]
    fn status_check_is_opt_in() {
        let cli = Cli::try_parse_from(["carebridge", "status"]).unwrap();
        assert!(matches!(cli.command, Commands::Status { check: false }));

        let cli = Cli::try_parse_from(["carebridge", "status", "--check"]).unwrap();
        assert!(matches!(cli.command, Commands::Status { check: true }));
    }
}
