use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

mod backend;
mod controller;
mod fallback;
mod repl;
mod session;
mod settings;

use backend::HttpBackend;
use controller::ChatController;
use fallback::{FallbackReplies, TracingDiagnostics};
use settings::{FileSettings, Overrides};

#[derive(Debug, Parser)]
#[command(name = "slotbot")]
#[command(about = "Terminal client for the SlotBot appointment assistant", long_about = None)]
struct Cli {
    /// Backend base url
    #[arg(long, env = "API_BASE_URL", global = true)]
    api_base_url: Option<String>,
    /// Config file (defaults to $XDG_CONFIG_HOME/slotbot/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive chat (default)
    Chat,
    /// Send a single message and print the reply
    Ask { text: String },
    /// Probe the backend and print connected/offline
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let file = FileSettings::load(cli.config.as_deref())?;
    let overrides = Overrides { api_base_url: cli.api_base_url.clone() };
    let settings = settings::resolve_effective_settings(&file, &overrides)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    tracing::debug!(api_base_url = %settings.api_base_url, "settings resolved");

    let replies = settings
        .fallback_replies
        .clone()
        .map(FallbackReplies::new)
        .unwrap_or_default();
    let mut controller = ChatController::new(
        Arc::new(HttpBackend::new(settings.api_base_url.clone())),
        Arc::new(TracingDiagnostics),
        replies,
    );

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let health = controller.startup().await;
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            repl::run(&mut controller, Some(health), stdin, &mut stdout).await?;
        }
        Commands::Ask { text } => {
            controller.initialize().await;
            match controller.submit(&text).await {
                Some(reply) => println!("{}", reply.content),
                None => anyhow::bail!("nothing to send: message is empty"),
            }
        }
        Commands::Health => {
            controller.check_health().await;
            println!("{}", if controller.backend_reachable() { "connected" } else { "offline" });
        }
    }
    Ok(())
}
