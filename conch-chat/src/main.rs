// ABOUTME: conch-chat - multi-turn chat with tool calling from the shell.
// ABOUTME: Loads config and mcp.json, connects servers, then runs a REPL or one question.

mod repl;
mod spinner;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use conch::prelude::*;
use futures::future::join_all;
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::spinner::{PausingApproval, Spinner};

#[derive(Parser, Debug)]
#[command(name = "conch-chat", version, about = "Chat with an LLM that can call tools")]
struct Cli {
    /// Ask one question and exit. Omit for interactive mode.
    prompt: Vec<String>,

    /// Provider: openai, anthropic, or ollama
    #[arg(short, long)]
    provider: Option<String>,

    /// Model name
    #[arg(short, long)]
    model: Option<String>,

    /// Config file (TOML, or key = value lines)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not connect to MCP servers
    #[arg(long)]
    no_mcp: bool,

    /// Hide the progress spinner
    #[arg(short, long)]
    quiet: bool,

    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_env(|key| std::env::var(key).ok());
            config
        }
        None => Config::load()?,
    };
    if let Some(provider) = &cli.provider {
        config.provider = provider.clone();
    }
    if let Some(model) = &cli.model {
        config.chat_model = Some(model.clone());
    }
    Ok(config)
}

/// Take over Ctrl+C for the life of the process.
///
/// Each press wakes whatever input wait is pending (the approval prompt) and
/// is otherwise absorbed, so a running turn and its tool calls continue. The
/// line editor reads Ctrl+C as a key and handles it on its own.
fn listen_for_interrupts() -> Arc<Notify> {
    let interrupts = Arc::new(Notify::new());
    let notify = interrupts.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt");
            notify.notify_waiters();
        }
    });
    interrupts
}

/// Connect every configured MCP server concurrently. Servers that fail are
/// logged and left out.
pub(crate) async fn build_registry(config: &Config) -> Result<Registry> {
    let servers = conch::config::load_mcp_servers()?;
    let timeout = config.tools.call_timeout();

    let connections = servers.into_iter().map(|server| async move {
        let name = server.name.clone();
        match McpClient::connect(server, timeout).await {
            Ok(client) => {
                info!(server = %name, "connected to MCP server");
                Some(Arc::new(client) as Arc<dyn ToolSource>)
            }
            Err(e) => {
                warn!(server = %name, error = %e, "could not start MCP server");
                None
            }
        }
    });
    let sources: Vec<_> = join_all(connections).await.into_iter().flatten().collect();

    Ok(Registry::from_sources(sources).await)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;
    let client = config.build_client()?;
    let model = config.resolved_model()?;

    let registry = if cli.no_mcp {
        Registry::new()
    } else {
        build_registry(&config).await?
    };
    let mut catalog = ToolCatalog::new(
        registry,
        conch::tool::Preferences::default_path(),
        config.tools.clone(),
    );
    let disabled = catalog.apply_startup_ceiling().await?;
    if !disabled.is_empty() {
        eprintln!(
            "Disabled large tool groups: {} (use /enable <group> to turn one on)",
            disabled.join(", ")
        );
    }

    let spinner = Spinner::new(!cli.quiet);
    let interrupts = listen_for_interrupts();
    let approval = Arc::new(PausingApproval::new(
        LineApproval::stdio().with_interrupt(interrupts),
        spinner.clone(),
    ));
    let mut conversation = Conversation::new(
        client,
        catalog,
        approval,
        model.clone(),
        config.resolved_system_prompt(),
    )
    .with_max_tokens(config.max_tokens);

    let outcome = if cli.prompt.is_empty() {
        repl::run(&mut conversation, &config, &model, &spinner).await
    } else {
        repl::ask_once(&mut conversation, &cli.prompt.join(" "), &spinner).await
    };

    conversation.catalog().registry().close_all().await;
    outcome
}
