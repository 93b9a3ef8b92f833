use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use llm_chat::app::App;
use llm_chat::tui::{self, EventHandler, Tui};
use llm_chat::{
    handler, ui, ChatController, CompletionClient, Config, CredentialStore, FileCredentialStore,
    Notice,
};

#[derive(Parser)]
#[command(name = "llm-chat")]
#[command(version, about = "Chat with a hosted LLM from the terminal")]
struct Cli {
    /// Model identifier sent with every request
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Seconds to wait for a reply before giving up
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write logs here instead of the config directory
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Send one message and print the reply
    Ask {
        /// Message to send
        message: String,
    },
    /// Store an API key
    Login {
        /// The API key
        key: String,
    },
    /// Remove the stored API key
    Logout,
    /// Save --model, --base-url and --timeout as the defaults
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_file.clone())?;

    let mut config = Config::load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "could not read config, using defaults");
        Config::new()
    });
    config.apply_overrides(cli.model.clone(), cli.base_url.clone(), cli.timeout);

    let mut store = FileCredentialStore::open_default()?;
    info!(model = config.model(), base_url = config.base_url(), "starting");

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let client = CompletionClient::from_config(&config)?;
            run_tui(ChatController::new(Box::new(store), client)).await
        }
        Commands::Ask { message } => {
            let client = CompletionClient::from_config(&config)?;
            ask_once(ChatController::new(Box::new(store), client), &message).await
        }
        Commands::Login { key } => {
            let key = key.trim();
            if key.is_empty() {
                bail!("API key must not be empty");
            }
            store.write(key)?;
            println!("API key saved to {}", store.path().display());
            Ok(())
        }
        Commands::Logout => {
            store.clear()?;
            println!("API key removed");
            Ok(())
        }
        Commands::Config => {
            config.save()?;
            println!(
                "model: {}\nbase url: {}\ntimeout: {}s\nsaved to {}",
                config.model(),
                config.base_url(),
                config.request_timeout().as_secs(),
                Config::get_config_path()?.display()
            );
            Ok(())
        }
    }
}

fn init_logging(verbose: bool, log_file: Option<PathBuf>) -> Result<()> {
    // The TUI owns the terminal, so logs always go to a file
    let path = match log_file {
        Some(path) => path,
        None => Config::app_dir()?.join("llm-chat.log"),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize logging: {err}"))
}

async fn run_tui(controller: ChatController) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut app = App::new(controller);
    let mut events = EventHandler::new();

    let result = event_loop(&mut terminal, &mut app, &mut events).await;
    tui::restore()?;
    result
}

async fn event_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}

async fn ask_once(mut controller: ChatController, message: &str) -> Result<()> {
    controller.send(message).await;

    match controller.take_notices().first() {
        Some(Notice::CredentialRequired) => {
            bail!("no API key stored; run `llm-chat login <key>` first")
        }
        Some(notice) => bail!("{}", notice.description()),
        None => {}
    }

    if let Some(reply) = controller.conversation().last().filter(|m| m.is_bot) {
        println!("{}", reply.content);
    }
    Ok(())
}
