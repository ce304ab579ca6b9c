use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use maxibot::bridge::ChatBridge;
use maxibot::llm::GeminiClient;

#[derive(Parser)]
#[command(name = "maxibot")]
#[command(about = "Maxibot — WhatsApp to Gemini relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config.json.
    Init {
        /// Config file path (default: MAXIBOT_CONFIG_PATH or ~/.maxibot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Run the webhook gateway. Credentials come from the environment (or .env) and the config file.
    Serve {
        /// Config file path (default: MAXIBOT_CONFIG_PATH or ~/.maxibot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default: PORT env, then config, then 3008)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Send one message through the chat bridge and print the reply (no messaging platform involved).
    Ask {
        /// Config file path (default: MAXIBOT_CONFIG_PATH or ~/.maxibot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Extra context appended after the persona block.
        #[arg(long, value_name = "TEXT", default_value = "")]
        context: String,

        /// The user's message.
        message: String,
    },
}

#[tokio::main]
async fn main() {
    // Before the logger so RUST_LOG may come from .env; the outcome is logged below.
    let dotenv = maxibot::config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match dotenv {
        Ok(Some(path)) => log::debug!("loaded environment from {}", path.display()),
        Ok(None) => log::debug!("no .env file found"),
        Err(e) => log::warn!("failed to load .env: {}", e),
    }

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("maxibot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Ask {
            config,
            context,
            message,
        }) => {
            if let Err(e) = run_ask(config, &context, &message).await {
                log::error!("ask failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(maxibot::config::default_config_path);
    let dir = maxibot::config::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, path) = maxibot::config::load_config(config_path)?;
    config.gateway.port = port.unwrap_or_else(|| maxibot::config::resolve_port(&config));
    log::info!(
        "starting gateway on {}:{}",
        config.gateway.bind,
        config.gateway.port
    );
    maxibot::gateway::run_gateway(config, path).await
}

async fn run_ask(config_path: Option<PathBuf>, context: &str, message: &str) -> anyhow::Result<()> {
    let (config, path) = maxibot::config::load_config(config_path)?;
    let persona = maxibot::config::resolve_persona(&config, &path)?;
    let gemini = GeminiClient::from_config(&config, &persona);
    if !gemini.has_api_key() {
        log::warn!("GEMINI_API_KEY is not set");
    }
    let bridge = ChatBridge::new(Arc::new(gemini), persona);
    println!("{}", bridge.chat(context, message).await);
    Ok(())
}
