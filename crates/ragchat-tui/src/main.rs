use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use ragchat_core::{
    ChatClient, ChatWidget, Config, HtmlRenderer, MarkdownRenderer, WidgetOptions, ERROR_MESSAGE,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod markdown;
mod tui;
mod ui;

use app::App;
use markdown::TerminalMarkdown;
use tui::EventHandler;

/// Busy indicator frame rate
const TICK_RATE: Duration = Duration::from_millis(300);

#[derive(Parser)]
#[command(name = "ragchat")]
#[command(about = "Terminal chat client for a RAG question-answering backend")]
struct Cli {
    /// Backend address, e.g. http://localhost:5000
    #[arg(long, env = "RAGCHAT_ENDPOINT")]
    endpoint: Option<String>,
    /// Delay between revealed characters of a reply, in milliseconds
    #[arg(long = "delay-ms", env = "RAGCHAT_TYPING_DELAY_MS")]
    delay_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the reply
    Ask {
        /// Your question
        question: String,
        /// Print the reply as an HTML fragment instead of markdown
        #[arg(long)]
        html: bool,
    },
    /// Save default settings and show the effective configuration
    Config {
        /// Backend address to save
        #[arg(long)]
        endpoint: Option<String>,
        /// Typing delay to save, in milliseconds
        #[arg(long = "delay-ms")]
        delay_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _log_guard = init_logging()?;

    let config = Config::load()?;

    if let Some(Commands::Config { endpoint, delay_ms }) = &cli.command {
        let saved = save_config(config, endpoint.clone(), *delay_ms)?;
        print_config(&effective_config(&cli, saved))?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = effective_config(&cli, config);
    // An unusable endpoint is fatal before anything is drawn.
    let client = ChatClient::new(config.endpoint())?;

    match &cli.command {
        Some(Commands::Ask { question, html }) => ask(&client, question, *html).await,
        _ => {
            run(client, &config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Layers the command line over the saved settings. Clap already prefers a
/// flag over its environment variable; unset values fall through to the file
/// and then to the built-in defaults.
fn effective_config(cli: &Cli, mut config: Config) -> Config {
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = Some(endpoint.clone());
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.typing_delay_ms = Some(delay_ms);
    }
    config
}

async fn run(client: ChatClient, config: &Config) -> Result<()> {
    tracing::info!(endpoint = config.endpoint(), "starting chat session");

    let options = WidgetOptions {
        typing_delay: config.typing_delay(),
    };
    let (widget, mut widget_events) = ChatWidget::attach(client, TerminalMarkdown::new(), options);
    let mut app = App::new(widget, config.endpoint());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(TICK_RATE);

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            tokio::select! {
                Some(event) = events.next() => handler::handle_event(&mut app, event),
                Some(event) = widget_events.recv() => app.widget.handle(event),
                else => break,
            }
        }
        anyhow::Ok(())
    }
    .await;

    app.widget.detach();
    tui::restore()?;
    tracing::info!("chat session ended");
    result
}

async fn ask(client: &ChatClient, question: &str, html: bool) -> Result<ExitCode> {
    let question = question.trim();
    if question.is_empty() {
        bail!("question must not be empty");
    }

    match client.query(question).await {
        Ok(reply) => {
            if html {
                print!("{}", HtmlRenderer.render(&reply));
            } else {
                println!("{reply}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(error = %e, "chat request failed");
            eprintln!("{ERROR_MESSAGE}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Writes the given settings to the config file and returns what was saved.
fn save_config(mut config: Config, endpoint: Option<String>, delay_ms: Option<u64>) -> Result<Config> {
    if endpoint.is_none() && delay_ms.is_none() {
        return Ok(config);
    }
    if let Some(endpoint) = endpoint {
        // Reject it now rather than on the next start
        ChatClient::new(&endpoint)?;
        config.endpoint = Some(endpoint);
    }
    if let Some(delay_ms) = delay_ms {
        config.typing_delay_ms = Some(delay_ms);
    }
    config.save()?;
    Ok(config)
}

fn print_config(config: &Config) -> Result<()> {
    println!("Config file:  {}", Config::config_path()?.display());
    println!("Endpoint:     {}", config.endpoint());
    println!("Typing delay: {}ms", config.typing_delay().as_millis());
    Ok(())
}

/// Log to a daily file; the terminal belongs to the UI.
fn init_logging() -> Result<WorkerGuard> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ragchat")
        .join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, "ragchat.log"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(file_layer)
        .init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_config() -> Config {
        Config {
            endpoint: Some("http://from-file:5000".to_string()),
            typing_delay_ms: Some(35),
        }
    }

    // Every case lives in one test: clap reads the process environment, and
    // tests run in parallel.
    #[test]
    fn flag_beats_env_beats_file_beats_default() {
        std::env::remove_var("RAGCHAT_ENDPOINT");
        std::env::remove_var("RAGCHAT_TYPING_DELAY_MS");

        let cli = Cli::try_parse_from(["ragchat"]).unwrap();
        let config = effective_config(&cli, Config::default());
        assert_eq!(config.endpoint(), ragchat_core::config::DEFAULT_ENDPOINT);
        assert_eq!(config.typing_delay(), ragchat_core::typing::DEFAULT_TYPING_DELAY);

        let config = effective_config(&cli, file_config());
        assert_eq!(config.endpoint(), "http://from-file:5000");
        assert_eq!(config.typing_delay(), Duration::from_millis(35));

        std::env::set_var("RAGCHAT_ENDPOINT", "http://from-env:5000");
        std::env::set_var("RAGCHAT_TYPING_DELAY_MS", "5");
        let cli = Cli::try_parse_from(["ragchat"]).unwrap();
        let config = effective_config(&cli, file_config());
        assert_eq!(config.endpoint(), "http://from-env:5000");
        assert_eq!(config.typing_delay(), Duration::from_millis(5));

        let cli = Cli::try_parse_from([
            "ragchat",
            "--endpoint",
            "http://from-flag:5000",
            "--delay-ms",
            "0",
        ])
        .unwrap();
        let config = effective_config(&cli, file_config());
        assert_eq!(config.endpoint(), "http://from-flag:5000");
        assert_eq!(config.typing_delay(), Duration::ZERO);

        // The config subcommand sees the same layering.
        let cli = Cli::try_parse_from(["ragchat", "config"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Config { .. })));
        assert_eq!(effective_config(&cli, file_config()).endpoint(), "http://from-env:5000");

        std::env::remove_var("RAGCHAT_ENDPOINT");
        std::env::remove_var("RAGCHAT_TYPING_DELAY_MS");
    }

    #[test]
    fn config_subcommand_flags_are_what_gets_saved() {
        let cli = Cli::try_parse_from(["ragchat", "config", "--delay-ms", "40"]).unwrap();
        match cli.command {
            Some(Commands::Config { endpoint, delay_ms }) => {
                assert_eq!(endpoint, None);
                assert_eq!(delay_ms, Some(40));
            }
            _ => panic!("expected the config subcommand"),
        }
    }
}
