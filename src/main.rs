use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dramashort::{
    catalog::{BrowseState, CatalogClient, CatalogSource},
    config::Config,
    player::{
        CommandOpener, HttpProbeEngine, PlaybackOutcome, PlayerCommand, PlayerController,
        PlayerSession, TokioClock,
    },
    web::WebServer,
};

#[derive(Parser)]
#[command(name = "dramashort")]
#[command(version)]
#[command(about = "Short-drama catalog proxy with a resilient player")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Log level
    #[arg(short = 'v', long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web server (default)
    Serve {
        /// Listening IP address
        #[arg(short = 'H', long, value_name = "IP")]
        host: Option<String>,

        /// Listening port
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,
    },
    /// Probe a video URL and play it, falling back to the configured opener.
    /// While waiting, type `r` + Enter to retry or `o` + Enter to open the source now.
    Watch {
        /// Video URL
        url: String,
    },
    /// Page through a catalog source
    List {
        /// melolo, dramabox or netshort
        #[arg(short, long, default_value = "melolo")]
        source: CatalogSource,

        /// Maximum number of pages to fetch
        #[arg(long, default_value_t = 1)]
        pages: u32,

        /// Print pages as JSON instead of one line per drama
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with specified level
    let log_filter = if cli.log_level == "trace" {
        format!("dramashort={},tower_http=trace", cli.log_level)
    } else {
        format!("dramashort={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load_from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;
    info!("Configuration loaded from: {}", cli.config);

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.web.host = host;
            }
            if let Some(port) = port {
                config.web.port = port;
            }
            serve(config).await
        }
        Command::Watch { url } => watch(config, url).await,
        Command::List {
            source,
            pages,
            json,
        } => list(config, source, pages, json).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting dramashort v{}", env!("CARGO_PKG_VERSION"));
    let web_server = WebServer::new(config)?;
    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );
    web_server.serve().await
}

async fn watch(config: Config, url: String) -> Result<()> {
    let url = url.trim().to_string();
    if url.is_empty() {
        bail!("Missing video URL");
    }

    let catalog = CatalogClient::new(config.catalog.clone())?;
    let opener = CommandOpener::from_command_line(&config.player.fallback_command)
        .context("player.fallback_command is empty")?;
    let (clock, timers) = TokioClock::channel();
    let (engine, reports) = HttpProbeEngine::channel(catalog.http().clone());
    let controller = PlayerController::new(config.player.clone(), clock, engine, opener);

    let session = PlayerSession::spawn(url, controller, timers, reports);
    let input = tokio::spawn(forward_user_input(session.commands()));

    let outcome = session.wait().await.context("Player session panicked")?;
    input.abort();

    match &outcome {
        PlaybackOutcome::Playing {
            attempt_url,
            retries,
        } => {
            info!(retries, "Video is playable");
            match config.player.player_command.as_deref() {
                Some(command) => CommandOpener::from_command_line(command)
                    .context("player.player_command is empty")?
                    .launch(attempt_url)
                    .with_context(|| format!("Failed to launch '{command}'"))?,
                None => info!("No player_command configured, printing the URL"),
            }
        }
        PlaybackOutcome::Redirected { url } => info!("Opened {} through the fallback", url),
        PlaybackOutcome::Cancelled => warn!("Playback cancelled"),
    }
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}

/// `r` retries, `o` opens the source now; Ctrl+C or end of input cancels
async fn forward_user_input(commands: mpsc::UnboundedSender<PlayerCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let command = tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => match line.trim() {
                    "r" | "retry" => PlayerCommand::Retry,
                    "o" | "open" => PlayerCommand::OpenNow,
                    "q" | "quit" => PlayerCommand::Cancel,
                    _ => continue,
                },
                // Stdin closed (e.g. not a terminal); leave the session to its deadlines.
                Ok(None) | Err(_) => {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        let _ = commands.send(PlayerCommand::Cancel);
                    }
                    return;
                }
            },
            _ = tokio::signal::ctrl_c() => PlayerCommand::Cancel,
        };
        if commands.send(command).is_err() || command == PlayerCommand::Cancel {
            return;
        }
    }
}

async fn list(config: Config, source: CatalogSource, pages: u32, json: bool) -> Result<()> {
    let client = CatalogClient::new(config.catalog.clone())?;
    let per_page = config.catalog.items_per_page;
    let mut state = BrowseState::new(source);

    for _ in 0..pages {
        if !state.has_more {
            break;
        }
        let request = state.request();
        match client
            .page(request.source, request.offset, request.page, per_page)
            .await
        {
            Ok(page) => {
                if json {
                    println!("{}", serde_json::to_string(&page)?);
                } else {
                    for card in &page.data {
                        println!(
                            "{}\t{}\t{} eps\t{}",
                            card.id, card.title, card.episodes, card.watch_url
                        );
                    }
                }
                state = state.apply(&page, per_page);
            }
            Err(e) => {
                warn!("Failed to load {} page: {}", source, e);
                state = state.fail(e.to_string());
            }
        }
    }

    if let Some(error) = &state.error {
        bail!("Listing {} stopped: {}", source, error);
    }
    info!(loaded = state.loaded, has_more = state.has_more, "Listing finished");
    Ok(())
}
