//! Health Board command line: dashboard watcher and board management

use clap::{Parser, Subcommand};
use health_board::preferences::{CookieJar, DarkModePreference};
use health_board::render::render_page;
use health_board::{Config, Dashboard, DashboardError, HealthBoardClient, ItemUpdate, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "health-board", version, about = "Health board dashboard and client")]
struct Cli {
    /// Base URL of the board API (overrides HEALTH_BOARD_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Enable debug logging when RUST_LOG is not set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the board and keep the rendered dashboard up to date.
    /// Type `d` and Enter to toggle dark mode.
    Watch {
        /// File the dashboard page is written to on every render
        #[arg(long, env = "DASHBOARD_OUTPUT")]
        output: Option<PathBuf>,

        /// File backing the preference cookie jar
        #[arg(long, env = "DASHBOARD_COOKIE_FILE")]
        cookie_file: Option<PathBuf>,

        /// Poll interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Show the current board data
    Show,
    /// Create a new category or item
    Create {
        #[command(subcommand)]
        target: Target,
    },
    /// Remove a category or item
    Remove {
        #[command(subcommand)]
        target: Target,
    },
    /// Update an item's status, message or url
    Update {
        category: String,
        item: String,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        message: Option<String>,
        #[arg(long)]
        url: Option<String>,
        /// Fail instead of creating a missing category or item
        #[arg(long)]
        no_upsert: bool,
    },
    /// Save the board data to its checkpoint file
    Save,
    /// Restore the board data from its checkpoint file
    Restore,
}

#[derive(Subcommand, Debug)]
enum Target {
    Category {
        name: String,
    },
    Item {
        category: String,
        item: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    initialize_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env();
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    if let Command::Watch {
        output,
        cookie_file,
        interval_ms,
    } = &cli.command
    {
        if output.is_some() {
            config.output_path = output.clone();
        }
        if cookie_file.is_some() {
            config.cookie_file = cookie_file.clone();
        }
        if let Some(ms) = interval_ms {
            config.poll_interval = Duration::from_millis(*ms);
        }
    }

    config.validate().map_err(DashboardError::Config)?;
    debug!("Using board at {}", config.base_url);

    let client = HealthBoardClient::new(config.api_root(), config.http_timeout)?;

    match cli.command {
        Command::Watch { .. } => watch(config, client).await,
        Command::Show => print_json(&client.get_health().await?),
        Command::Create { target } => match target {
            Target::Category { name } => print_json(&client.create_category(&name).await?),
            Target::Item { category, item } => {
                print_json(&client.create_item(&category, &item, false).await?)
            }
        },
        Command::Remove { target } => match target {
            Target::Category { name } => print_json(&client.delete_category(&name).await?),
            Target::Item { category, item } => {
                print_json(&client.delete_item(&category, &item).await?)
            }
        },
        Command::Update {
            category,
            item,
            status,
            message,
            url,
            no_upsert,
        } => {
            let update = ItemUpdate {
                status,
                message,
                url,
            };
            print_json(&client.update_item(&category, &item, update, !no_upsert).await?)
        }
        Command::Save => print_json(&client.checkpoint().await?),
        Command::Restore => print_json(&client.restore().await?),
    }
}

async fn watch(config: Config, client: HealthBoardClient) -> Result<()> {
    info!(
        "Starting health dashboard v{} against {}",
        env!("CARGO_PKG_VERSION"),
        config.base_url
    );

    let jar = match &config.cookie_file {
        Some(path) => CookieJar::load(path).await?,
        None => CookieJar::in_memory(),
    };

    let dashboard = Dashboard::new(
        Arc::new(client),
        DarkModePreference::new(jar),
        config.poll_interval,
    );

    let mut updates = dashboard.subscribe();
    let output = config.output_path.clone();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let table = updates.borrow_and_update().clone();
            match &output {
                Some(path) => {
                    let page = match render_page(&table) {
                        Ok(page) => page,
                        Err(e) => {
                            error!("Failed to render dashboard page: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = tokio::fs::write(path, page).await {
                        warn!("Failed to write dashboard to {}: {}", path.display(), e);
                    }
                }
                None => info!("Dashboard rendered {} rows", table.rows.len()),
            }
        }
    });

    let toggler = dashboard.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if matches!(line.trim(), "d" | "dark") {
                toggler.toggle_dark_mode().await;
            }
        }
    });

    dashboard.start().await
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize structured logging
fn initialize_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
