//! estat - command-line adaptor for the e-Stat statistics API
//!
//! Downloads paginated datasets, flattens them into labelled tables, searches
//! the dataset catalog and merges several tables by grouping key.

use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;
use estat_core::{ProgressContext, shutdown_flag};
use estat_table::View;

#[derive(Parser)]
#[command(name = "estat")]
#[command(about = "Command-line adaptor for the e-Stat statistics API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// e-Stat application id (overrides the config file)
    #[arg(long, global = true)]
    app_id: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./estat.toml or ~/.config/estat/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Maximum retry attempts for transient failures
    #[arg(long, global = true)]
    max_retries: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Print a whole dataset table
    Get(cmd::table::TableArgs),
    /// Print the header and the first 5 rows
    Head(cmd::table::TableArgs),
    /// Print the header and the last 5 rows
    Tail(cmd::table::TableArgs),
    /// Merge several datasets by grouping key
    Merge(cmd::merge::MergeArgs),
    /// Search the n-gram index
    Search(cmd::search::SearchArgs),
    /// Search the catalog index ("index" lists everything)
    Find(cmd::search::FindArgs),
    /// Show the user index
    Users(cmd::search::UsersArgs),
    /// Download the catalog and build the indexes
    Catalog(cmd::catalog::CatalogArgs),
    /// Show current configuration
    Config,
}

fn setup_signal_handler() -> Result<()> {
    // First signal: set graceful shutdown flag
    // Second signal: force exit
    // SAFETY: AtomicBool::swap and process::exit are async-signal-safe
    unsafe {
        signal_hook::low_level::register(signal_hook::consts::SIGTERM, || {
            if shutdown_flag().swap(true, Ordering::Relaxed) {
                std::process::exit(130);
            }
        })
        .context("Failed to register SIGTERM handler")?;
        signal_hook::low_level::register(signal_hook::consts::SIGINT, || {
            if shutdown_flag().swap(true, Ordering::Relaxed) {
                std::process::exit(130);
            }
        })
        .context("Failed to register SIGINT handler")?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = ProgressContext::new();

    // Logging:
    //   TTY:     quiet (warn) unless --debug; progress lines show activity
    //   non-TTY: info unless --debug; logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    estat_core::init_logging(quiet, cli.debug, multi);

    setup_signal_handler()?;

    // Load configuration
    let mut config = if let Some(path) = &cli.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // CLI overrides
    if let Some(timeout) = cli.timeout {
        config.http.request_timeout = timeout;
    }
    if let Some(max_retries) = cli.max_retries {
        config.http.max_retries = max_retries;
    }

    if let Command::Config = cli.command {
        print_config(&config, cli.app_id.is_some());
        return Ok(());
    }

    let session = cmd::Session::new(config, cli.app_id)?;
    match cli.command {
        Command::Get(args) => cmd::table::run(View::Get, args, &session, &progress),
        Command::Head(args) => cmd::table::run(View::Head, args, &session, &progress),
        Command::Tail(args) => cmd::table::run(View::Tail, args, &session, &progress),
        Command::Merge(args) => cmd::merge::run(args, &session, &progress),
        Command::Search(args) => cmd::search::run_search(args, &session),
        Command::Find(args) => cmd::search::run_find(args, &session),
        Command::Users(args) => cmd::search::run_users(args, &session),
        Command::Catalog(args) => cmd::catalog::run(args, &session, &progress),
        Command::Config => Ok(()),
    }
}

fn print_config(config: &Config, app_id_flag: bool) {
    use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    table.add_row(vec![
        "Storage root",
        &config.storage.root.display().to_string(),
    ]);
    table.add_row(vec![
        "App id",
        if app_id_flag {
            "from --app-id"
        } else if config.api.app_id.is_some() {
            "configured"
        } else {
            "not set"
        },
    ]);
    table.add_row(vec![
        "API endpoint",
        &format!("{}/rest/{}", config.api.host, config.api.version),
    ]);
    table.add_row(vec!["Page size", &config.api.limit.to_string()]);
    table.add_row(vec![
        "Follow NEXT_KEY",
        if config.api.follow_next_key { "yes" } else { "no" },
    ]);
    table.add_row(vec!["Max pages", &config.api.max_pages.to_string()]);
    table.add_row(vec![
        "Request timeout",
        &format!("{}s", config.http.request_timeout),
    ]);
    table.add_row(vec!["Max retries", &config.http.max_retries.to_string()]);
    table.add_row(vec!["Merge memory", &config.merge.memory_limit]);

    eprintln!("\n{table}");
}
