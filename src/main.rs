//! quakeview - Live earthquake map served from a single binary.
//!
//! Fetches the USGS GeoJSON feed and draws each event as a magnitude-colored
//! circle on an interactive map. Clicking the map drops a pin and reports
//! its coordinate.

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

mod cli;
mod client;
mod errors;
mod fetcher;
mod marker;
mod models;
mod output;
mod picker;
mod server;
mod styling;
mod view;

use cli::{Cli, Command};
use client::FeedClient;
use fetcher::Fetcher;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Snapshot(args) => cmd_snapshot(args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the `snapshot` command - one fetch, printed.
fn cmd_snapshot(args: cli::SnapshotArgs) -> Result<()> {
    let client = FeedClient::new(args.feed).context("failed to create feed client")?;

    let fetcher = Fetcher::new(client);

    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(fetcher.refresh());

    let snapshot = fetcher.snapshot();
    if let Some(message) = snapshot.status.error() {
        anyhow::bail!("{message}");
    }

    // Most recent first
    let mut events = snapshot.events.to_vec();
    events.sort_by(|a, b| b.time.cmp(&a.time));
    events.truncate(args.limit);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_events(&mut handle, &events, args.format)?;

    Ok(())
}

/// Execute the `serve` command - start the map server.
fn cmd_serve(args: cli::ServeArgs) -> Result<()> {
    let config = server::ServerConfig {
        port: args.port,
        host: args.host.clone(),
        feed: args.feed,
        base_url: args.base_url.clone(),
    };

    // Print startup message
    let url = format!("http://{}:{}", args.host, args.port);
    println!("\x1b[1m🌍 quakeview\x1b[0m");
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("  Local:   \x1b[96m{url}\x1b[0m");
    println!("  Feed:    {}", args.feed);
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("\x1b[2mPress Ctrl+C to stop\x1b[0m\n");

    // Open browser if requested (using xdg-open/open command)
    if args.open {
        #[cfg(target_os = "linux")]
        let _ = std::process::Command::new("xdg-open").arg(&url).spawn();
        #[cfg(target_os = "macos")]
        let _ = std::process::Command::new("open").arg(&url).spawn();
        #[cfg(target_os = "windows")]
        let _ = std::process::Command::new("cmd").args(["/c", "start", &url]).spawn();
    }

    // Run the async server on tokio runtime
    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(server::run_server(config))
}
