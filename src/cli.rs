//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use clap::{Parser, Subcommand};

use crate::client::{Feed, USGS_BASE_URL};
use crate::output::Format;

/// Live earthquake map served from a single binary.
#[derive(Parser, Debug)]
#[command(name = "quakeview")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the interactive earthquake map
    Serve(ServeArgs),

    /// Fetch the feed once and print it
    Snapshot(SnapshotArgs),
}

/// Arguments for the `serve` command.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, short = 'p', default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Summary feed to show
    #[arg(long, default_value = "all_day", value_parser = parse_feed)]
    pub feed: Feed,

    /// Feed host
    #[arg(long, default_value = USGS_BASE_URL, hide = true)]
    pub base_url: String,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,
}

/// Arguments for the `snapshot` command.
#[derive(Parser, Debug)]
pub struct SnapshotArgs {
    /// Summary feed to fetch
    #[arg(long, default_value = "all_day", value_parser = parse_feed)]
    pub feed: Feed,

    /// Maximum number of events to print
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Parse a feed from string.
fn parse_feed(s: &str) -> Result<Feed, String> {
    s.parse()
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["quakeview", "serve"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, 8080);
        assert_eq!(args.host, "127.0.0.1");
        assert_eq!(args.feed, Feed::default());
        assert_eq!(args.base_url, USGS_BASE_URL);
        assert!(!args.open);
    }

    #[test]
    fn test_snapshot_args() {
        let cli = Cli::try_parse_from([
            "quakeview", "--quiet", "snapshot", "--feed", "4.5_week", "-f", "ndjson", "-n", "5",
        ])
        .unwrap();
        assert!(cli.quiet);
        let Command::Snapshot(args) = cli.command else {
            panic!("expected snapshot");
        };
        assert_eq!(args.feed.to_string(), "4.5_week");
        assert_eq!(args.format, Format::Ndjson);
        assert_eq!(args.limit, 5);
    }

    #[test]
    fn test_rejects_unknown_feed() {
        assert!(Cli::try_parse_from(["quakeview", "serve", "--feed", "all_year"]).is_err());
    }
}
