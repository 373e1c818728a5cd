//! CLI command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use crate::config::{Config, RunConfig};
use crate::crawler::CrawlError;
use crate::runner::{read_queries, QueryRunner, RunSummary};
use crate::scrapers::MapSession;
use crate::storage::CsvSink;

#[derive(Parser, Debug)]
#[command(name = "bizcrawl")]
#[command(about = "Collect business listings from map search results")]
#[command(version)]
pub struct Cli {
    /// Text file with one search query per line
    #[arg(short, long)]
    pub queries: PathBuf,

    /// CSV file to append results to
    #[arg(short, long, default_value = "output.csv")]
    pub output: PathBuf,

    /// Enable debug logging
    #[arg(short, long, visible_alias = "verbose")]
    pub debug: bool,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Site/selector/timing config file (default: discovered bizcrawl.toml)
    #[arg(short, long, env = "BIZCRAWL_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Check if debug mode is enabled (for early logging setup).
pub fn is_debug() -> bool {
    std::env::args().any(|arg| arg == "-d" || arg == "--debug" || arg == "--verbose")
}

/// Parse arguments, load configuration and run every query.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref()).await?;
    let run_config = RunConfig::new(cli.queries, cli.output, cli.debug, cli.headless, config);
    execute(run_config).await
}

async fn execute(run: RunConfig) -> Result<()> {
    let queries = read_queries(&run.queries_path).with_context(|| {
        format!(
            "Failed to read queries from {}",
            run.queries_path.display()
        )
    })?;

    if queries.is_empty() {
        println!(
            "{} No queries in {}",
            style("!").yellow(),
            run.queries_path.display()
        );
        return Ok(());
    }

    if run.debug {
        match &run.config.source_path {
            Some(path) => println!("{} Config: {}", style("→").dim(), path.display()),
            None => println!("{} Config: built-in defaults", style("→").dim()),
        }
    }
    println!(
        "{} {} queries → {}{}",
        style("→").cyan(),
        queries.len(),
        run.output_path.display(),
        if run.headless { " (headless)" } else { "" }
    );

    let mut sink = CsvSink::open(&run.output_path)
        .with_context(|| format!("Failed to open {}", run.output_path.display()))?;
    let mut session = open_session(&run.config).await?;

    let runner = QueryRunner::new(&run.config);
    let result = runner.run(session.as_mut(), &queries, &mut sink).await;
    session.close().await;

    match result {
        Ok(summary) => {
            print_summary(&summary, &run);
            Ok(())
        }
        Err(aborted) => {
            print_summary(&aborted.summary, &run);
            println!(
                "{} Stopped at '{}': {}",
                style("✗").red(),
                aborted.query,
                aborted.source
            );
            if matches!(aborted.source, CrawlError::ListUnavailable(_)) {
                println!(
                    "  {} A search with no results also ends the run; remove '{}' and rerun",
                    style("!").yellow(),
                    aborted.query
                );
            }
            Err(aborted.into())
        }
    }
}

#[cfg(feature = "browser")]
async fn open_session(config: &Config) -> Result<Box<dyn MapSession>> {
    let session = crate::scrapers::ChromeSession::launch(config)
        .await
        .context("Failed to start browser session")?;
    Ok(Box::new(session))
}

#[cfg(not(feature = "browser"))]
async fn open_session(_config: &Config) -> Result<Box<dyn MapSession>> {
    Err(anyhow::anyhow!(
        "Browser support not compiled. Rebuild with: cargo build --features browser"
    ))
}

fn print_summary(summary: &RunSummary, run: &RunConfig) {
    println!();
    println!(
        "{} {} records from {}/{} queries",
        style("✓").green(),
        summary.records_written,
        summary.queries_completed,
        summary.queries_attempted
    );
    if summary.queries_skipped > 0 {
        println!(
            "  {} {} queries skipped (search failed)",
            style("!").yellow(),
            summary.queries_skipped
        );
    }
    if summary.entries_failed > 0 {
        println!(
            "  {} {} entries could not be opened or read",
            style("!").yellow(),
            summary.entries_failed
        );
    }
    println!(
        "  {} {} of {} crawls reached the end of the list",
        style("→").dim(),
        summary.reached_end,
        summary.queries_completed
    );
    println!(
        "  {} Output: {}",
        style("→").dim(),
        run.output_path.display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_flags_and_defaults() {
        let cli = Cli::try_parse_from(["bizcrawl", "--queries", "q.txt", "--verbose", "--headless"])
            .unwrap();
        assert_eq!(cli.queries, PathBuf::from("q.txt"));
        assert_eq!(cli.output, PathBuf::from("output.csv"));
        assert!(cli.debug);
        assert!(cli.headless);

        assert!(Cli::try_parse_from(["bizcrawl"]).is_err());
    }
}
