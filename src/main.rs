// src/main.rs
//! inertion - runs the framework's self-checks and reports them

use anyhow::Result;
use clap::Parser;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use inertion::reporter::Report;
use inertion::{json_formatter, run, status_of, Config, Palette, ReportOptions, Reporter, Verbosity};

mod selfcheck;

#[derive(Parser)]
#[command(name = "inertion")]
#[command(about = "Run the inertion self-check suite and print a report")]
struct Args {
    /// 0 = failures only, 1 = every test, 2 = every check
    #[arg(long, short = 'v', env = "INERTION_VERBOSITY")]
    verbosity: Option<u8>,

    /// Disable ANSI colors
    #[arg(long, env = "INERTION_NO_COLOR")]
    no_color: bool,

    /// Print a JSON report instead of text
    #[arg(long, env = "INERTION_JSON")]
    json: bool,

    /// Config file (defaults to ./inertion.toml, then ~/.inertion/config.toml)
    #[arg(long, short = 'c', env = "INERTION_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so reports on stdout stay clean
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    // CLI > env > config file > defaults
    let verbosity = match args.verbosity {
        Some(level) => Verbosity::try_from(level)?,
        None => config.verbosity,
    };
    let color = !args.no_color && config.color.unwrap_or_else(|| io::stdout().is_terminal());
    let json = args.json || config.json;
    let options = ReportOptions {
        verbosity,
        ..config.report_options()
    };

    let suite = selfcheck::suite();
    info!(tests = suite.len(), ?verbosity, color, json, "starting self-check");

    let results = run(&suite).await;
    let format = json_formatter();

    if json {
        let report = Report::from_results(&results, &*format);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let mut reporter = Reporter::new(io::stdout().lock(), format, Palette::new(color), options);
        reporter.print_report(&results)?;
    }

    std::process::exit(status_of(&results));
}
