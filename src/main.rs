mod config;
mod diagnostics;
mod error;
mod index;
mod overrides;
mod paths;
mod report;
mod resolver;
mod rewriter;
mod runner;
mod scanner;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};

use crate::config::Config;
use crate::overrides::OverrideTable;
use crate::report::ReportFormat;
use crate::rewriter::RewriteOptions;
use crate::runner::RunOptions;
use crate::types::{OutputMode, WikilinkStyle};

#[derive(Parser)]
#[command(
    name = "linkfix",
    version,
    about = "Resolve, repair, and convert markdown and wikilink cross-references across a document tree"
)]
struct Cli {
    /// Append a removal note after links stripped by the override table.
    #[arg(long)]
    annotate_removed: bool,
    /// Warn about `#anchor` links that match no heading in the same document.
    #[arg(long)]
    check_anchors: bool,
    /// Report what would change without writing any file.
    #[arg(long)]
    dry_run: bool,
    /// Summary output format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,
    /// Notation to emit for resolved links [default: from .linkfix.toml, else markdown].
    #[arg(long, value_enum)]
    mode: Option<OutputMode>,
    /// Override table (TOML with [rewrite] and [removed] tables).
    #[arg(long)]
    overrides: Option<PathBuf>,
    /// Directory holding the documents.
    root: PathBuf,
    /// More log output (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// How wikilink targets are spelled in wikilink mode [default: relative].
    #[arg(long, value_enum)]
    wikilink_style: Option<WikilinkStyle>,
}

/// Load config and overrides, run the batch, and render the summary.
///
/// # Errors
///
/// Returns fatal errors only: missing root, bad config or override table,
/// traversal failure, or summary serialization failure.
fn execute(cli: &Cli) -> Result<String, error::Error> {
    if !cli.root.is_dir() {
        return Err(error::Error::RootNotFound { path: cli.root.clone() });
    }

    let config = Config::load(&cli.root)?;
    let overrides = load_overrides(cli, &config)?;
    let options = RunOptions {
        check_anchors: cli.check_anchors || config.check_anchors,
        dry_run: cli.dry_run,
        rewrite: RewriteOptions {
            annotate_removed: cli.annotate_removed || config.annotate_removed,
            mode: cli.mode.unwrap_or(config.mode),
            wikilink_style: cli.wikilink_style.unwrap_or(config.wikilink_style),
        },
    };
    tracing::info!(
        root = %cli.root.display(),
        mode = ?options.rewrite.mode,
        overrides = overrides.len(),
        dry_run = options.dry_run,
        "starting"
    );

    let summary = runner::run(&cli.root, &config, &overrides, &options)?;
    report::render(&summary, cli.format)
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_err| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .init();
}

/// The override table named on the command line, else in config, else empty.
/// A command-line path is taken as given; a config path is relative to the root.
///
/// # Errors
///
/// Returns errors from reading or parsing the override file.
fn load_overrides(cli: &Cli, config: &Config) -> Result<OverrideTable, error::Error> {
    let path = match (&cli.overrides, &config.overrides) {
        (Some(path), _) => path.clone(),
        (None, Some(path)) => cli.root.join(path),
        (None, None) => return Ok(OverrideTable::default()),
    };
    OverrideTable::load(&path)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(&cli) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        },
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
    }
}
