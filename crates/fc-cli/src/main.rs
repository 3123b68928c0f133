//! CLI entry point for the fscrawl file repository crawler.
//!
//! # Usage
//!
//! ```bash
//! fscrawl [OPTIONS] <COMMAND>
//!
//! # Crawl on the configured schedule until Ctrl-C, documents to stdout
//! fscrawl --config crawl.json run
//!
//! # One due tick over two ad-hoc roots, documents to a file
//! fscrawl run --start-path /srv/docs --start-path /mnt/share --once --output docs.jsonl
//!
//! # Validate configuration and show the normalized roots
//! fscrawl --config crawl.json check
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{WrapErr, eyre};
use fc_core::Config;
use fc_crawler::{CrawlScheduler, DocumentSink, JsonLinesSink, TraversalPolicy, WindowedSchedule};
use fc_walker::{FileFilter, FileSystemRegistry};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Crawls file repositories on a schedule and emits one JSON document per file.
#[derive(Parser)]
#[command(name = "fscrawl", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file.
    ///
    /// Every field is optional; missing fields take their defaults.
    #[arg(short, long, global = true, env = "FSCRAWL_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run the crawl scheduler until interrupted.
    Run {
        /// Root to crawl; replaces the configured start paths. Repeatable.
        #[arg(short, long = "start-path", value_name = "PATH")]
        start_paths: Vec<String>,

        /// Number of roots crawled concurrently.
        #[arg(short, long, env = "FSCRAWL_THREADS")]
        threads: Option<usize>,

        /// Run a single due tick, then exit.
        #[arg(long)]
        once: bool,

        /// Output file for documents (defaults to stdout).
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },

    /// Validate configuration and print the normalized roots.
    Check,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects `RUST_LOG` if set; otherwise `debug` with `--verbose` and `info`
/// by default. Logs go to stderr so stdout stays clean for documents.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},ignore=warn,globset=warn"))
    });

    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Loads the configuration file, or the defaults if none was given.
fn load_config(path: Option<&Utf8Path>) -> color_eyre::Result<Config> {
    match path {
        Some(path) => Config::load(path).wrap_err_with(|| format!("Failed to load {path}")),
        None => Ok(Config::default()),
    }
}

/// Applies `run` flags on top of the loaded configuration.
fn apply_overrides(config: &mut Config, start_paths: &[String], threads: Option<usize>) {
    if !start_paths.is_empty() {
        config.crawl.start_paths = start_paths.to_vec();
    }
    if let Some(threads) = threads {
        config.crawl.thread_count = threads;
    }
}

/// Builds the scheduler described by a validated configuration.
fn build_scheduler(
    config: &Config,
    sink: Arc<dyn DocumentSink>,
) -> color_eyre::Result<CrawlScheduler> {
    let roots = config.root_specs()?;
    let filter = FileFilter::from_config(&config.filter).wrap_err("Invalid filter patterns")?;
    let schedule = WindowedSchedule::from_config(&config.schedule)?;

    Ok(CrawlScheduler::builder(roots, sink)
        .filter(Arc::new(filter))
        .policy(TraversalPolicy::from_config(&config.crawl))
        .schedule(Arc::new(schedule))
        .thread_count(config.crawl.thread_count)
        .error_delay(config.crawl.error_delay())
        .build())
}

/// Opens the document sink: a buffered file, or stdout.
fn open_sink(output: Option<&Utf8Path>) -> color_eyre::Result<Arc<dyn DocumentSink>> {
    let sink: Arc<dyn DocumentSink> = match output {
        Some(path) => {
            let file = File::create(path).wrap_err_with(|| format!("Failed to create {path}"))?;
            Arc::new(JsonLinesSink::new(BufWriter::new(file)))
        }
        None => Arc::new(JsonLinesSink::new(std::io::stdout())),
    };
    Ok(sink)
}

/// Resolves when Ctrl-C (or SIGTERM on Unix) arrives.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            warn!(error = %e, "Failed to listen for Ctrl-C");
                            sigterm.recv().await;
                        }
                    }
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Runs the scheduler on a blocking thread until it stops or a signal
/// arrives.
async fn run_crawl(config: Config, once: bool, output: Option<Utf8PathBuf>) -> color_eyre::Result<()> {
    config.validate()?;
    let sink = open_sink(output.as_deref())?;
    let scheduler = Arc::new(build_scheduler(&config, sink)?);

    info!(
        roots = scheduler.root_count(),
        threads = config.crawl.thread_count,
        once,
        "Starting crawl"
    );

    let mut control = tokio::task::spawn_blocking({
        let scheduler = Arc::clone(&scheduler);
        move || {
            if once {
                scheduler.run_once().map(drop)
            } else {
                scheduler.start()
            }
        }
    });

    let joined = tokio::select! {
        joined = &mut control => joined,
        () = shutdown_signal() => {
            info!("Received shutdown signal");
            scheduler.shutdown();
            control.await
        }
    };
    joined.wrap_err("Scheduler thread panicked")??;

    let status = scheduler.status();
    info!(
        batches = status.batches_started,
        failed = status.batches_failed,
        documents = status.walk.surfaced,
        errors = status.walk.errors(),
        "Crawl finished"
    );
    Ok(())
}

/// Validates configuration and prints a JSON summary to stdout.
fn run_check(config: &Config) -> color_eyre::Result<()> {
    #[derive(Serialize)]
    struct RootReport<'a> {
        path: &'a str,
        file_system: Option<&'a str>,
    }

    #[derive(Serialize)]
    struct CheckReport<'a> {
        roots: Vec<RootReport<'a>>,
        thread_count: usize,
        full_traversal_interval_secs: Option<u64>,
        schedule_windows: Vec<String>,
        schedule_disabled: bool,
    }

    config.validate()?;
    FileFilter::from_config(&config.filter).wrap_err("Invalid filter patterns")?;

    let roots = FileSystemRegistry::default().identify(config.root_specs()?);
    let windows = config.schedule.hour_windows()?;
    let report = CheckReport {
        roots: roots
            .iter()
            .map(|root| RootReport {
                path: root.path(),
                file_system: root.file_system(),
            })
            .collect(),
        thread_count: config.crawl.thread_count,
        full_traversal_interval_secs: config.crawl.full_traversal_interval().map(|d| d.as_secs()),
        schedule_windows: windows.iter().map(ToString::to_string).collect(),
        schedule_disabled: config.schedule.disabled,
    };

    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| eyre!("Failed to serialize report: {e}"))?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{json}")?;

    for root in &roots {
        if root.file_system().is_none() {
            warn!(root = %root, "No filesystem type handles this root");
        }
    }
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.no_color);

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            start_paths,
            threads,
            once,
            output,
        } => {
            apply_overrides(&mut config, &start_paths, threads);
            run_crawl(config, once, output).await
        }
        Commands::Check => run_check(&config),
    }
}
