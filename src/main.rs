//! logbundle - collect system diagnostic logs into a single archive.
//!
//! Gathers the system journal, kernel ring buffer, boot records,
//! package-manager logs, per-application logs, crash dumps, audit trails and
//! user-defined custom sources into one zip for offline diagnosis.
//!
//! Quick start:
//!   logbundle categories                 # what can be collected
//!   logbundle plan system apps           # dry-run the resolution
//!   logbundle export                     # collect everything
//!   logbundle export system kern -o diagnosis.zip

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use comfy_table::Table;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    app_name, build_plan, known_tokens, AppLogEnumerator, CategoryResolver, ExportEvent, Exporter,
    ParseStrategy, TOKEN_RULES,
};
use cli::{Cli, Commands};
use domain::BundleConfig;
use infrastructure::{
    ensure_config_exists, journal_supported, load_config, FsFileLocator, FsTransfer, LogCatalog,
    TomlCatalog, ZipArchiver,
};

fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
fn run(cli: Cli) -> domain::Result<()> {
    ensure_config_exists()?;
    let config = load_config()?;

    match cli.command {
        Commands::Export { categories, output } => {
            cmd_export(&config, categories, output)?;
        }
        Commands::Categories => {
            cmd_categories();
        }
        Commands::Plan { categories, json } => {
            cmd_plan(&config, categories, json)?;
        }
        Commands::Apps => {
            cmd_apps(&config);
        }
    }

    Ok(())
}

/// Run a full export with live progress.
fn cmd_export(
    config: &BundleConfig,
    categories: Vec<String>,
    output: Option<PathBuf>,
) -> domain::Result<()> {
    let tokens = if categories.is_empty() {
        known_tokens()
    } else {
        categories
    };
    let output = output.unwrap_or_else(default_output_name);

    let exporter = Exporter::new(
        Arc::new(FsFileLocator::new()),
        Arc::new(TomlCatalog::new(config.clone())),
        Arc::new(FsTransfer::new()),
        Arc::new(ZipArchiver::new()),
        config.staging_dir(),
        journal_supported(),
    );

    println!(
        "Collecting {} categories into {}",
        tokens.len(),
        output.display()
    );

    let handle = exporter.start(tokens, output.clone());

    let mut total = 0usize;
    let mut success = false;
    for event in handle.events() {
        match event {
            ExportEvent::TotalItems(t) => total = t,
            ExportEvent::Progress(current) => {
                if total > 0 {
                    print!("\r  {current}/{total}");
                    let _ = std::io::Write::flush(&mut std::io::stdout());
                }
            }
            ExportEvent::Finished(ok) => {
                success = ok;
                break;
            }
        }
    }
    println!();
    let _ = handle.wait();

    if success {
        println!(
            "{} Exported logs to {}",
            "✓".green().bold(),
            output.display()
        );
        Ok(())
    } else {
        eprintln!("{} Export failed (run with -v for details)", "✗".red().bold());
        std::process::exit(1);
    }
}

/// List the routing table.
fn cmd_categories() {
    let mut table = Table::new();
    table.set_header(vec!["Token", "Category", "Acquisition"]);
    for rule in TOKEN_RULES {
        table.add_row(vec![rule.pattern, rule.category, rule.kind.describe()]);
    }
    println!("{table}");
}

/// Resolve categories without exporting.
fn cmd_plan(config: &BundleConfig, categories: Vec<String>, json: bool) -> domain::Result<()> {
    let tokens = if categories.is_empty() {
        known_tokens()
    } else {
        categories
    };

    let locator = FsFileLocator::new();
    let catalog = TomlCatalog::new(config.clone());
    let resolver = CategoryResolver::new(&locator, &catalog, journal_supported());

    let plan = build_plan(&resolver, &tokens, &AtomicBool::new(false)).map_err(|e| {
        domain::AppError::Config {
            message: e.to_string(),
        }
    })?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&plan).map_err(|e| domain::AppError::Config {
                message: format!("Failed to serialize plan: {e}"),
            })?;
        println!("{rendered}");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Token", "Category", "Commands", "Files", "Groups", "Items"]);
    for (token, bucket) in tokens.iter().zip(&plan.buckets) {
        table.add_row(vec![
            token.clone(),
            bucket.category.clone(),
            bucket.commands.len().to_string(),
            bucket.files.len().to_string(),
            bucket.groups.len().to_string(),
            bucket.item_count().to_string(),
        ]);
    }
    println!("{table}");
    println!("Total items: {}", plan.item_count());

    Ok(())
}

/// List configured applications and their parse strategy.
fn cmd_apps(config: &BundleConfig) {
    let locator = FsFileLocator::new();
    let catalog = TomlCatalog::new(config.clone());
    let enumerator = AppLogEnumerator::new(&catalog, &locator, journal_supported());

    let mut table = Table::new();
    table.set_header(vec!["Application", "Binary", "Strategy"]);
    for (display_key, binary) in catalog.applications() {
        let app_config = catalog.app_config(&app_name(&binary));
        let strategy = match enumerator.parse_strategy(app_config.as_ref()) {
            ParseStrategy::File => "file",
            ParseStrategy::Journal => "journal",
        };
        table.add_row(vec![
            display_key,
            binary.display().to_string(),
            strategy.to_string(),
        ]);
    }
    println!("{table}");
}

/// Timestamped default archive name in the current directory.
fn default_output_name() -> PathBuf {
    PathBuf::from(format!(
        "logbundle-{}.zip",
        Utc::now().format("%Y%m%d-%H%M%S")
    ))
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
