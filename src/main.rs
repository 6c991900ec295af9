//! MetricGrid - company scorecards as emoji grids
//!
//! A CLI tool that loads a companies × metrics sheet, averages the
//! selected rows and columns, rates every cell, and writes the result
//! as Markdown, JSON or a terminal grid.
//!
//! Exit codes:
//!   0 - Success (or no --fail-below set)
//!   1 - Runtime error (missing source, bad sheet, HTTP failure, etc.)
//!   2 - A selected company averaged below the --fail-below rating

mod analysis;
mod cli;
mod config;
mod models;
mod report;
mod selection;
mod sheet;

use analysis::Dashboard;
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use report::RenderOptions;
use selection::{Selection, SelectionItem};
use sheet::{LoadOptions, Source};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("MetricGrid v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .metricgrid.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the sheet source, selection and report options.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` takes precedence over `-v`/`-q` when set. Logs go to stderr so
/// a report written to stdout stays clean.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().to_string().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete workflow. Returns exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let location = config.source_location().context(
        "No sheet source given. Use --source, --sheet-id, or set [source] in .metricgrid.toml",
    )?;
    let source = Source::parse(&location);

    let load_options = LoadOptions {
        company_column: config.source.company_column.clone(),
        timeout_seconds: config.source.timeout_seconds,
        show_progress: !args.quiet,
    };

    let dataset = sheet::load_dataset(&source, &load_options)
        .await
        .with_context(|| format!("Failed to load sheet from {}", source))?;

    if dataset.is_empty() {
        warn!("Sheet {} has no company rows", source);
    }

    let mut dashboard = Dashboard::new(dataset);

    if !config.selection.companies.is_empty() {
        dashboard
            .selection_mut()
            .restrict_companies(&config.selection.companies)?;
    }
    if !config.selection.metrics.is_empty() {
        dashboard
            .selection_mut()
            .restrict_metrics(&config.selection.metrics)?;
    }
    for name in args.exclude_companies.iter().flatten() {
        if dashboard.selection().is_company_selected(name) {
            dashboard.selection_mut().toggle_company_by_name(name)?;
        } else {
            warn!("Company '{}' is not selected, nothing to exclude", name);
        }
    }
    for name in args.exclude_metrics.iter().flatten() {
        if dashboard.selection().is_metric_selected(name) {
            dashboard.selection_mut().toggle_metric_by_name(name)?;
        } else {
            warn!("Metric '{}' is not selected, nothing to exclude", name);
        }
    }
    dashboard.set_rating_filter(config.selection.rating);

    // Handle --list: show the selection state and exit
    if args.list {
        print_listing(dashboard.selection());
        return Ok(0);
    }

    let detail = args.detail_target();
    let report = report::build_report(
        &mut dashboard,
        &source.to_string(),
        detail.as_ref().map(|(c, m)| (c.as_str(), m.as_str())),
    )?;

    info!(
        "Grid covers {} companies × {} metrics",
        report.metadata.companies_selected, report.metadata.metrics_selected
    );

    let render_options = RenderOptions::from(&config.report);
    let output = match config.general.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, render_options),
        OutputFormat::Text => report::generate_text_report(&report, render_options),
    };

    match config.general.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path))?;

            if !args.quiet {
                println!("\n📊 Scorecard Summary:");
                println!(
                    "   Companies: {} of {}",
                    report.metadata.companies_selected, report.metadata.companies_total
                );
                println!(
                    "   Metrics: {} of {}",
                    report.metadata.metrics_selected, report.metadata.metrics_total
                );
                if let Some(best) = report.ranking.first() {
                    println!(
                        "   Best: {} {} ({:.1})",
                        best.rating.emoji(),
                        best.company,
                        best.average
                    );
                }
                println!("\n✅ Report saved to: {}", path);
            }
        }
        None => print!("{}", output),
    }

    // Check --fail-below threshold
    if let Some(threshold) = args.fail_below {
        let below: Vec<&str> = report
            .ranking
            .iter()
            .filter(|entry| entry.rating < threshold)
            .map(|entry| entry.company.as_str())
            .collect();

        if !below.is_empty() {
            eprintln!(
                "\n⛔ Rated below {}: {}. Failing (exit code 2).",
                threshold,
                below.join(", ")
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Handle --list: print every company and metric with its selection state.
fn print_listing(selection: &Selection) {
    let print_items = |title: &str, items: &[SelectionItem]| {
        let selected = items.iter().filter(|item| item.selected).count();
        println!("{} ({} of {} selected):", title, selected, items.len());
        for item in items {
            let mark = if item.selected { "x" } else { " " };
            println!("  [{}] {}", mark, item.name);
        }
    };

    print_items("Companies", selection.companies());
    println!();
    print_items("Metrics", selection.metrics());
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
