// Thu Oct 15 2026 - Alex

use anyhow::{bail, Context};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use voice_offset_finder::{
    catalog::{Catalog, SignatureDef},
    config::Config,
    engine::{AnalysisService, CancelToken, Engine},
    history,
    output::{AnalysisResult, ReportFormat, ReportGenerator},
    server,
    utils::{format_duration, format_size, LoggingUtils},
};

#[derive(Parser, Debug)]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Locates known functions in Discord voice .node modules", long_about = None)]
struct Cli {
    /// JSON config file; OFFSET_FINDER_* variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a module and print the offsets found
    Analyze {
        file: PathBuf,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Also write the offset.txt report here
        #[arg(long)]
        report_out: Option<PathBuf>,

        #[arg(long)]
        no_progress: bool,
    },
    /// Run the HTTP API
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,
    },
    /// List the signatures in the active catalog
    Catalog {
        #[arg(long)]
        json: bool,
    },
    /// Show recorded analyses, newest first
    History,
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "[!]".red(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let level = match (&cli.command, cli.verbose) {
        (_, v) if v > 0 => LoggingUtils::level_from_verbosity(v),
        (Command::Serve { .. }, _) => LoggingUtils::level_from_str(&config.log_level),
        _ => LoggingUtils::level_from_verbosity(0),
    };
    LoggingUtils::init_logger(level);

    match cli.command {
        Command::Analyze { file, json, report_out, no_progress } => {
            analyze(&config, &file, json, report_out.as_deref(), !no_progress && !json)
        }
        Command::Serve { port, host } => {
            if let Some(port) = port {
                config = config.with_port(port);
            }
            if let Some(host) = host {
                config.host = host;
            }
            serve(config)
        }
        Command::Catalog { json } => list_catalog(&config, json),
        Command::History => show_history(&config),
    }
}

fn analyze(config: &Config, file: &Path, json: bool, report_out: Option<&Path>, progress: bool) -> anyhow::Result<()> {
    let start_time = Instant::now();

    let data = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let filename = file.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .context("Input path has no file name")?;

    let spinner = progress.then(|| {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Scanning {} ({})", filename, format_size(data.len())));
        pb
    });

    let catalog = Arc::new(Catalog::load(config.catalog_path.as_deref())?);
    let engine = Arc::new(Engine::new(catalog, config.engine_options())?);
    let history = history::open_store(config.history_path.as_deref())?;
    let service = AnalysisService::new(engine, history)
        .with_limits(config.upload_limits())
        .with_report_dir(config.report_dir.clone());

    let outcome = service.submit(Some(&filename), Bytes::from(data), &CancelToken::new());

    if let Some(pb) = &spinner {
        pb.finish_and_clear();
    }
    let outcome = outcome?;

    if let Some(path) = report_out {
        ReportGenerator::new(ReportFormat::Text)
            .write_to_file(&outcome.result, path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    if json {
        println!("{}", ReportGenerator::new(ReportFormat::Json).generate(&outcome.result));
        return Ok(());
    }

    print_result(&outcome.result);
    println!("{} Finished in {}", "[+]".green(), format_duration(start_time.elapsed()));
    if let Some(path) = report_out {
        println!("{} Report saved to: {}", "[+]".green(), path.display());
    }

    Ok(())
}

fn print_result(result: &AnalysisResult) {
    println!("{}", "Discord Voice Node Offset Finder".cyan().bold());
    println!("{}", "=".repeat(50).cyan());
    println!("  File: {} ({})", result.filename, result.image_format.as_str());
    println!("  Catalog: {}", result.catalog_version);
    println!(
        "  Functions found: {}/{} ({:.1}%)",
        result.functions_found.to_string().green(),
        result.total_functions,
        result.success_rate
    );
    println!("  High confidence: {}", result.high_confidence_matches.to_string().green());
    println!();

    for outcome in result.per_function.values() {
        match (outcome.offset, &outcome.section, outcome.tier) {
            (Some(offset), Some(section), Some(tier)) => {
                let confidence = format!("{:.0}% {}", outcome.confidence * 100.0, tier);
                let confidence = match tier {
                    voice_offset_finder::ConfidenceTier::High => confidence.green(),
                    voice_offset_finder::ConfidenceTier::Medium => confidence.yellow(),
                    voice_offset_finder::ConfidenceTier::Low => confidence.red(),
                };
                println!("  {} 0x{:08X} [{}] {}", outcome.name.cyan(), offset, section, confidence);
            }
            _ => println!("  {} {}", outcome.name.cyan(), "not found".dimmed()),
        }
    }
    println!();

    if result.is_degraded() {
        println!("{} No signatures matched; the module may be a different build", "[!]".yellow());
    }
}

fn serve(config: Config) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(server::run_server(config))
}

fn list_catalog(config: &Config, json: bool) -> anyhow::Result<()> {
    let catalog = Catalog::load(config.catalog_path.as_deref())?;
    let defs: Vec<SignatureDef> = catalog.all_signatures().iter().map(SignatureDef::from).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&defs)?);
        return Ok(());
    }

    println!("{} {} ({} signatures)", "Catalog".cyan().bold(), catalog.version(), catalog.count());
    for def in &defs {
        println!("  {} {}", def.name.cyan(), def.id.dimmed());
        println!("    {}", def.pattern);
    }
    Ok(())
}

fn show_history(config: &Config) -> anyhow::Result<()> {
    let Some(path) = config.history_path.as_deref() else {
        bail!("No history file configured; set history_path or OFFSET_FINDER_HISTORY");
    };

    let store = history::open_store(Some(path))?;
    let records = store.list();
    if records.is_empty() {
        println!("{} No analyses recorded in {}", "[*]".blue(), path.display());
        return Ok(());
    }

    let by_file = records.iter().counts_by(|r| r.filename.as_str());
    println!(
        "{} {} analyses of {} files",
        "[*]".blue(),
        records.len(),
        by_file.len()
    );
    for record in &records {
        println!(
            "  {} {} {}/{} {}",
            record.analysis_timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.filename.cyan(),
            record.functions_found,
            record.total_functions,
            record.id.to_string().dimmed()
        );
    }
    Ok(())
}
