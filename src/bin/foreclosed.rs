use std::iter;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::warn;

use foreclosed_parser::fetch::{load_file, HttpFetcher};
use foreclosed_parser::store::write_record_set;
use foreclosed_parser::{FetchError, RunReport, RunState, Settings, SourceSpec};

#[derive(Parser)]
#[command(name = "foreclosed", about = "Foreclosed property listings from Philippine banks")]
struct Cli {
    /// Settings file (TOML). Defaults to ./foreclosed.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Output directory
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
    /// Replace existing output files instead of picking a new name
    #[arg(long, global = true)]
    overwrite: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured banks
    List,
    /// Fetch bank listings over HTTP
    Scrape {
        /// Bank id (repeatable)
        #[arg(short, long = "bank")]
        banks: Vec<String>,
        /// Every configured bank
        #[arg(long, conflicts_with = "banks")]
        all: bool,
    },
    /// Parse saved HTML pages or decoded PDF tables (.json)
    Parse {
        /// Bank id
        #[arg(short, long)]
        bank: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Default)]
struct Summary {
    banks: usize,
    records: usize,
    duplicates: usize,
    discarded: usize,
    failures: usize,
    unavailable: usize,
    failed_banks: Vec<String>,
}

impl Summary {
    fn add(&mut self, id: &str, report: &RunReport) {
        self.banks += 1;
        self.records += report.records.len();
        self.duplicates += report.duplicates;
        self.discarded += report.discarded;
        self.failures += report.diagnostics.len();
        self.unavailable += report.unavailable.len();
        if report.state == RunState::Failed {
            self.failed_banks.push(id.to_string());
        }
    }

    fn print(&self) {
        println!(
            "Done: {} banks, {} records ({} duplicates, {} discarded, {} failed fragments, {} unavailable documents)",
            self.banks, self.records, self.duplicates, self.discarded, self.failures, self.unavailable
        );
        if !self.failed_banks.is_empty() {
            println!("No data for: {}", self.failed_banks.join(", "));
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    if let Some(output) = cli.output {
        settings.output_dir = output;
    }

    match cli.command {
        Commands::List => {
            for spec in settings.source_specs() {
                let url = spec.pages.as_ref().and_then(|p| p.entry_url()).unwrap_or("-");
                let cap = match spec.max_results(settings.max_results_per_bank) {
                    Some(max) => format!("max {max}"),
                    None => "no cap".to_string(),
                };
                println!("{:<14} {:<11} {:<9} {}", spec.id, spec.locator.kind(), cap, url);
            }
        }
        Commands::Scrape { banks, all } => {
            let specs = if all {
                settings.source_specs()
            } else if banks.is_empty() {
                bail!("pass --bank ID (repeatable) or --all");
            } else {
                selected(&settings, &banks)?
            };

            // Build every pipeline before touching the network
            let pipelines = specs
                .iter()
                .map(|spec| spec.build(settings.max_results_per_bank))
                .collect::<Result<Vec<_>, _>>()?;

            let fetcher = HttpFetcher::new(&settings.user_agent, settings.timeout_secs);
            let mut summary = Summary::default();

            for (spec, pipeline) in specs.iter().zip(&pipelines) {
                println!("Scraping {} ...", spec.name);
                let report = match &spec.pages {
                    Some(pages) => pipeline.run(fetcher.documents(pages)),
                    None => pipeline.run(iter::once(Err(FetchError::NoPages(spec.id.clone())))),
                };
                persist(&settings, &report, cli.overwrite)?;
                summary.add(&spec.id, &report);
            }
            summary.print();
        }
        Commands::Parse { bank, files } => {
            let spec = settings.source(&bank)?;
            let pipeline = spec.build(settings.max_results_per_bank)?;

            let report = pipeline.run(files.iter().map(|path| load_file(path)));
            persist(&settings, &report, cli.overwrite)?;

            let mut summary = Summary::default();
            summary.add(&spec.id, &report);
            summary.print();
        }
    }

    Ok(())
}

/// Requested banks in order, duplicates collapsed. Unknown ids fail up front.
fn selected(settings: &Settings, banks: &[String]) -> anyhow::Result<Vec<SourceSpec>> {
    let mut specs: Vec<SourceSpec> = Vec::new();
    for id in banks {
        if specs.iter().any(|s| &s.id == id) {
            continue;
        }
        specs.push(settings.source(id)?);
    }
    Ok(specs)
}

fn persist(settings: &Settings, report: &RunReport, overwrite: bool) -> anyhow::Result<()> {
    if report.state == RunState::Failed {
        warn!(source = %report.records.name, "nothing to save");
        return Ok(());
    }
    let path = write_record_set(&settings.output_dir, &report.records, overwrite)?;
    println!("Saved {} records to {}", report.records.len(), path.display());
    Ok(())
}
