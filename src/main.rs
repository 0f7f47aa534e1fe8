use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, instrument, warn};

use ro_ingest::analysis::{Facets, KindFilter, ProbabilityBand, QuickFilter, RecordFilter, Summary};
use ro_ingest::config::Config;
use ro_ingest::export::{self, ExportFormat};
use ro_ingest::observability::{self, metrics};
use ro_ingest::pipeline::ingestion::load_grid;
use ro_ingest::pipeline::{Dataset, IngestionContext, IngestionPipeline, LogProgress, Session};

#[derive(Parser)]
#[command(name = "ro_ingest")]
#[command(about = "RO sales-opportunity spreadsheet ingestion")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a workbook and print the ingestion report
    Ingest {
        /// Workbook to read (.xlsx or .xls)
        file: PathBuf,
        /// Override the configured batch size
        #[arg(long)]
        batch_size: Option<usize>,
        /// Write the published dataset as JSON into this directory
        #[arg(long)]
        json: Option<PathBuf>,
        /// Write the published dataset as CSV into this directory
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Write the workbook report into this directory
        #[arg(long)]
        xlsx: Option<PathBuf>,
        /// Print sampled row failures
        #[arg(long)]
        details: bool,
        /// Print Prometheus metrics after the run
        #[arg(long)]
        metrics: bool,
    },
    /// Ingest a workbook and print summary metrics for the filtered records
    Summary {
        file: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
        /// Also print facet counts
        #[arg(long)]
        facets: bool,
        /// Write the filtered records as CSV into this directory
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Write the workbook report for the filtered records into this directory
        #[arg(long)]
        xlsx: Option<PathBuf>,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// all, normal or commercial
    #[arg(long, default_value = "all")]
    kind: KindFilter,
    /// Probability band: 90, 60, 30, 10 or 0
    #[arg(long)]
    band: Option<ProbabilityBand>,
    /// Month as YYYY-MM
    #[arg(long)]
    month: Option<String>,
    #[arg(long)]
    country: Option<String>,
    /// Agent name or code
    #[arg(long)]
    agent: Option<String>,
    #[arg(long)]
    outcome: Option<String>,
    /// Earliest date, YYYY-MM-DD
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Latest date, YYYY-MM-DD
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long)]
    min_offer: Option<f64>,
    #[arg(long)]
    max_offer: Option<f64>,
    /// Free-text search
    #[arg(long)]
    search: Option<String>,
    /// Preset replacing every other criterion except --kind: this-month,
    /// last-month, this-quarter, high-value, won, high-probability,
    /// medium-probability, low-probability
    #[arg(long)]
    quick: Option<QuickFilter>,
}

impl FilterArgs {
    fn into_filter(self, dataset: &Dataset) -> RecordFilter {
        match self.quick {
            Some(preset) => {
                let outcomes = Facets::from_records(&dataset.records).outcomes;
                RecordFilter::quick(preset, self.kind, Local::now().date_naive(), &outcomes)
            }
            None => RecordFilter::from(self),
        }
    }
}

impl From<FilterArgs> for RecordFilter {
    fn from(args: FilterArgs) -> Self {
        RecordFilter {
            kind: args.kind,
            band: args.band,
            month: args.month,
            country: args.country,
            agent: args.agent,
            outcome: args.outcome,
            date_from: args.from,
            date_to: args.to,
            min_offer: args.min_offer,
            max_offer: args.max_offer,
            search: args.search,
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load().context("failed to load config")?,
    };
    Ok(config)
}

/// Read and ingest a workbook, publishing the result into `session`
#[instrument(skip_all, fields(file = %file.display()))]
async fn ingest_file(session: &Session, file: &Path, config: &Config) -> anyhow::Result<()> {
    let grid = load_grid(file, config.files.clone())
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let pipeline = IngestionPipeline::with_context(
        IngestionContext::from_config(config),
        Box::new(LogProgress),
    );
    match pipeline.run(&grid).await {
        Ok(outcome) => {
            session.publish(outcome, file.display().to_string());
            Ok(())
        }
        Err(e) => {
            error!("Ingestion failed: {}", e);
            Err(e.into())
        }
    }
}

fn print_summary(summary: &Summary) {
    println!("\n📈 Summary");
    println!("   Total RO: {} ({} normal, {} commercial)", summary.total_ro, summary.normal_count, summary.commercial_count);
    println!("   Offer value: {:.2}", summary.total_offer_value);
    println!("   Contract value: {:.2}", summary.total_contract_value);
    println!("   Won: {} ({:.1}%)", summary.won_count, summary.success_rate);
    println!("   Average offer: {:.2}", summary.avg_offer_value);
    println!("   Value conversion: {:.1}%", summary.conversion_rate);
    println!("   Probability-weighted value: {:.2}", summary.probabilistic_value);
    println!("   Average probability: {:.1}%", summary.avg_probability);

    println!("\n   Probability bands:");
    for (band, count) in &summary.probability_distribution {
        println!("   - {}: {}", band, count);
    }
    if !summary.top_categories.is_empty() {
        println!("\n   Top categories:");
        for c in &summary.top_categories {
            println!("   - {}: {:.2}", c.category, c.value);
        }
    }
    if !summary.monthly_trend.is_empty() {
        println!("\n   Monthly trend:");
        for m in &summary.monthly_trend {
            println!("   - {}: {} RO, {:.2}", m.month, m.count, m.value);
        }
    }
    if !summary.agents.is_empty() {
        println!("\n   Agents:");
        for a in &summary.agents {
            println!(
                "   - {}: {} RO, {:.2} offered, {} won ({:.1}%)",
                a.agent, a.count, a.total_value, a.won_count, a.success_rate
            );
        }
    }
    let quality = &summary.data_quality;
    println!("\n   Data quality: {:.1}% ({})", quality.overall_percent(), quality.grade());
}

fn print_facets(facets: &Facets) {
    println!("\n🔎 Facets");
    let groups = [
        ("Months", &facets.months),
        ("Countries", &facets.countries),
        ("Agents", &facets.agents),
        ("Outcomes", &facets.outcomes),
        ("Categories", &facets.categories),
    ];
    for (label, values) in groups {
        if values.is_empty() {
            continue;
        }
        println!("   {}:", label);
        for v in values {
            println!("   - {} ({})", v.value, v.count);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    observability::init_logging();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    let session = Session::new();

    match cli.command {
        Commands::Ingest { file, batch_size, json, csv, xlsx, details, metrics: show_metrics } => {
            if let Some(size) = batch_size {
                config.ingestion.batch_size = size;
                config.validate()?;
            }
            if show_metrics {
                if let Err(e) = metrics::init() {
                    warn!("Metrics recorder not installed: {}", e);
                }
            }

            println!("🔄 Ingesting {}...", file.display());
            ingest_file(&session, &file, &config).await?;
            let dataset = session.current().context("no dataset published")?;
            let report = &dataset.report;

            println!("\n📊 Ingestion report for {}:", dataset.source);
            for line in report.to_string().lines() {
                println!("   {}", line);
            }

            if report.has_failures() {
                println!("\n⚠️  {} row(s) rejected", report.rejected());
                if details {
                    for failure in &report.failure_samples {
                        println!("   - {}", failure);
                    }
                    if report.unsampled_failures() > 0 {
                        println!("   ... and {} more", report.unsampled_failures());
                    }
                }
            }

            let everything = RecordFilter::new();
            for (dir, format) in [(csv, ExportFormat::Csv), (json, ExportFormat::Json), (xlsx, ExportFormat::Xlsx)] {
                if let Some(dir) = dir {
                    let path = export::export_to_dir(dataset.records.iter(), report, &everything, &dir, format)?;
                    println!("   {:?} written to {}", format, path.display());
                }
            }

            if show_metrics {
                match metrics::render() {
                    Some(text) => println!("\n{}", text),
                    None => warn!("No metrics recorder installed"),
                }
            }
            println!("✅ Ingestion completed");
        }
        Commands::Summary { file, filter, facets, csv, xlsx } => {
            ingest_file(&session, &file, &config).await?;

            let dataset = session.current().context("no dataset published")?;
            let filter = filter.into_filter(&dataset);
            let view = session.filtered(&filter).context("no dataset published")?;
            info!(active_filters = filter.active_count(), matched = view.len(), "Records selected");
            println!(
                "{} of {} record(s) match filters: {}",
                view.len(),
                view.dataset().len(),
                filter
            );

            let records = view.to_records();
            print_summary(&Summary::of(&records));
            if facets {
                print_facets(&Facets::from_records(&records));
            }
            for (dir, format) in [(csv, ExportFormat::Csv), (xlsx, ExportFormat::Xlsx)] {
                if let Some(dir) = dir {
                    let path = export::export_to_dir(&records, &dataset.report, &filter, &dir, format)?;
                    println!("\n   {:?} written to {}", format, path.display());
                }
            }
        }
    }
    Ok(())
}
