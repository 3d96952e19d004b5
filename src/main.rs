//! CLI entry point for the California school report builder.
//!
//! `build` writes one report bundle for a district or school; `batch` builds
//! several independent reports in parallel.

use anyhow::{bail, Context, Result};
use ca_school_report::config::{Overrides, ReportConfig};
use ca_school_report::data::{EntityQuery, EntityType};
use ca_school_report::report::ReportBuilder;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ca_school_report")]
#[command(about = "Enrollment, CAASPP ELA and ELPAC reports for California districts and schools", long_about = None)]
struct Cli {
    /// JSON config file; omitted fields keep their defaults
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the research files
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Directory report bundles are written to
    #[arg(long, global = true, value_name = "DIR")]
    reports_dir: Option<PathBuf>,

    /// Write summary.json only, without chart images
    #[arg(long, global = true, default_value_t = false)]
    no_charts: bool,

    /// Leave charter schools out of enrollment figures
    #[arg(long, global = true, default_value_t = false)]
    exclude_charters: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the report for one district or school
    Build {
        /// "district" or "school"
        #[arg(value_parser = parse_entity_type)]
        entity_type: EntityType,

        /// Entity name; several words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,

        /// Open the report folder when done
        #[arg(long, default_value_t = false)]
        open: bool,
    },
    /// Build one report per name, in parallel
    Batch {
        /// "district" or "school"
        #[arg(value_parser = parse_entity_type)]
        entity_type: EntityType,

        /// Entity names, one argument each
        #[arg(required = true, num_args = 1..)]
        names: Vec<String>,
    },
}

fn parse_entity_type(raw: &str) -> Result<EntityType, String> {
    raw.parse().map_err(|e: ca_school_report::DataError| e.to_string())
}

fn load_config(cli: &Cli) -> Result<ReportConfig> {
    let config = match &cli.config {
        Some(path) => ReportConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ReportConfig::default(),
    };

    let flags = Overrides {
        data_dir: cli.data_dir.clone(),
        reports_dir: cli.reports_dir.clone(),
        exclude_charters: cli.exclude_charters,
        no_charts: cli.no_charts,
    };
    Ok(config.apply_overrides(&[Overrides::from_env(), flags]))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!(
        data_dir = %config.data_dir.display(),
        reports_dir = %config.reports_dir.display(),
        include_charters = config.include_charters,
        "Configuration loaded"
    );
    let builder = ReportBuilder::new(config);

    match cli.command {
        Commands::Build {
            entity_type,
            name,
            open,
        } => {
            let query = EntityQuery::new(entity_type, name.join(" "));
            let output = builder
                .generate(&query)
                .with_context(|| format!("failed to build report for {query}"))?;

            println!("{}", output.dir.display());
            if open {
                open::that(&output.dir)
                    .with_context(|| format!("failed to open {}", output.dir.display()))?;
            }
        }
        Commands::Batch { entity_type, names } => {
            let queries: Vec<EntityQuery> = names
                .into_iter()
                .map(|name| EntityQuery::new(entity_type, name))
                .collect();

            let results = builder.build_many(&queries);
            let mut failed = 0usize;
            for (query, result) in &results {
                match result {
                    Ok(output) => println!("{}", output.dir.display()),
                    Err(e) => {
                        failed += 1;
                        error!(entity = %query, error = %e, "Report failed");
                    }
                }
            }

            info!(built = results.len() - failed, failed, "Batch finished");
            if failed > 0 {
                bail!("{failed} of {} reports failed", results.len());
            }
        }
    }

    Ok(())
}
