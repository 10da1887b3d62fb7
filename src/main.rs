//! Batch entrypoint: unpacks every XML document in the source directory into
//! the database and prints the per-document report.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use xml_unpack::infra::config::{self, IngestConfig};
use xml_unpack::infra::logging::{init_logging, LogConfig};
use xml_unpack::{BatchCoordinator, BatchError, BatchReport, LocalDirSource, MemorySession, PgSession, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "xml-unpack", about = "Ingest XML documents into relational tables")]
struct Cli {
    /// Directory to read documents from.
    #[arg(long, env = "XML_SOURCE_DIR")]
    source_dir: Option<PathBuf>,

    /// Log statements against an in-memory store instead of the database.
    #[arg(long, env = "XML_DRY_RUN")]
    dry_run: bool,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// Documents to ingest; defaults to everything in the source directory.
    documents: Vec<String>,
}

async fn run_with<Q: Session>(
    config: IngestConfig,
    session: Q,
    documents: &[String],
) -> Result<BatchReport, BatchError> {
    let source = LocalDirSource::new(config.source_dir.clone(), config.extension.clone());
    let mut coordinator = BatchCoordinator::new(config, source, session);
    if documents.is_empty() {
        coordinator.run().await
    } else {
        coordinator.run_batch(documents).await
    }
}

fn print_report(report: &BatchReport, format: ReportFormat) {
    match format {
        ReportFormat::Text => println!("{}", report),
        ReportFormat::Json => match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{}", json),
            Err(e) => error!(error = %e, "cannot serialize report"),
        },
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = IngestConfig::from_env()?;
    if let Some(dir) = cli.source_dir {
        config.source_dir = dir;
    }
    config.dry_run |= cli.dry_run;

    let result = if config.dry_run {
        run_with(config, MemorySession::dry_run(), &cli.documents).await
    } else {
        let session = PgSession::connect(&config::database_url()?, config.max_connections).await?;
        run_with(config, session, &cli.documents).await
    };

    match result {
        Ok(report) => {
            print_report(&report, cli.format);
            Ok(ExitCode::SUCCESS)
        }
        Err(BatchError::DocumentsFailed { failed, report }) => {
            print_report(&report, cli.format);
            error!(failed, "batch finished with failures");
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err.into()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let logging = LogConfig::from_env().and_then(|c| init_logging(&c));
    if let Err(e) = logging {
        eprintln!("> Failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{:#}", e), "batch aborted");
            ExitCode::FAILURE
        }
    }
}
