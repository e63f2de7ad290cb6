//! Run command - process every PDF in the input folder.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Args;
use console::style;
use futures_util::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

use intake_core::acquire::{AcquireError, TextAcquirer};
use intake_core::history::HistoryCorpus;
use intake_core::invoice::{DuplicateKeys, DuplicateVerdict};
use intake_core::models::record::ExtractedRecord;
use intake_core::pipeline::{
    IntakePipeline, RunSummary, detect_duplicates, list_documents, validate_all,
};
use intake_core::store::{RecordStore, write_report};
use intake_core::timestamp::Clock;

use super::{load_config, load_extractor, load_validator, start_engine};

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Number of documents processed at once
    #[arg(short = 'j', long, default_value = "1")]
    jobs: usize,

    /// Also write a per-document summary CSV to the output folder
    #[arg(long)]
    summary: bool,
}

/// What happened to one input document.
enum Outcome {
    Record(ExtractedRecord),
    Failed(String),
    Fatal(AcquireError),
}

struct DocumentResult {
    path: PathBuf,
    outcome: Outcome,
    processing_time_ms: u64,
}

/// Row of the optional summary CSV.
struct SummaryRow {
    path: PathBuf,
    record: Option<usize>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: RunArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    // Configuration problems stop the run before any document is touched
    let config = load_config(config_path)?;
    let document_type = config.paths.document_type.clone();
    let (extractor, store_filename) = load_extractor(&config)?;
    let validator = load_validator(&config, &document_type)?;
    let clock = Clock::with_offset_hours(config.output.utc_offset_hours)?;
    let (engine, _) = start_engine(&config)?;

    let files = list_documents(&config.paths.pdf_dir)
        .with_context(|| format!("cannot list {}", config.paths.pdf_dir.display()))?;
    if files.is_empty() {
        println!(
            "{} No documents found in {}",
            style("ℹ").blue(),
            config.paths.pdf_dir.display()
        );
        return Ok(());
    }

    println!(
        "{} Found {} documents to process",
        style("ℹ").blue(),
        files.len()
    );

    let pipeline = Arc::new(IntakePipeline::new(
        TextAcquirer::new(engine, &config.pdf),
        extractor,
        clock,
    ));

    let pb = progress_bar(files.len() as u64);
    let timeout_secs = config.pdf.document_timeout_secs;
    let mut outcomes = stream::iter(files.clone())
        .map(|path| process_with_timeout(pipeline.clone(), path, timeout_secs))
        .buffered(args.jobs.max(1));

    let mut records = Vec::new();
    let mut rows = Vec::with_capacity(files.len());
    let mut unprocessed = 0;

    while let Some(result) = outcomes.next().await {
        pb.inc(1);
        match result.outcome {
            Outcome::Record(record) => {
                rows.push(SummaryRow {
                    path: result.path,
                    record: Some(records.len()),
                    error: None,
                    processing_time_ms: result.processing_time_ms,
                });
                records.push(record);
            }
            Outcome::Failed(reason) => {
                warn!("Skipping {}: {}", result.path.display(), reason);
                unprocessed += 1;
                rows.push(SummaryRow {
                    path: result.path,
                    record: None,
                    error: Some(reason),
                    processing_time_ms: result.processing_time_ms,
                });
            }
            Outcome::Fatal(e) => {
                pb.abandon();
                error!("Recognition backend failed on {}: {}", result.path.display(), e);
                return Err(anyhow::Error::new(e).context("recognition backend failed, run aborted"));
            }
        }
    }
    pb.finish_and_clear();

    // Extracted records
    let store_path = config.paths.output_dir.join(&store_filename);
    let mut store = RecordStore::new(&document_type, clock.now(), records);
    store.save(&store_path)?;

    // Validation, written back into the store
    validate_all(&validator, &mut store.documents);
    store.save(&store_path)?;

    // Duplicate detection against a fresh scan of the history folder
    let corpus = HistoryCorpus::load(&config.paths.history_dir, &document_type)?;
    let (verdicts, report) = detect_duplicates(
        &corpus,
        DuplicateKeys::from(&config.duplicates),
        &store.documents,
        &clock,
        &store_path,
    );
    let report_path = config.report_path();
    write_report(&report_path, &report)?;

    let mut summary = RunSummary {
        total_documents: files.len(),
        unprocessed,
        ..Default::default()
    };
    summary.record_validation(&store.documents);
    summary.record_verdicts(&verdicts);

    if args.summary {
        let summary_path = config.paths.output_dir.join("summary.csv");
        write_summary(&summary_path, &rows, &store.documents, &verdicts, &config)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    print_summary(&summary, &store_path, &report_path, start.elapsed());

    let failed: Vec<_> = rows.iter().filter(|r| r.error.is_some()).collect();
    if !failed.is_empty() {
        println!();
        println!("{}", style("Unprocessed documents:").red());
        for row in failed {
            println!(
                "  - {}: {}",
                row.path.display(),
                row.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Acquire and extract one document on the blocking pool, bounded by a timeout.
async fn process_with_timeout(
    pipeline: Arc<IntakePipeline>,
    path: PathBuf,
    timeout_secs: u64,
) -> DocumentResult {
    let start = Instant::now();
    // Recognition children are killed at the deadline so an abandoned task still ends.
    let deadline = (timeout_secs > 0).then(|| start + Duration::from_secs(timeout_secs));
    let timed_out = || format!("timed out after {}s", timeout_secs);
    let task_path = path.clone();
    let task =
        tokio::task::spawn_blocking(move || pipeline.process_document(&task_path, deadline));

    let joined = if timeout_secs == 0 {
        task.await
    } else {
        match tokio::time::timeout(Duration::from_secs(timeout_secs), task).await {
            Ok(joined) => joined,
            Err(_) => {
                return DocumentResult {
                    path,
                    outcome: Outcome::Failed(timed_out()),
                    processing_time_ms: start.elapsed().as_millis() as u64,
                };
            }
        }
    };

    let outcome = match joined {
        Ok(Ok(record)) => Outcome::Record(record),
        Ok(Err(e)) if e.is_systemic() => Outcome::Fatal(e),
        Ok(Err(e)) if e.is_deadline_exceeded() => Outcome::Failed(timed_out()),
        Ok(Err(e)) => Outcome::Failed(e.to_string()),
        Err(e) => Outcome::Failed(format!("worker failed: {}", e)),
    };
    info!("Finished {} in {:?}", path.display(), start.elapsed());

    DocumentResult {
        path,
        outcome,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    if !console::user_attended_stderr() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    if let Ok(progress_style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents")
    {
        pb.set_style(progress_style.progress_chars("=>-"));
    }
    pb
}

fn print_summary(summary: &RunSummary, store_path: &Path, report_path: &Path, elapsed: Duration) {
    println!();
    println!(
        "{} Processed {} documents in {:?}",
        style("✓").green(),
        summary.total_documents,
        elapsed
    );
    println!(
        "   validation: {} good, {} needs review, {} total",
        style(summary.good).green(),
        style(summary.needs_review).yellow(),
        summary.processed()
    );
    println!(
        "   duplicates: {} clear, {} exact, {} similar, {} total",
        style(summary.clear).green(),
        style(summary.exact).red(),
        style(summary.similar).yellow(),
        summary.processed()
    );
    if summary.unprocessed > 0 {
        println!("   unprocessed: {}", style(summary.unprocessed).red());
    }
    println!("   records: {}", store_path.display());
    println!("   duplicate report: {}", report_path.display());
}

fn write_summary(
    path: &Path,
    rows: &[SummaryRow],
    records: &[ExtractedRecord],
    verdicts: &[DuplicateVerdict<'_>],
    config: &intake_core::IntakeConfig,
) -> anyhow::Result<()> {
    let keys = &config.duplicates;
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "invoice_number",
        "issuer",
        "date",
        "amount",
        "validation",
        "duplicate",
        "processing_time_ms",
        "error",
    ])?;

    for row in rows {
        let filename = row
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        match row.record.and_then(|i| records.get(i).zip(verdicts.get(i))) {
            Some((record, verdict)) => {
                wtr.write_record([
                    filename,
                    "processed",
                    &record.field(&keys.invoice_number_field),
                    &record.field(&keys.issuer_field),
                    &record.field(&keys.date_field),
                    &record.field(&keys.amount_field),
                    record.metadata.status.as_str(),
                    verdict.kind().as_str(),
                    &row.processing_time_ms.to_string(),
                    &record.metadata.validation_errors.join("; "),
                ])?;
            }
            None => {
                wtr.write_record([
                    filename,
                    "unprocessed",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    &row.processing_time_ms.to_string(),
                    row.error.as_deref().unwrap_or(""),
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
