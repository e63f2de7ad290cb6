//! Check command - validate and duplicate-check an existing record store.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use console::style;
use tracing::info;

use intake_core::history::HistoryCorpus;
use intake_core::invoice::DuplicateKeys;
use intake_core::models::rules::RuleSet;
use intake_core::pipeline::{RunSummary, detect_duplicates, validate_all};
use intake_core::store::{RecordStore, write_report};
use intake_core::timestamp::Clock;

use super::{load_config, load_validator_lenient};

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Record store to check (default: the configured store in the output folder)
    store: Option<PathBuf>,

    /// Write validation statuses back into the store
    #[arg(long)]
    save: bool,
}

pub async fn run(args: CheckArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let clock = Clock::with_offset_hours(config.output.utc_offset_hours)?;

    let store_path = match args.store {
        Some(path) => path,
        None => default_store_path(&config)?,
    };
    if !store_path.exists() {
        anyhow::bail!("Record store not found: {}", store_path.display());
    }

    let mut store = RecordStore::load(&store_path)?;
    let document_type = store.document_type.clone();
    info!(
        "Checking {} '{}' records from {}",
        store.documents.len(),
        document_type,
        store_path.display()
    );

    let validator = load_validator_lenient(&config, &document_type)?;
    validate_all(&validator, &mut store.documents);
    if args.save {
        store.save(&store_path)?;
    }

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
        total_documents: store.documents.len(),
        ..Default::default()
    };
    summary.record_validation(&store.documents);
    summary.record_verdicts(&verdicts);

    println!(
        "{} Checked {} records from {}",
        style("✓").green(),
        summary.total_documents,
        store_path.display()
    );
    println!(
        "   validation: {} good, {} needs review",
        style(summary.good).green(),
        style(summary.needs_review).yellow()
    );
    println!(
        "   duplicates: {} clear, {} exact, {} similar",
        style(summary.clear).green(),
        style(summary.exact).red(),
        style(summary.similar).yellow()
    );
    println!("   history: {} records", corpus.len());
    println!("   duplicate report: {}", report_path.display());

    for record in store.documents.iter().filter(|r| !r.metadata.validation_errors.is_empty()) {
        println!(
            "   {} {}: {}",
            style("!").yellow(),
            record.metadata.file_name,
            record.metadata.validation_errors.join("; ")
        );
    }

    Ok(())
}

/// Store file named by the field rules, or `<type>_data.json` without rules.
fn default_store_path(config: &intake_core::IntakeConfig) -> anyhow::Result<PathBuf> {
    let document_type = &config.paths.document_type;
    let filename = if config.paths.rules_file.exists() {
        let rules = RuleSet::from_file(&config.paths.rules_file).context("failed to load field rules")?;
        match rules.for_type(document_type) {
            Ok(document_rules) => document_rules.store_filename(document_type)?,
            Err(_) => format!("{}_data.json", document_type),
        }
    } else {
        format!("{}_data.json", document_type)
    };
    Ok(config.paths.output_dir.join(filename))
}
