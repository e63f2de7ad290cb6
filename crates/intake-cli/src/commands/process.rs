//! Process command - extract and validate a single PDF.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use serde_json::json;
use tracing::{debug, info};

use intake_core::acquire::TextAcquirer;
use intake_core::history::HistoryCorpus;
use intake_core::invoice::{DuplicateDetector, DuplicateKeys};
use intake_core::pipeline::IntakePipeline;
use intake_core::timestamp::Clock;

use super::{load_config, load_extractor, load_validator_lenient, start_engine};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also classify the record against the history folder
    #[arg(long)]
    check_history: bool,

    /// Print the acquired text instead of the record
    #[arg(long)]
    show_text: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    // Check input file exists
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let document_type = config.paths.document_type.clone();
    let (extractor, _) = load_extractor(&config)?;
    let validator = load_validator_lenient(&config, &document_type)?;
    let clock = Clock::with_offset_hours(config.output.utc_offset_hours)?;
    let (engine, _) = start_engine(&config)?;

    info!("Processing file: {}", args.input.display());

    let acquirer = TextAcquirer::new(engine, &config.pdf);
    let timeout_secs = config.pdf.document_timeout_secs;
    let deadline = (timeout_secs > 0).then(|| Instant::now() + Duration::from_secs(timeout_secs));
    let acquired = acquirer.acquire(&args.input, deadline)?;
    if args.show_text {
        println!("{}", acquired.text);
        return Ok(());
    }

    let pipeline = IntakePipeline::new(acquirer, extractor, clock);
    let mut record = pipeline.record_from_text(&args.input, &acquired);
    let valid = validator.validate_record(&mut record);

    let mut output = serde_json::to_value(&record)?;
    if args.check_history {
        let corpus = HistoryCorpus::load(&config.paths.history_dir, &document_type)?;
        let detector = DuplicateDetector::new(&corpus, DuplicateKeys::from(&config.duplicates));
        let verdict = detector.classify(&record.fields);
        let evidence: Vec<String> = verdict
            .evidence()
            .iter()
            .map(|m| m.source.display().to_string())
            .collect();
        output = json!({
            "record": output,
            "duplicate": {
                "verdict": verdict.kind().as_str(),
                "history_files": evidence,
            }
        });
    }

    let rendered = serde_json::to_string_pretty(&output)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &rendered)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", rendered);
    }

    if !valid {
        eprintln!("{}", style("Validation issues:").yellow());
        for reason in &record.metadata.validation_errors {
            eprintln!("  - {}", reason);
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
