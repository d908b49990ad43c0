//! etl-runner: one full SCD pipeline run for the customer dimension.
//!
//! Usage:
//!   etl-runner --config config/etl.json
//!   etl-runner --config config/etl.json --date 2024-06-30 --json

use anyhow::{Context, Result};
use chrono::NaiveDate;
use scd_core::{
    clock::RunClock,
    config::EtlConfig,
    pipeline::{run_pipeline, PipelineReport},
    source::SqliteSourceReader,
    store::SqliteTableStore,
    types::DATE_FORMAT,
};
use std::env;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config_path = find_arg(&args, "--config").unwrap_or("./config/etl.json");
    let json_output = args.iter().any(|a| a == "--json");
    let clock = match find_arg(&args, "--date") {
        Some(d) => RunClock::at(
            NaiveDate::parse_from_str(d, DATE_FORMAT)
                .with_context(|| format!("--date {d} is not YYYY-MM-DD"))?,
        ),
        None => RunClock::start(),
    };

    let config = EtlConfig::load(config_path)?;

    if !json_output {
        println!("etl-runner: customer SCD pipeline");
        println!("  config:    {config_path}");
        println!("  source:    {} ({})", config.source.database, config.source.table);
        println!("  target:    {}", config.target.database);
        println!("  run date:  {}", clock.today_text());
        println!();
    }

    // Connectivity problems abort here, before anything is written.
    let reader = SqliteSourceReader::open(&config.source)?;
    let store = SqliteTableStore::from_config(&config.target)?;
    store.migrate()?;

    let report = run_pipeline(&reader, &store, &config, &clock)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report.summary())?);
    } else {
        print_summary(&report);
    }

    Ok(if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_summary(report: &PipelineReport) {
    println!("=== RUN SUMMARY ===");
    println!("  run_id:       {}", report.run_id);
    println!("  run date:     {}", report.run_date.format(DATE_FORMAT));
    println!("  source rows:  {}", report.source_rows);
    println!("  status:       {}", report.status().as_str());
    println!();
    println!("=== TABLES ===");
    for stage in &report.stages {
        match &stage.outcome {
            Ok(writes) => {
                for w in writes {
                    println!("  {:<28} {:>8} rows  ({})", w.table, w.rows, stage.stage);
                }
            }
            Err(e) => println!("  {:<28} FAILED: {e}", stage.stage),
        }
    }
    if !report.succeeded() {
        log::warn!(
            "{} stage(s) failed; their tables were left as they were",
            report.failed_stages().count()
        );
    }
}

fn find_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
