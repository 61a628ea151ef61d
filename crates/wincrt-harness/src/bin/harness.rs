//! CLI entrypoint for the wincrt conformance harness.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wincrt_harness::fixtures::{self, FixtureSet};
use wincrt_harness::structured_log::{
    ArtifactIndex, LogEmitter, LogEntry, LogLevel, Outcome, StreamKind, validate_log_file,
};
use wincrt_harness::{TestRunner, VerificationSummary};

const SUITE: &str = "exit_registry";

/// Conformance tooling for wincrt.
#[derive(Debug, Parser)]
#[command(name = "wincrt-harness")]
#[command(about = "Conformance testing harness for wincrt")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay fixture cases against the exit-callback registry.
    Verify {
        /// Directory (or single file) containing fixture JSON.
        #[arg(long)]
        fixture: PathBuf,
        /// Structured JSONL log output path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Artifact index JSON output path.
        #[arg(long)]
        artifact_index: Option<PathBuf>,
        /// Run identifier embedded in trace ids.
        #[arg(long, default_value = "local")]
        run_id: String,
    },
    /// Validate a structured JSONL log.
    ValidateLog {
        /// Structured JSONL log path.
        #[arg(long)]
        log: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Verify {
            fixture,
            log,
            artifact_index,
            run_id,
        } => {
            eprintln!("Verifying against fixtures in {}", fixture.display());
            let paths = fixtures::discover(&fixture)?;

            let mut emitter = match &log {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    LogEmitter::to_file(path, SUITE, &run_id)?
                }
                None => LogEmitter::to_sink(SUITE, &run_id),
            };
            let mut index = ArtifactIndex::new(&run_id, SUITE);

            let mut sets = Vec::new();
            for path in &paths {
                let bytes = std::fs::read(path)?;
                index.add_bytes(path.display().to_string(), "fixture", &bytes);
                sets.push(FixtureSet::from_file(path)?);
            }

            emitter.emit_entry(
                LogEntry::new("", LogLevel::Info, "run_start")
                    .with_stream(StreamKind::Conformance)
                    .with_details(serde_json::json!({ "fixture_files": paths.len() })),
            )?;

            let runner = TestRunner::new();
            let mut results = Vec::new();
            for set in &sets {
                for result in runner.run(set) {
                    let (level, outcome) = if result.passed {
                        (LogLevel::Info, Outcome::Pass)
                    } else {
                        (LogLevel::Error, Outcome::Fail)
                    };
                    let mut entry = LogEntry::new("", level, "case_result")
                        .with_stream(StreamKind::Conformance)
                        .with_symbol(set.family.as_str())
                        .with_case(result.case_name.as_str())
                        .with_policy(result.policy.as_str())
                        .with_outcome(outcome)
                        .with_counts(result.invoked as u64, result.pending as u64)
                        .with_latency_ns(result.latency_ns);
                    if let Some(diff) = &result.diff {
                        entry = entry.with_details(serde_json::json!({ "diff": diff }));
                    }
                    emitter.emit_entry(entry)?;
                    results.push(result);
                }
            }

            let summary = VerificationSummary::from_results(results);
            emitter.emit_entry(
                LogEntry::new("", LogLevel::Info, "run_end")
                    .with_stream(StreamKind::Conformance)
                    .with_details(serde_json::json!({
                        "total": summary.total,
                        "passed": summary.passed,
                        "failed": summary.failed,
                    })),
            )?;
            emitter.flush()?;

            if let Some(log_path) = &log {
                let bytes = std::fs::read(log_path)?;
                index.add_bytes(log_path.display().to_string(), "log", &bytes);
            }
            if let Some(index_path) = &artifact_index {
                if let Some(parent) = index_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(index_path, index.to_json()?)?;
            }

            for result in summary.results.iter().filter(|r| !r.passed) {
                eprintln!(
                    "FAIL {} [{}] ({})\n{}",
                    result.case_name,
                    result.policy,
                    result.spec_section,
                    result.diff.as_deref().unwrap_or_default()
                );
            }
            eprintln!(
                "Verification complete: total={}, passed={}, failed={}",
                summary.total, summary.passed, summary.failed
            );
            if !summary.all_passed() {
                std::process::exit(1);
            }
        }
        Command::ValidateLog { log } => {
            let (lines, errors) = validate_log_file(&log)?;
            for err in &errors {
                eprintln!("{err}");
            }
            eprintln!(
                "Validated {} lines in {}: {} errors",
                lines,
                log.display(),
                errors.len()
            );
            if !errors.is_empty() {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
