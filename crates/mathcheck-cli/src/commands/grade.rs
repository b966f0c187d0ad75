//! The `mathcheck grade` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use mathcheck_core::batch::{load_submissions, BatchConfig, BatchGrader, ProgressReporter};
use mathcheck_core::config::load_config_from;
use mathcheck_core::question::parse_question_set;
use mathcheck_core::report::{BatchReport, BatchSummary, GradeStatus, SubmissionResult};
use mathcheck_core::verify::Verifier;

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_submission_complete(&self, result: &SubmissionResult) {
        match &result.error {
            Some(error) => eprintln!(
                "  {}: {}/{} {} ({error})",
                result.submission_id, result.question_id, result.part_id, result.status
            ),
            None => eprintln!(
                "  {}: {}/{} {}",
                result.submission_id, result.question_id, result.part_id, result.status
            ),
        }
    }

    fn on_batch_complete(&self, summary: &BatchSummary, elapsed: Duration) {
        eprintln!(
            "\nComplete: {}/{} passed, {} failed, {} errored, {} timed out ({:.1}s)",
            summary.passed,
            summary.total,
            summary.failed,
            summary.errored,
            summary.timed_out,
            elapsed.as_secs_f64()
        );
    }
}

pub async fn execute(
    config_path: Option<PathBuf>,
    question_set_path: PathBuf,
    submissions_path: PathBuf,
    parallelism: Option<usize>,
    timeout_ms: Option<u64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let mut batch_config = BatchConfig::from(&config.grading);
    if let Some(parallelism) = parallelism {
        batch_config.parallelism = parallelism;
    }
    if let Some(timeout_ms) = timeout_ms {
        batch_config.timeout = Some(Duration::from_millis(timeout_ms));
    }
    anyhow::ensure!(
        batch_config.parallelism >= 1,
        "parallelism must be at least 1"
    );
    let output = output.unwrap_or_else(|| config.grading.output_dir.clone());

    let set = parse_question_set(&question_set_path)?;
    let submissions = load_submissions(&submissions_path)?;

    eprintln!(
        "mathcheck v{}: grading {} submissions against {}",
        env!("CARGO_PKG_VERSION"),
        submissions.len(),
        set.name
    );
    eprintln!();

    let grader = BatchGrader::new(Arc::new(Verifier::new(config.verifier)), batch_config);
    let report = grader.grade(&set, &submissions, &ConsoleReporter).await?;

    print_summary(&report);

    let timestamp = report.created_at.format("%Y-%m-%dT%H%M%S");
    let path = output.join(format!("report-{timestamp}.json"));
    report.save_json(&path)?;
    eprintln!("Results saved to: {}", path.display());

    Ok(())
}

fn print_summary(report: &BatchReport) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["Status", "Count"]);

    let summary = &report.summary;
    for (status, count) in [
        (GradeStatus::Passed, summary.passed),
        (GradeStatus::Failed, summary.failed),
        (GradeStatus::Errored, summary.errored),
        (GradeStatus::TimedOut, summary.timed_out),
    ] {
        table.add_row(vec![Cell::new(status), Cell::new(count)]);
    }
    table.add_row(vec![
        Cell::new("Pass rate"),
        Cell::new(format!("{:.1}%", report.pass_rate() * 100.0)),
    ]);

    println!("{table}");
}
