//! Batch grading orchestrator.
//!
//! Grades many submissions against one question set with bounded
//! parallelism and an optional overall deadline.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::config::GradingConfig;
use crate::model::QuestionSet;
use crate::report::{BatchReport, BatchSummary, GradeStatus, SubmissionResult};
use crate::verify::Verifier;

/// One learner's answer to one question part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub question_id: String,
    pub part_id: String,
    pub inputs: Vec<String>,
}

/// Load submissions from a JSON array file.
pub fn load_submissions(path: &Path) -> Result<Vec<Submission>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read submissions: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse submissions JSON: {}", path.display()))
}

/// Configuration for the batch grader.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum submissions graded at once.
    pub parallelism: usize,
    /// Deadline for the whole batch.
    pub timeout: Option<Duration>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            timeout: None,
        }
    }
}

impl From<&GradingConfig> for BatchConfig {
    fn from(config: &GradingConfig) -> Self {
        Self {
            parallelism: config.parallelism,
            timeout: config.timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_submission_complete(&self, result: &SubmissionResult);
    fn on_batch_complete(&self, summary: &BatchSummary, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_submission_complete(&self, _: &SubmissionResult) {}
    fn on_batch_complete(&self, _: &BatchSummary, _: Duration) {}
}

/// Grades submissions concurrently on the blocking pool.
pub struct BatchGrader {
    verifier: Arc<Verifier>,
    config: BatchConfig,
}

impl BatchGrader {
    pub fn new(verifier: Arc<Verifier>, config: BatchConfig) -> Self {
        Self { verifier, config }
    }

    /// Grade every submission against `question_set`.
    pub async fn grade(
        &self,
        question_set: &QuestionSet,
        submissions: &[Submission],
        progress: &dyn ProgressReporter,
    ) -> Result<BatchReport> {
        let start = Instant::now();
        let deadline = self.config.timeout.map(|t| tokio::time::Instant::now() + t);
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));

        let mut results: Vec<Option<SubmissionResult>> = vec![None; submissions.len()];
        let mut futures = FuturesUnordered::new();

        for (idx, submission) in submissions.iter().enumerate() {
            let Some(part) = question_set.find_part(&submission.question_id, &submission.part_id)
            else {
                tracing::warn!(
                    "submission {}: unknown question part {}/{}",
                    submission.id,
                    submission.question_id,
                    submission.part_id
                );
                let result = finished(
                    submission,
                    GradeStatus::Errored,
                    format!(
                        "unknown question part {}/{}",
                        submission.question_id, submission.part_id
                    ),
                );
                progress.on_submission_complete(&result);
                results[idx] = Some(result);
                continue;
            };
            if part.self_assessed {
                let result = finished(
                    submission,
                    GradeStatus::Errored,
                    "self-assessed parts are not machine graded".into(),
                );
                progress.on_submission_complete(&result);
                results[idx] = Some(result);
                continue;
            }

            let verifier = Arc::clone(&self.verifier);
            let semaphore = Arc::clone(&semaphore);
            let slots = part.slots.clone();
            let inputs = submission.inputs.clone();

            futures.push(async move {
                let outcome = async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| anyhow::anyhow!("semaphore closed"))?;
                    tokio::task::spawn_blocking(move || verifier.verify(&inputs, &slots))
                        .await
                        .context("grading task failed")
                }
                .await;
                (idx, outcome)
            });
        }

        loop {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, futures.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        tracing::warn!("batch deadline reached");
                        break;
                    }
                },
                None => futures.next().await,
            };
            let Some((idx, outcome)) = next else { break };

            let submission = &submissions[idx];
            let result = match outcome {
                Ok(match_result) => SubmissionResult {
                    submission_id: submission.id.clone(),
                    question_id: submission.question_id.clone(),
                    part_id: submission.part_id.clone(),
                    status: if match_result.passed {
                        GradeStatus::Passed
                    } else {
                        GradeStatus::Failed
                    },
                    result: Some(match_result),
                    error: None,
                },
                Err(e) => {
                    tracing::error!("grading failed for {}: {e:#}", submission.id);
                    finished(submission, GradeStatus::Errored, format!("{e:#}"))
                }
            };
            progress.on_submission_complete(&result);
            results[idx] = Some(result);
        }

        let mut results: Vec<SubmissionResult> = results
            .into_iter()
            .zip(submissions)
            .map(|(result, submission)| {
                result.unwrap_or_else(|| {
                    finished(
                        submission,
                        GradeStatus::TimedOut,
                        "batch deadline reached".into(),
                    )
                })
            })
            .collect();
        results.sort_by(|a, b| a.submission_id.cmp(&b.submission_id));

        let summary = BatchSummary::from_results(&results);
        let elapsed = start.elapsed();
        progress.on_batch_complete(&summary, elapsed);
        tracing::info!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            errored = summary.errored,
            timed_out = summary.timed_out,
            "batch graded"
        );

        Ok(BatchReport {
            id: Uuid::new_v4(),
            created_at: chrono::Utc::now(),
            question_set: question_set.into(),
            results,
            summary,
            duration_ms: elapsed.as_millis() as u64,
        })
    }
}

/// A result that carries no verification outcome.
fn finished(submission: &Submission, status: GradeStatus, error: String) -> SubmissionResult {
    SubmissionResult {
        submission_id: submission.id.clone(),
        question_id: submission.question_id.clone(),
        part_id: submission.part_id.clone(),
        status,
        result: None,
        error: Some(error),
    }
}
