//! Batch report types with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{MatchResult, QuestionSet};

/// How one submission came out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeStatus {
    Passed,
    Failed,
    /// The submission could not be graded (unknown question, worker failure).
    Errored,
    /// The batch deadline passed before the submission was graded.
    TimedOut,
}

impl std::fmt::Display for GradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            GradeStatus::Passed => "PASS",
            GradeStatus::Failed => "FAIL",
            GradeStatus::Errored => "ERROR",
            GradeStatus::TimedOut => "TIMEOUT",
        };
        f.write_str(label)
    }
}

/// Grading outcome for a single submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub submission_id: String,
    pub question_id: String,
    pub part_id: String,
    pub status: GradeStatus,
    /// Present when the submission was actually verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<MatchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Counts per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub timed_out: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[SubmissionResult]) -> Self {
        let mut summary = BatchSummary {
            total: results.len(),
            ..Default::default()
        };
        for r in results {
            match r.status {
                GradeStatus::Passed => summary.passed += 1,
                GradeStatus::Failed => summary.failed += 1,
                GradeStatus::Errored => summary.errored += 1,
                GradeStatus::TimedOut => summary.timed_out += 1,
            }
        }
        summary
    }
}

/// Summary of a question set (without the full question definitions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSetSummary {
    pub id: String,
    pub name: String,
    pub question_count: usize,
    pub part_count: usize,
}

impl From<&QuestionSet> for QuestionSetSummary {
    fn from(set: &QuestionSet) -> Self {
        Self {
            id: set.id.clone(),
            name: set.name.clone(),
            question_count: set.questions.len(),
            part_count: set.part_count(),
        }
    }
}

/// A complete batch grading report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    pub question_set: QuestionSetSummary,
    /// Per-submission results, sorted by submission id.
    pub results: Vec<SubmissionResult>,
    pub summary: BatchSummary,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl BatchReport {
    /// Fraction of submissions that passed; 0 for an empty batch.
    pub fn pass_rate(&self) -> f64 {
        if self.summary.total == 0 {
            return 0.0;
        }
        self.summary.passed as f64 / self.summary.total as f64
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: BatchReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result(id: &str, status: GradeStatus) -> SubmissionResult {
        SubmissionResult {
            submission_id: id.into(),
            question_id: "q".into(),
            part_id: "a".into(),
            status,
            result: None,
            error: None,
        }
    }

    fn make_report(results: Vec<SubmissionResult>) -> BatchReport {
        BatchReport {
            id: Uuid::nil(),
            created_at: Utc::now(),
            question_set: QuestionSetSummary {
                id: "test".into(),
                name: "Test".into(),
                question_count: 1,
                part_count: 1,
            },
            summary: BatchSummary::from_results(&results),
            results,
            duration_ms: 0,
        }
    }

    #[test]
    fn summary_counts_each_status() {
        let report = make_report(vec![
            make_result("s1", GradeStatus::Passed),
            make_result("s2", GradeStatus::Passed),
            make_result("s3", GradeStatus::Failed),
            make_result("s4", GradeStatus::TimedOut),
        ]);
        assert_eq!(
            report.summary,
            BatchSummary {
                total: 4,
                passed: 2,
                failed: 1,
                errored: 0,
                timed_out: 1,
            }
        );
        assert!((report.pass_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_report_pass_rate() {
        assert_eq!(make_report(vec![]).pass_rate(), 0.0);
    }

    #[test]
    fn json_roundtrip() {
        let mut errored = make_result("s2", GradeStatus::Errored);
        errored.error = Some("unknown question 'zz'".into());
        let report = make_report(vec![make_result("s1", GradeStatus::Passed), errored]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");
        report.save_json(&path).unwrap();
        let loaded = BatchReport::load_json(&path).unwrap();

        assert_eq!(loaded.question_set.id, "test");
        assert_eq!(loaded.results.len(), 2);
        assert_eq!(loaded.results[1].status, GradeStatus::Errored);
        assert_eq!(loaded.summary, report.summary);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains(r#""status": "errored""#));
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = BatchReport::load_json(&dir.path().join("missing.json")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read report"));
    }
}
