use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{FeedbackSource, Report};
use crate::exercise::ExerciseKind;

/// One row of the history list: the report without its frames and texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub id: String,
    pub kind: ExerciseKind,
    pub exercise: String,
    pub repetitions: u32,
    pub duration_secs: Option<f64>,
    pub average_score: f64,
    pub total_frames: u64,
    pub error_count: u64,
    pub feedback_source: Option<FeedbackSource>,
    pub started_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<&Report> for ReportSummary {
    fn from(report: &Report) -> Self {
        Self {
            id: report.session_id.to_string(),
            kind: report.kind,
            exercise: report.exercise.clone(),
            repetitions: report.repetitions,
            duration_secs: report.duration_secs,
            average_score: report.average_score,
            total_frames: report.total_frames as u64,
            error_count: report.common_errors.len() as u64,
            feedback_source: report.feedback.as_ref().map(|f| f.source),
            started_at: report.started_at,
            created_at: report.created_at,
        }
    }
}
