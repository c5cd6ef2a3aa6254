use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::frame::FrameRecord;
use crate::exercise::{ExerciseDefinition, ExerciseKind};

/// A joint that was out of range in a notable share of the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    pub joint: String,
    /// Share of frames with this joint out of range, in percent.
    pub frequency_pct: f64,
    pub description: String,
}

impl ErrorEntry {
    /// Percentage with one decimal, e.g. `31.0%`.
    pub fn frequency_label(&self) -> String {
        format!("{:.1}%", self.frequency_pct)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSource {
    /// Text produced by the external feedback service.
    Collaborator,
    /// Deterministic text generated locally from the report.
    LocalFallback,
}

impl FeedbackSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackSource::Collaborator => "collaborator",
            FeedbackSource::LocalFallback => "local_fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub text: String,
    pub source: FeedbackSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub session_id: Uuid,
    pub exercise: String,
    pub kind: ExerciseKind,
    pub repetitions: u32,
    /// Seconds held, for hold exercises only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    pub average_score: f64,
    pub total_frames: usize,
    pub common_errors: Vec<ErrorEntry>,
    pub frames: Vec<FrameRecord>,
    pub started_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

impl Report {
    pub fn with_feedback(mut self, feedback: Feedback) -> Self {
        self.feedback = Some(feedback);
        self
    }
}

/// Mean form score over all records; 0 for an empty session.
pub fn average_form_score(records: &[FrameRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    records.iter().map(|r| r.form_score).sum::<f64>() / records.len() as f64
}

/// Joints out of range in strictly more than `threshold_pct` percent of the
/// records, most frequent first. Ties keep catalog order.
pub fn common_errors(
    definition: &ExerciseDefinition,
    records: &[FrameRecord],
    threshold_pct: f64,
) -> Vec<ErrorEntry> {
    if records.is_empty() {
        return Vec::new();
    }

    let total = records.len() as f64;
    let mut entries: Vec<ErrorEntry> = definition
        .joints
        .iter()
        .filter_map(|joint| {
            let count = records
                .iter()
                .filter(|record| record.is_out_of_range(joint.name))
                .count();
            let frequency_pct = count as f64 * 100.0 / total;
            (frequency_pct > threshold_pct).then(|| ErrorEntry {
                joint: joint.name.to_string(),
                frequency_pct,
                description: joint.error_description.to_string(),
            })
        })
        .collect();

    // stable sort keeps catalog order among equal frequencies
    entries.sort_by(|a, b| b.frequency_pct.total_cmp(&a.frequency_pct));
    entries
}
