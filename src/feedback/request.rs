use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::analysis::Report;
use crate::exercise::{builtin_tips, ExerciseKind};

/// Sections the feedback service is asked to cover, in order.
pub const REQUESTED_SECTIONS: [&str; 5] = [
    "Overall assessment of the performance",
    "Strengths",
    "Specific areas to improve",
    "Practical advice to correct the errors",
    "Recommendations for the next session",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackMetadata {
    pub exercise: ExerciseKind,
    pub repetitions: u32,
    pub average_score: f64,
    pub total_frames: usize,
}

/// Outbound payload for the feedback service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub prompt: String,
    pub metadata: FeedbackMetadata,
}

/// Formats `report` into the feedback prompt and its metadata.
pub fn build_request(report: &Report) -> FeedbackRequest {
    let mut prompt = String::from(
        "Analyze the following exercise performance and give constructive feedback:\n\n",
    );

    // writing into a String cannot fail
    let _ = writeln!(prompt, "Exercise: {}", report.exercise);
    let _ = writeln!(prompt, "Repetitions completed: {}", report.repetitions);
    let _ = writeln!(prompt, "Average form score: {:.2}/100", report.average_score);
    if let Some(duration) = report.duration_secs {
        let _ = writeln!(prompt, "Total time: {duration:.1} seconds");
    }

    prompt.push_str("\nCommon errors detected:\n");
    if report.common_errors.is_empty() {
        prompt.push_str("- none\n");
    }
    for entry in &report.common_errors {
        let _ = writeln!(
            prompt,
            "- {}: {} ({} of the time)",
            entry.joint,
            entry.description,
            entry.frequency_label()
        );
    }

    let tips = builtin_tips(report.kind);
    if !tips.is_empty() {
        prompt.push_str("\nReference tips for this exercise:\n");
        for tip in tips {
            let _ = writeln!(prompt, "- {tip}");
        }
    }

    prompt.push_str("\nPlease provide:\n");
    for (index, section) in REQUESTED_SECTIONS.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}", index + 1, section);
    }

    FeedbackRequest {
        prompt: prompt.trim_end().to_string(),
        metadata: FeedbackMetadata {
            exercise: report.kind,
            repetitions: report.repetitions,
            average_score: report.average_score,
            total_frames: report.total_frames,
        },
    }
}
