use std::fmt::Write as _;

use crate::analysis::Report;
use crate::exercise::builtin_tips;

const NEXT_STEPS: [&str; 4] = [
    "Review the areas for improvement listed above",
    "Practice in front of a mirror to self-correct",
    "Increase repetitions gradually",
    "Stay consistent, technique improves with practice",
];

/// Deterministic feedback built from the report alone, used whenever the
/// feedback service is unavailable.
pub fn local_feedback(report: &Report) -> String {
    let mut text = String::new();
    let score = report.average_score;

    let _ = writeln!(text, "**Summary of your {} session**\n", report.exercise);

    if score >= 80.0 {
        let _ = writeln!(
            text,
            "**Excellent work!** Your average score of {score:.2}/100 shows solid technique.\n"
        );
    } else if score >= 60.0 {
        let _ = writeln!(
            text,
            "**Good effort.** With a score of {score:.2}/100 you are on the right track. \
             A few things still need work.\n"
        );
    } else {
        let _ = writeln!(
            text,
            "**Keep working.** A score of {score:.2}/100 means your technique needs adjusting. \
             Everyone starts somewhere.\n"
        );
    }

    if report.repetitions > 0 {
        let _ = write!(text, "You completed **{} repetitions**. ", report.repetitions);
        let remark = if report.repetitions >= 10 {
            "Impressive endurance!"
        } else if report.repetitions >= 5 {
            "Good start. Try to increase gradually."
        } else {
            "Starting with few repetitions is fine. Quality matters more than quantity."
        };
        let _ = writeln!(text, "{remark}\n");
    }

    if let Some(duration) = report.duration_secs {
        let _ = writeln!(text, "You held the position for **{duration:.1} seconds**.\n");
    }

    for entry in &report.common_errors {
        let _ = writeln!(
            text,
            "- {} ({}): {}",
            entry.joint,
            entry.frequency_label(),
            entry.description
        );
    }
    if !report.common_errors.is_empty() {
        text.push('\n');
    }

    let tips = builtin_tips(report.kind);
    if !tips.is_empty() {
        let _ = writeln!(text, "**Tips for {}:**", report.exercise);
        for tip in tips {
            let _ = writeln!(text, "- {tip}");
        }
        text.push('\n');
    }

    text.push_str("**Next steps:**\n");
    for (index, step) in NEXT_STEPS.iter().enumerate() {
        let _ = writeln!(text, "{}. {}", index + 1, step);
    }

    text.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::exercise::ExerciseKind;

    fn report(score: f64, repetitions: u32) -> Report {
        Report {
            session_id: Uuid::nil(),
            exercise: "Push-up".into(),
            kind: ExerciseKind::Pushup,
            repetitions,
            duration_secs: None,
            average_score: score,
            total_frames: 100,
            common_errors: Vec::new(),
            frames: Vec::new(),
            started_at: Utc::now(),
            created_at: Utc::now(),
            feedback: None,
        }
    }

    #[test]
    fn test_score_brackets() {
        assert!(local_feedback(&report(80.0, 0)).contains("Excellent work"));
        assert!(local_feedback(&report(79.99, 0)).contains("Good effort"));
        assert!(local_feedback(&report(60.0, 0)).contains("Good effort"));
        assert!(local_feedback(&report(59.0, 0)).contains("Keep working"));
    }

    #[test]
    fn test_repetition_brackets() {
        assert!(local_feedback(&report(50.0, 10)).contains("Impressive endurance"));
        assert!(local_feedback(&report(50.0, 5)).contains("Good start"));
        assert!(local_feedback(&report(50.0, 1)).contains("Quality matters"));
        assert!(!local_feedback(&report(50.0, 0)).contains("repetitions**"));
    }

    #[test]
    fn test_includes_tips_and_next_steps() {
        let text = local_feedback(&report(90.0, 12));
        assert!(text.contains("Keep your body in a straight line"));
        assert!(text.ends_with("4. Stay consistent, technique improves with practice"));
    }

    #[test]
    fn test_is_deterministic() {
        let report = report(65.0, 6);
        assert_eq!(local_feedback(&report), local_feedback(&report));
    }
}
