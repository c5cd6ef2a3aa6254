use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::exercise::{ExerciseDefinition, Phase};
use crate::pose::{angle_at, Pose};

/// Score points lost per degree of mean deviation from the ideal angles.
pub const DEVIATION_PENALTY: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeStatus {
    InRange,
    OutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointDeviation {
    /// Absolute distance from the ideal angle, in degrees.
    pub deviation: f64,
    pub status: RangeStatus,
}

impl JointDeviation {
    pub fn is_out_of_range(&self) -> bool {
        self.status == RangeStatus::OutOfRange
    }
}

/// Angles and deviations measured on one pose. Joints whose landmarks are
/// missing or unreliable are simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measurement {
    pub angles: BTreeMap<String, f64>,
    pub deviations: BTreeMap<String, JointDeviation>,
}

impl Measurement {
    pub fn angle(&self, joint: &str) -> Option<f64> {
        self.angles.get(joint).copied()
    }
}

/// Measures every joint of `definition` on `pose`.
pub fn measure(definition: &ExerciseDefinition, pose: &Pose, min_confidence: f64) -> Measurement {
    let mut measurement = Measurement::default();

    for joint in &definition.joints {
        let [a, vertex, c] = joint.landmarks;
        let angle = angle_at(
            pose.reliable_point(a, min_confidence),
            pose.reliable_point(vertex, min_confidence),
            pose.reliable_point(c, min_confidence),
        );
        let Some(angle) = angle else {
            continue;
        };

        let status = if joint.range.contains(angle) {
            RangeStatus::InRange
        } else {
            RangeStatus::OutOfRange
        };
        measurement.angles.insert(joint.name.to_string(), angle);
        measurement.deviations.insert(
            joint.name.to_string(),
            JointDeviation {
                deviation: joint.range.deviation(angle),
                status,
            },
        );
    }

    measurement
}

/// `max(0, 100 - 2 * mean deviation)`, or 0 when nothing was measured.
pub fn form_score<'a>(deviations: impl IntoIterator<Item = &'a JointDeviation>) -> f64 {
    let (sum, count) = deviations
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), d| (sum + d.deviation, count + 1));
    if count == 0 {
        return 0.0;
    }
    let mean = sum / count as f64;
    (100.0 - DEVIATION_PENALTY * mean).max(0.0)
}

/// Result of analyzing one frame. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRecord {
    /// 0-based index among the frames that were actually analyzed.
    pub frame_number: u64,
    pub timestamp: DateTime<Utc>,
    pub angles: BTreeMap<String, f64>,
    pub deviations: BTreeMap<String, JointDeviation>,
    pub form_score: f64,
    pub phase: Phase,
    /// Repetitions completed as of this frame.
    pub repetitions: u32,
}

impl FrameRecord {
    pub fn is_out_of_range(&self, joint: &str) -> bool {
        self.deviations
            .get(joint)
            .map(JointDeviation::is_out_of_range)
            .unwrap_or(false)
    }
}
