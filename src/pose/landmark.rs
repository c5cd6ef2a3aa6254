use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum confidence for a landmark to take part in an angle computation.
pub const MIN_LANDMARK_CONFIDENCE: f64 = 0.3;

/// A named 2D body keypoint as produced by an external pose detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Anatomical name, e.g. `left_knee`.
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// Detection confidence in `[0, 1]`. Detectors usually call this `score`.
    #[serde(alias = "score")]
    pub confidence: f64,
}

impl Landmark {
    pub fn new(name: impl Into<String>, x: f64, y: f64, confidence: f64) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            confidence,
        }
    }

    pub fn point(&self) -> Point {
        Point {
            x: self.x,
            y: self.y,
        }
    }

    pub fn is_reliable(&self, min_confidence: f64) -> bool {
        self.confidence >= min_confidence
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// All landmarks detected for one subject in one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    #[serde(alias = "keypoints", default)]
    pub landmarks: Vec<Landmark>,
}

impl Pose {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// First landmark carrying `name`.
    pub fn find(&self, name: &str) -> Option<&Landmark> {
        self.landmarks.iter().find(|landmark| landmark.name == name)
    }

    /// Position of `name` if it was detected with at least `min_confidence`.
    pub fn reliable_point(&self, name: &str, min_confidence: f64) -> Option<Point> {
        self.find(name)
            .filter(|landmark| landmark.is_reliable(min_confidence))
            .map(Landmark::point)
    }
}

/// Everything the pose source reported for one captured frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    /// Capture time reported by the source; the analyzer stamps frames
    /// without one on arrival.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub poses: Vec<Pose>,
}

impl PoseFrame {
    pub fn new(poses: Vec<Pose>) -> Self {
        Self {
            captured_at: None,
            poses,
        }
    }

    pub fn single(pose: Pose) -> Self {
        Self::new(vec![pose])
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.captured_at = Some(timestamp);
        self
    }

    /// The subject the analyzer works on. Additional subjects are ignored.
    pub fn primary(&self) -> Option<&Pose> {
        self.poses.first()
    }
}
