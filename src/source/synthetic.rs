use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::exercise::{ExerciseDefinition, Motion};
use crate::pose::{Landmark, Point, Pose, PoseFrame};

/// Dominant angle at the top of a synthetic repetition.
const TOP_ANGLE_DEG: f64 = 170.0;
/// Dominant angle at the bottom of a synthetic repetition.
const BOTTOM_ANGLE_DEG: f64 = 80.0;
const DROPOUT_CONFIDENCE: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticConfig {
    /// Repetitions for cyclic exercises; for holds, the number of
    /// `frames_per_rep` blocks to hold for.
    pub repetitions: u32,
    pub seed: u64,
    pub frames_per_rep: u32,
    /// Upright frames before the first and after the last repetition.
    pub lead_frames: u32,
    /// Uniform noise added to every generated angle, in degrees.
    pub jitter_deg: f64,
    /// Probability that a frame reports one non-driving landmark with very
    /// low confidence.
    pub dropout_rate: f64,
    pub fps: f64,
    pub start: DateTime<Utc>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            repetitions: 5,
            seed: 0,
            frames_per_rep: 30,
            lead_frames: 5,
            jitter_deg: 3.0,
            dropout_rate: 0.02,
            fps: 30.0,
            start: Utc::now(),
        }
    }
}

/// Seeded generator of poses performing an exercise. The same definition and
/// config always yield the same frames.
pub struct SyntheticSource {
    definition: Arc<ExerciseDefinition>,
    config: SyntheticConfig,
    rng: StdRng,
    frame: u32,
    active_frames: u32,
    total_frames: u32,
}

impl SyntheticSource {
    /// Fails when the config cannot describe a finite, timestamped session.
    pub fn new(definition: Arc<ExerciseDefinition>, config: SyntheticConfig) -> Result<Self> {
        if config.frames_per_rep == 0 {
            bail!("frames_per_rep must be at least 1");
        }
        if !(config.fps.is_finite() && config.fps > 0.0) {
            bail!("fps must be a positive number, got {}", config.fps);
        }
        if !(config.jitter_deg.is_finite() && config.jitter_deg >= 0.0) {
            bail!("jitter_deg must be zero or positive, got {}", config.jitter_deg);
        }
        if !(0.0..=1.0).contains(&config.dropout_rate) {
            bail!("dropout_rate must lie in [0, 1], got {}", config.dropout_rate);
        }

        let active_frames = config
            .repetitions
            .checked_mul(config.frames_per_rep)
            .ok_or_else(|| too_long(&config))?;
        let total_frames = match definition.motion {
            Motion::Hold { .. } => Some(active_frames),
            Motion::Cyclic { .. } => config
                .lead_frames
                .checked_mul(2)
                .and_then(|lead| lead.checked_add(active_frames)),
        }
        .ok_or_else(|| too_long(&config))?;

        let last_offset = frame_offset(total_frames, config.fps);
        if config.start.checked_add_signed(last_offset).is_none() {
            bail!(
                "{total_frames} frames at {} fps run past the supported date range",
                config.fps
            );
        }

        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            definition,
            config,
            frame: 0,
            active_frames,
            total_frames,
        })
    }

    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    /// Planned dominant angle for frame `index`, before jitter.
    fn dominant_angle(&self, index: u32) -> f64 {
        let lead = self.config.lead_frames;
        if index < lead || index - lead >= self.active_frames {
            return TOP_ANGLE_DEG;
        }
        let phase = f64::from((index - lead) % self.config.frames_per_rep)
            / f64::from(self.config.frames_per_rep);
        let mid = (TOP_ANGLE_DEG + BOTTOM_ANGLE_DEG) / 2.0;
        let amplitude = (TOP_ANGLE_DEG - BOTTOM_ANGLE_DEG) / 2.0;
        mid + amplitude * (2.0 * PI * phase).cos()
    }

    fn jitter(&mut self) -> f64 {
        if self.config.jitter_deg <= 0.0 {
            return 0.0;
        }
        self.rng
            .gen_range(-self.config.jitter_deg..self.config.jitter_deg)
    }

    fn build_pose(&mut self, dominant_angle: Option<f64>) -> Pose {
        let definition = Arc::clone(&self.definition);
        let dominant = match definition.motion {
            Motion::Cyclic { dominant_joint, .. } => definition.joint(dominant_joint),
            Motion::Hold { .. } => None,
        };
        let mut placed: HashMap<&'static str, Point> = HashMap::new();

        // driving joint first, on a unit skeleton with the vertex at the origin
        if let Some(first) = dominant.or_else(|| definition.joints.first()) {
            let angle = match dominant_angle {
                Some(angle) if dominant.is_some() => angle,
                _ => first.range.ideal + self.jitter(),
            };
            let [a, vertex, c] = first.landmarks;
            placed.insert(vertex, Point::new(0.0, 0.0));
            placed.insert(a, Point::new(0.0, -1.0));
            placed.insert(c, rotate_around(Point::new(0.0, 0.0), Point::new(0.0, -1.0), angle));
        }

        // every other joint with exactly one free endpoint is closed at its
        // ideal angle, until nothing more can be placed
        loop {
            let before = placed.len();
            for joint in &definition.joints {
                let [a, vertex, c] = joint.landmarks;
                let Some(&origin) = placed.get(vertex) else {
                    continue;
                };
                let (free, anchor) = match (placed.get(a).copied(), placed.get(c).copied()) {
                    (Some(anchor), None) => (c, anchor),
                    (None, Some(anchor)) => (a, anchor),
                    _ => continue,
                };
                let target = joint.range.ideal + self.jitter();
                placed.insert(free, rotate_around(origin, anchor, target));
            }
            if placed.len() == before {
                break;
            }
        }

        let names: Vec<&'static str> = definition
            .joints
            .iter()
            .flat_map(|joint| joint.landmarks)
            .collect();
        let mut landmarks: Vec<Landmark> = Vec::new();
        for (index, name) in names.into_iter().enumerate() {
            if landmarks.iter().any(|l| l.name == name) {
                continue;
            }
            let point = placed
                .get(name)
                .copied()
                .unwrap_or_else(|| Point::new(1.0 + index as f64 * 0.5, 1.0));
            let confidence = self.rng.gen_range(0.7..1.0);
            landmarks.push(Landmark::new(name, point.x, point.y, confidence));
        }

        if self.rng.gen_bool(self.config.dropout_rate.clamp(0.0, 1.0)) {
            let protected: &[&str] = match dominant {
                Some(joint) => &joint.landmarks,
                None => &[],
            };
            let candidates: Vec<usize> = landmarks
                .iter()
                .enumerate()
                .filter(|(_, l)| !protected.contains(&l.name.as_str()))
                .map(|(i, _)| i)
                .collect();
            if !candidates.is_empty() {
                let victim = candidates[self.rng.gen_range(0..candidates.len())];
                landmarks[victim].confidence = DROPOUT_CONFIDENCE;
            }
        }

        Pose::new(landmarks)
    }
}

impl Iterator for SyntheticSource {
    type Item = PoseFrame;

    fn next(&mut self) -> Option<Self::Item> {
        if self.frame >= self.total_frames {
            return None;
        }
        let index = self.frame;
        self.frame += 1;

        let dominant_angle = match self.definition.motion {
            Motion::Cyclic { .. } => Some(self.dominant_angle(index) + self.jitter()),
            Motion::Hold { .. } => None,
        };
        let pose = self.build_pose(dominant_angle);
        // in range: the last offset was checked in new()
        let timestamp = self.config.start + frame_offset(index, self.config.fps);

        Some(PoseFrame::single(pose).with_timestamp(timestamp))
    }
}

fn frame_offset(index: u32, fps: f64) -> Duration {
    Duration::microseconds((f64::from(index) * 1_000_000.0 / fps) as i64)
}

fn too_long(config: &SyntheticConfig) -> anyhow::Error {
    anyhow!(
        "{} repetitions of {} frames is too many frames to generate",
        config.repetitions,
        config.frames_per_rep
    )
}

/// Rotates `point` around `origin` by `degrees`, counter-clockwise.
fn rotate_around(origin: Point, point: Point, degrees: f64) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let dx = point.x - origin.x;
    let dy = point.y - origin.y;
    Point::new(
        origin.x + dx * cos - dy * sin,
        origin.y + dx * sin + dy * cos,
    )
}
