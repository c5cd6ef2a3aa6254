use std::collections::HashSet;

use serde::Serialize;

use super::{CatalogError, ExerciseKind, Phase};

/// Acceptable band and target value for one joint angle, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AngleRange {
    pub min: f64,
    pub max: f64,
    pub ideal: f64,
}

impl AngleRange {
    pub const fn new(min: f64, max: f64, ideal: f64) -> Self {
        Self { min, max, ideal }
    }

    pub fn contains(&self, angle: f64) -> bool {
        self.min <= angle && angle <= self.max
    }

    pub fn deviation(&self, angle: f64) -> f64 {
        (angle - self.ideal).abs()
    }
}

/// How phases and repetitions are derived for an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Motion {
    /// Static hold: one phase, time is accounted instead of repetitions.
    Hold { phase: Phase },
    /// Repeated movement driven by one dominant joint. A repetition completes
    /// on the way back into `upright`.
    Cyclic {
        dominant_joint: &'static str,
        upright: Phase,
    },
}

impl Motion {
    pub fn is_hold(&self) -> bool {
        matches!(self, Motion::Hold { .. })
    }
}

/// Static tables for one exercise, as written in the catalog source.
///
/// Ranges, landmark triples and error descriptions are kept as separate tables
/// keyed by joint name; [`ExerciseDefinition::from_raw`] checks that the key
/// sets agree before anything reaches the analyzer.
#[derive(Debug, Clone, Copy)]
pub struct RawDefinition {
    pub kind: ExerciseKind,
    pub display_name: &'static str,
    pub ranges: &'static [(&'static str, AngleRange)],
    pub landmarks: &'static [(&'static str, [&'static str; 3])],
    pub error_descriptions: &'static [(&'static str, &'static str)],
    pub phases: &'static [Phase],
    pub motion: Motion,
    pub tips: &'static [&'static str],
}

/// One measured joint: its range, the landmarks that define it (endpoint,
/// vertex, endpoint) and the coaching text shown when it is repeatedly off.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JointSpec {
    pub name: &'static str,
    pub range: AngleRange,
    pub landmarks: [&'static str; 3],
    pub error_description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseDefinition {
    pub kind: ExerciseKind,
    pub display_name: &'static str,
    /// Joints in catalog order.
    pub joints: Vec<JointSpec>,
    pub phases: Vec<Phase>,
    pub motion: Motion,
    pub tips: Vec<&'static str>,
}

impl ExerciseDefinition {
    pub fn from_raw(raw: &RawDefinition) -> Result<Self, CatalogError> {
        let kind = raw.kind;

        let range_keys = unique_keys(kind, raw.ranges.iter().map(|(name, _)| *name))?;
        let landmark_keys = unique_keys(kind, raw.landmarks.iter().map(|(name, _)| *name))?;
        if range_keys != landmark_keys {
            let mut missing: Vec<&str> = range_keys
                .symmetric_difference(&landmark_keys)
                .copied()
                .collect();
            missing.sort_unstable();
            return Err(CatalogError::MismatchedJoints {
                kind,
                joints: missing.join(", "),
            });
        }

        let mut joints = Vec::with_capacity(raw.ranges.len());
        for &(name, range) in raw.ranges {
            if !(range.min <= range.ideal && range.ideal <= range.max) {
                return Err(CatalogError::InvalidRange { kind, joint: name });
            }

            let landmarks = raw
                .landmarks
                .iter()
                .find(|(joint, _)| *joint == name)
                .map(|(_, triple)| *triple)
                .ok_or_else(|| CatalogError::MismatchedJoints {
                    kind,
                    joints: name.to_string(),
                })?;

            let error_description = raw
                .error_descriptions
                .iter()
                .find(|(joint, _)| *joint == name)
                .map(|(_, text)| *text)
                .ok_or(CatalogError::MissingDescription { kind, joint: name })?;

            joints.push(JointSpec {
                name,
                range,
                landmarks,
                error_description,
            });
        }

        if raw.phases.is_empty() {
            return Err(CatalogError::NoPhases(kind));
        }

        match raw.motion {
            Motion::Hold { phase } => {
                if raw.phases != [phase] {
                    return Err(CatalogError::InvalidMotion {
                        kind,
                        reason: "a hold must declare exactly its one phase",
                    });
                }
            }
            Motion::Cyclic {
                dominant_joint,
                upright,
            } => {
                if !range_keys.contains(&dominant_joint) {
                    return Err(CatalogError::InvalidMotion {
                        kind,
                        reason: "dominant joint is not measured",
                    });
                }
                let required = [upright, Phase::Descending, Phase::Bottom, Phase::Ascending];
                if !required.iter().all(|phase| raw.phases.contains(phase)) {
                    return Err(CatalogError::InvalidMotion {
                        kind,
                        reason: "cyclic phases must include upright, descending, bottom and ascending",
                    });
                }
            }
        }

        Ok(Self {
            kind,
            display_name: raw.display_name,
            joints,
            phases: raw.phases.to_vec(),
            motion: raw.motion,
            tips: raw.tips.to_vec(),
        })
    }

    pub fn joint(&self, name: &str) -> Option<&JointSpec> {
        self.joints.iter().find(|joint| joint.name == name)
    }

    pub fn is_hold(&self) -> bool {
        self.motion.is_hold()
    }
}

fn unique_keys(
    kind: ExerciseKind,
    names: impl Iterator<Item = &'static str>,
) -> Result<HashSet<&'static str>, CatalogError> {
    let mut keys = HashSet::new();
    for name in names {
        if !keys.insert(name) {
            return Err(CatalogError::DuplicateJoint { kind, joint: name });
        }
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANGES: &[(&str, AngleRange)] = &[
        ("knee", AngleRange::new(80.0, 120.0, 90.0)),
        ("hip", AngleRange::new(80.0, 120.0, 90.0)),
    ];
    const LANDMARKS: &[(&str, [&str; 3])] = &[
        ("knee", ["left_hip", "left_knee", "left_ankle"]),
        ("hip", ["left_knee", "left_hip", "left_shoulder"]),
    ];
    const DESCRIPTIONS: &[(&str, &str)] = &[("knee", "knee off"), ("hip", "hip off")];
    const PHASES: &[Phase] = &[
        Phase::Standing,
        Phase::Descending,
        Phase::Bottom,
        Phase::Ascending,
    ];

    fn raw() -> RawDefinition {
        RawDefinition {
            kind: ExerciseKind::Squat,
            display_name: "Squat",
            ranges: RANGES,
            landmarks: LANDMARKS,
            error_descriptions: DESCRIPTIONS,
            phases: PHASES,
            motion: Motion::Cyclic {
                dominant_joint: "knee",
                upright: Phase::Standing,
            },
            tips: &[],
        }
    }

    #[test]
    fn test_builds_joints_in_range_order() {
        let def = ExerciseDefinition::from_raw(&raw()).unwrap();
        let names: Vec<_> = def.joints.iter().map(|j| j.name).collect();
        assert_eq!(names, ["knee", "hip"]);
        assert_eq!(def.joint("hip").unwrap().landmarks[1], "left_hip");
    }

    #[test]
    fn test_rejects_mismatched_key_sets() {
        let mut bad = raw();
        bad.landmarks = &[("knee", ["left_hip", "left_knee", "left_ankle"])];
        let err = ExerciseDefinition::from_raw(&bad).unwrap_err();
        assert!(matches!(err, CatalogError::MismatchedJoints { ref joints, .. } if joints == "hip"));
    }

    #[test]
    fn test_rejects_duplicate_joint() {
        let mut bad = raw();
        const RANGES: &[(&str, AngleRange)] = &[
            ("knee", AngleRange::new(80.0, 120.0, 90.0)),
            ("knee", AngleRange::new(80.0, 120.0, 90.0)),
        ];
        bad.ranges = RANGES;
        assert!(matches!(
            ExerciseDefinition::from_raw(&bad),
            Err(CatalogError::DuplicateJoint { joint: "knee", .. })
        ));
    }

    #[test]
    fn test_rejects_ideal_outside_range() {
        let mut bad = raw();
        const RANGES: &[(&str, AngleRange)] = &[
            ("knee", AngleRange::new(80.0, 120.0, 130.0)),
            ("hip", AngleRange::new(80.0, 120.0, 90.0)),
        ];
        bad.ranges = RANGES;
        assert!(matches!(
            ExerciseDefinition::from_raw(&bad),
            Err(CatalogError::InvalidRange { joint: "knee", .. })
        ));
    }

    #[test]
    fn test_rejects_unmeasured_dominant_joint() {
        let mut bad = raw();
        bad.motion = Motion::Cyclic {
            dominant_joint: "elbow",
            upright: Phase::Standing,
        };
        assert!(matches!(
            ExerciseDefinition::from_raw(&bad),
            Err(CatalogError::InvalidMotion { .. })
        ));
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let range = AngleRange::new(80.0, 120.0, 90.0);
        assert!(range.contains(80.0));
        assert!(range.contains(120.0));
        assert!(!range.contains(120.000_001));
        assert_eq!(range.deviation(75.0), 15.0);
    }
}
