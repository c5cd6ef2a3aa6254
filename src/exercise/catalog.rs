use std::sync::Arc;

use thiserror::Error;

use super::definition::{AngleRange, ExerciseDefinition, Motion, RawDefinition};
use super::{ExerciseKind, Phase};
use crate::analysis::AnalysisError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("{kind}: angle ranges and landmark triples disagree on joints [{joints}]")]
    MismatchedJoints { kind: ExerciseKind, joints: String },

    #[error("{kind}: joint {joint} is declared more than once")]
    DuplicateJoint {
        kind: ExerciseKind,
        joint: &'static str,
    },

    #[error("{kind}: ideal angle for {joint} lies outside its range")]
    InvalidRange {
        kind: ExerciseKind,
        joint: &'static str,
    },

    #[error("{kind}: no error description for joint {joint}")]
    MissingDescription {
        kind: ExerciseKind,
        joint: &'static str,
    },

    #[error("{0}: no phases declared")]
    NoPhases(ExerciseKind),

    #[error("{kind}: invalid motion model ({reason})")]
    InvalidMotion {
        kind: ExerciseKind,
        reason: &'static str,
    },

    #[error("{0} is defined more than once")]
    DuplicateExercise(ExerciseKind),

    #[error("{0} has no definition")]
    MissingExercise(ExerciseKind),
}

const CYCLE_FROM_STANDING: &[Phase] = &[
    Phase::Standing,
    Phase::Descending,
    Phase::Bottom,
    Phase::Ascending,
];

const CYCLE_FROM_UP: &[Phase] = &[Phase::Up, Phase::Descending, Phase::Bottom, Phase::Ascending];

pub const BUILTIN: &[RawDefinition] = &[
    RawDefinition {
        kind: ExerciseKind::Squat,
        display_name: "Squat",
        ranges: &[
            ("hip", AngleRange::new(80.0, 120.0, 90.0)),
            ("knee", AngleRange::new(80.0, 120.0, 90.0)),
            ("ankle", AngleRange::new(65.0, 90.0, 75.0)),
        ],
        landmarks: &[
            ("hip", ["left_hip", "left_knee", "left_shoulder"]),
            ("knee", ["left_hip", "left_knee", "left_ankle"]),
            ("ankle", ["left_knee", "left_ankle", "left_heel"]),
        ],
        error_descriptions: &[
            (
                "knee",
                "Knees are not reaching the right angle. Go lower or check your posture.",
            ),
            ("hip", "Hips are too high or too low. Adjust your depth."),
            (
                "ankle",
                "Ankle angle is off. Check where your feet are placed.",
            ),
        ],
        phases: CYCLE_FROM_STANDING,
        motion: Motion::Cyclic {
            dominant_joint: "knee",
            upright: Phase::Standing,
        },
        tips: &[
            "Keep your feet shoulder-width apart",
            "Lower until your thighs are parallel to the floor",
            "Keep your back straight and your chest up",
            "Do not let your knees travel past your toes",
        ],
    },
    RawDefinition {
        kind: ExerciseKind::Pushup,
        display_name: "Push-up",
        ranges: &[
            ("elbow", AngleRange::new(70.0, 110.0, 90.0)),
            ("shoulder", AngleRange::new(60.0, 100.0, 80.0)),
            ("back", AngleRange::new(160.0, 180.0, 170.0)),
        ],
        landmarks: &[
            ("elbow", ["left_shoulder", "left_elbow", "left_wrist"]),
            ("shoulder", ["left_hip", "left_shoulder", "left_elbow"]),
            ("back", ["left_hip", "left_shoulder", "nose"]),
        ],
        error_descriptions: &[
            (
                "elbow",
                "Elbows are not bending enough. Bring your chest lower.",
            ),
            (
                "shoulder",
                "Shoulders are misaligned. Keep your arms at 45 degrees from your body.",
            ),
            ("back", "Back is not straight. Keep your core engaged."),
        ],
        phases: CYCLE_FROM_UP,
        motion: Motion::Cyclic {
            dominant_joint: "elbow",
            upright: Phase::Up,
        },
        tips: &[
            "Keep your body in a straight line",
            "Elbows should sit at about 45 degrees from your torso",
            "Lower until your chest almost touches the floor",
            "Keep your core braced the whole time",
        ],
    },
    RawDefinition {
        kind: ExerciseKind::Plank,
        display_name: "Plank",
        ranges: &[
            ("back", AngleRange::new(160.0, 180.0, 170.0)),
            ("hip", AngleRange::new(160.0, 180.0, 170.0)),
            ("shoulder", AngleRange::new(80.0, 100.0, 90.0)),
        ],
        landmarks: &[
            ("back", ["left_hip", "left_shoulder", "left_elbow"]),
            ("hip", ["left_knee", "left_hip", "left_shoulder"]),
            ("shoulder", ["left_hip", "left_shoulder", "left_elbow"]),
        ],
        error_descriptions: &[
            (
                "back",
                "Back is curved. Hold a straight line from head to heels.",
            ),
            ("hip", "Hips are too high or too low. Line up your body."),
            ("shoulder", "Shoulders are not stacked over your elbows."),
        ],
        phases: &[Phase::Holding],
        motion: Motion::Hold {
            phase: Phase::Holding,
        },
        tips: &[
            "Hold a straight line from head to heels",
            "Do not let your hips sag",
            "Keep your core tight",
            "Breathe steadily",
        ],
    },
    RawDefinition {
        kind: ExerciseKind::Deadlift,
        display_name: "Deadlift",
        ranges: &[
            ("back", AngleRange::new(160.0, 180.0, 170.0)),
            ("hip", AngleRange::new(80.0, 140.0, 110.0)),
            ("knee", AngleRange::new(150.0, 180.0, 165.0)),
        ],
        landmarks: &[
            ("back", ["left_hip", "left_shoulder", "nose"]),
            ("hip", ["left_knee", "left_hip", "left_shoulder"]),
            ("knee", ["left_ankle", "left_knee", "left_hip"]),
        ],
        error_descriptions: &[
            ("back", "Back is rounding. Keep a neutral, straight spine."),
            ("hip", "Hip hinge is off. Push your hips back."),
            (
                "knee",
                "Knees are bending too much. Keep your legs nearly straight.",
            ),
        ],
        phases: CYCLE_FROM_STANDING,
        motion: Motion::Cyclic {
            dominant_joint: "knee",
            upright: Phase::Standing,
        },
        tips: &[
            "Keep your back neutral and straight",
            "Drive your hips back",
            "Keep a slight bend in your knees",
            "Lift with your legs, not your back",
        ],
    },
];

/// Coaching tips for `kind` as listed in the built-in tables.
pub fn builtin_tips(kind: ExerciseKind) -> &'static [&'static str] {
    BUILTIN
        .iter()
        .find(|raw| raw.kind == kind)
        .map(|raw| raw.tips)
        .unwrap_or(&[])
}

/// Validated exercise definitions, one per [`ExerciseKind`].
///
/// Shared read-only between sessions.
#[derive(Debug, Clone)]
pub struct Catalog {
    definitions: Vec<Arc<ExerciseDefinition>>,
}

impl Catalog {
    /// Builds the catalog shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_raw(BUILTIN)
    }

    pub fn from_raw(raw: &[RawDefinition]) -> Result<Self, CatalogError> {
        let mut definitions: Vec<Arc<ExerciseDefinition>> = Vec::with_capacity(raw.len());
        for entry in raw {
            if definitions.iter().any(|def| def.kind == entry.kind) {
                return Err(CatalogError::DuplicateExercise(entry.kind));
            }
            definitions.push(Arc::new(ExerciseDefinition::from_raw(entry)?));
        }

        if let Some(missing) = ExerciseKind::ALL
            .into_iter()
            .find(|kind| !definitions.iter().any(|def| def.kind == *kind))
        {
            return Err(CatalogError::MissingExercise(missing));
        }

        Ok(Self { definitions })
    }

    pub fn get(&self, kind: ExerciseKind) -> Option<Arc<ExerciseDefinition>> {
        self.definitions
            .iter()
            .find(|def| def.kind == kind)
            .cloned()
    }

    /// Looks up an exercise by its identifier, e.g. `"squat"`.
    pub fn resolve(&self, name: &str) -> Result<Arc<ExerciseDefinition>, AnalysisError> {
        let kind: ExerciseKind = name.parse()?;
        self.get(kind)
            .ok_or_else(|| AnalysisError::UnknownExerciseKind(name.to_string()))
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ExerciseDefinition> {
        self.definitions.iter().map(|def| def.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.definitions().count(), 4);
    }

    #[test]
    fn test_every_joint_has_three_distinct_landmarks() {
        let catalog = Catalog::builtin().unwrap();
        for def in catalog.definitions() {
            for joint in &def.joints {
                let [a, vertex, c] = joint.landmarks;
                assert!(a != vertex && vertex != c, "{}:{}", def.kind, joint.name);
            }
        }
    }

    #[test]
    fn test_squat_knee_is_measured_at_the_knee() {
        let catalog = Catalog::builtin().unwrap();
        let squat = catalog.get(ExerciseKind::Squat).unwrap();
        let knee = squat.joint("knee").unwrap();
        assert_eq!(knee.landmarks, ["left_hip", "left_knee", "left_ankle"]);
        assert_eq!(knee.range, AngleRange::new(80.0, 120.0, 90.0));
    }

    #[test]
    fn test_only_plank_is_a_hold() {
        let catalog = Catalog::builtin().unwrap();
        let holds: Vec<_> = catalog
            .definitions()
            .filter(|def| def.is_hold())
            .map(|def| def.kind)
            .collect();
        assert_eq!(holds, [ExerciseKind::Plank]);
    }

    #[test]
    fn test_resolve_unknown_name() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(
            catalog.resolve("burpee").unwrap_err(),
            AnalysisError::UnknownExerciseKind("burpee".into())
        );
    }

    #[test]
    fn test_missing_exercise_is_rejected() {
        let err = Catalog::from_raw(&BUILTIN[..3]).unwrap_err();
        assert_eq!(err, CatalogError::MissingExercise(ExerciseKind::Deadlift));
    }

    #[test]
    fn test_builtin_tips_exist_for_every_kind() {
        for kind in ExerciseKind::ALL {
            assert_eq!(builtin_tips(kind).len(), 4, "{kind}");
        }
    }

    #[test]
    fn test_duplicate_exercise_is_rejected() {
        let raw = [BUILTIN[0], BUILTIN[0]];
        assert_eq!(
            Catalog::from_raw(&raw).unwrap_err(),
            CatalogError::DuplicateExercise(ExerciseKind::Squat)
        );
    }
}
