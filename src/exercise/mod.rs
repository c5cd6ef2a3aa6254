pub mod catalog;
pub mod definition;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisError;

pub use catalog::{builtin_tips, Catalog, CatalogError};
pub use definition::{AngleRange, ExerciseDefinition, JointSpec, Motion, RawDefinition};

/// The closed set of exercises the analyzer knows how to score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    Squat,
    Pushup,
    Plank,
    Deadlift,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 4] = [
        ExerciseKind::Squat,
        ExerciseKind::Pushup,
        ExerciseKind::Plank,
        ExerciseKind::Deadlift,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseKind::Squat => "squat",
            ExerciseKind::Pushup => "pushup",
            ExerciseKind::Plank => "plank",
            ExerciseKind::Deadlift => "deadlift",
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseKind {
    type Err = AnalysisError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ExerciseKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| AnalysisError::UnknownExerciseKind(value.to_string()))
    }
}

/// A discrete stage of an exercise's motion cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Standing,
    Up,
    Descending,
    Bottom,
    Ascending,
    Holding,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Standing => "standing",
            Phase::Up => "up",
            Phase::Descending => "descending",
            Phase::Bottom => "bottom",
            Phase::Ascending => "ascending",
            Phase::Holding => "holding",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
