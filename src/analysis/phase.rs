use serde::Serialize;

use crate::exercise::{Motion, Phase};

/// Dominant angle above which the body counts as upright.
pub const UPRIGHT_ABOVE_DEG: f64 = 150.0;
/// Dominant angle below which the body counts as being at the bottom.
pub const BOTTOM_BELOW_DEG: f64 = 100.0;
/// Stand-in for a dominant angle that could not be measured this frame.
pub const UNTRACKED_ANGLE_DEG: f64 = 180.0;

/// Phase for the current frame given the previously recorded phase.
///
/// Between the two thresholds the direction of travel decides: coming from
/// the top means descending, anything else means ascending.
pub fn next_phase(motion: Motion, previous: Option<Phase>, dominant_angle: Option<f64>) -> Phase {
    match motion {
        Motion::Hold { phase } => phase,
        Motion::Cyclic { upright, .. } => {
            let angle = dominant_angle.unwrap_or(UNTRACKED_ANGLE_DEG);
            if angle > UPRIGHT_ABOVE_DEG {
                upright
            } else if angle < BOTTOM_BELOW_DEG {
                Phase::Bottom
            } else if previous == Some(upright) || previous == Some(Phase::Descending) {
                Phase::Descending
            } else {
                Phase::Ascending
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub phase: Phase,
    /// The phase differs from the one recorded before this frame.
    pub changed: bool,
    /// This frame closed a repetition.
    pub completed_rep: bool,
}

/// Phase state for one session: the motion model plus the last recorded phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTracker {
    motion: Motion,
    previous: Option<Phase>,
}

impl PhaseTracker {
    pub fn new(motion: Motion) -> Self {
        Self {
            motion,
            previous: None,
        }
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }

    pub fn current(&self) -> Option<Phase> {
        self.previous
    }

    /// Joint whose angle drives the transitions, if any.
    pub fn dominant_joint(&self) -> Option<&'static str> {
        match self.motion {
            Motion::Hold { .. } => None,
            Motion::Cyclic { dominant_joint, .. } => Some(dominant_joint),
        }
    }

    /// Feeds one frame's dominant angle through the state machine.
    ///
    /// Repeating the recorded phase never completes a repetition; only an
    /// `ascending -> upright` change does.
    pub fn observe(&mut self, dominant_angle: Option<f64>) -> Transition {
        let phase = next_phase(self.motion, self.previous, dominant_angle);
        if self.previous == Some(phase) {
            return Transition {
                phase,
                changed: false,
                completed_rep: false,
            };
        }

        let previous = std::mem::replace(&mut self.previous, Some(phase));
        let completed_rep = match self.motion {
            Motion::Hold { .. } => false,
            Motion::Cyclic { upright, .. } => {
                phase == upright && previous == Some(Phase::Ascending)
            }
        };

        Transition {
            phase,
            changed: true,
            completed_rep,
        }
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUAT: Motion = Motion::Cyclic {
        dominant_joint: "knee",
        upright: Phase::Standing,
    };
    const PUSHUP: Motion = Motion::Cyclic {
        dominant_joint: "elbow",
        upright: Phase::Up,
    };
    const PLANK: Motion = Motion::Hold {
        phase: Phase::Holding,
    };

    fn run(tracker: &mut PhaseTracker, angles: &[f64]) -> u32 {
        angles
            .iter()
            .map(|angle| tracker.observe(Some(*angle)))
            .filter(|t| t.completed_rep)
            .count() as u32
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        assert_eq!(next_phase(SQUAT, None, Some(150.0)), Phase::Ascending);
        assert_eq!(next_phase(SQUAT, None, Some(150.1)), Phase::Standing);
        assert_eq!(next_phase(SQUAT, None, Some(100.0)), Phase::Ascending);
        assert_eq!(next_phase(SQUAT, None, Some(99.9)), Phase::Bottom);
    }

    #[test]
    fn test_mid_range_direction_depends_on_previous() {
        assert_eq!(
            next_phase(SQUAT, Some(Phase::Standing), Some(120.0)),
            Phase::Descending
        );
        assert_eq!(
            next_phase(SQUAT, Some(Phase::Descending), Some(120.0)),
            Phase::Descending
        );
        assert_eq!(
            next_phase(SQUAT, Some(Phase::Bottom), Some(120.0)),
            Phase::Ascending
        );
        assert_eq!(
            next_phase(PUSHUP, Some(Phase::Up), Some(120.0)),
            Phase::Descending
        );
    }

    #[test]
    fn test_missing_angle_counts_as_extended() {
        assert_eq!(next_phase(SQUAT, Some(Phase::Bottom), None), Phase::Standing);
        assert_eq!(next_phase(PUSHUP, None, None), Phase::Up);
    }

    #[test]
    fn test_hold_always_reports_its_phase() {
        assert_eq!(next_phase(PLANK, None, Some(10.0)), Phase::Holding);
        assert_eq!(next_phase(PLANK, Some(Phase::Holding), None), Phase::Holding);
    }

    #[test]
    fn test_full_cycle_counts_once() {
        let mut tracker = PhaseTracker::new(SQUAT);
        let reps = run(&mut tracker, &[170.0, 130.0, 90.0, 130.0, 170.0]);
        assert_eq!(reps, 1);
        assert_eq!(tracker.current(), Some(Phase::Standing));
    }

    #[test]
    fn test_holding_a_phase_does_not_recount() {
        let mut tracker = PhaseTracker::new(SQUAT);
        run(&mut tracker, &[170.0, 130.0, 90.0, 130.0]);
        let first = tracker.observe(Some(170.0));
        assert!(first.completed_rep);
        for _ in 0..10 {
            let t = tracker.observe(Some(175.0));
            assert!(!t.changed);
            assert!(!t.completed_rep);
        }
    }

    #[test]
    fn test_skipping_ascending_does_not_count() {
        let mut tracker = PhaseTracker::new(SQUAT);
        let reps = run(&mut tracker, &[170.0, 130.0, 90.0, 170.0]);
        assert_eq!(reps, 0);
    }

    #[test]
    fn test_pushup_counts_on_return_to_up() {
        let mut tracker = PhaseTracker::new(PUSHUP);
        let reps = run(
            &mut tracker,
            &[170.0, 120.0, 80.0, 120.0, 170.0, 120.0, 80.0, 120.0, 170.0],
        );
        assert_eq!(reps, 2);
    }

    #[test]
    fn test_first_observation_changes_phase_without_rep() {
        let mut tracker = PhaseTracker::new(SQUAT);
        let t = tracker.observe(Some(170.0));
        assert!(t.changed);
        assert!(!t.completed_rep);
    }

    #[test]
    fn test_reset_forgets_phase() {
        let mut tracker = PhaseTracker::new(SQUAT);
        tracker.observe(Some(90.0));
        tracker.reset();
        assert_eq!(tracker.current(), None);
        assert_eq!(tracker.dominant_joint(), Some("knee"));
    }
}
