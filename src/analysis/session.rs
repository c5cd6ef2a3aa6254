use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::error::AnalysisError;
use super::frame::{form_score, measure, FrameRecord};
use super::phase::PhaseTracker;
use super::report::{average_form_score, common_errors, Report};
use crate::exercise::{Catalog, ExerciseDefinition, ExerciseKind, Phase};
use crate::pose::PoseFrame;
use crate::settings::AnalysisSettings;
use crate::{log_debug, log_info};

const ENABLE_LOGS: bool = true;

/// Live, read-only view of a session for rendering collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub kind: Option<ExerciseKind>,
    pub repetitions: u32,
    pub phase: Option<Phase>,
    pub frames_analyzed: u64,
    pub last_score: Option<f64>,
}

#[derive(Debug)]
struct ActiveExercise {
    id: Uuid,
    definition: Arc<ExerciseDefinition>,
    started_at: DateTime<Utc>,
    frame_count: u64,
    repetitions: u32,
    hold_ticks: u64,
    tracker: PhaseTracker,
    records: Vec<FrameRecord>,
}

impl ActiveExercise {
    fn new(definition: Arc<ExerciseDefinition>) -> Self {
        let tracker = PhaseTracker::new(definition.motion);
        Self {
            id: Uuid::new_v4(),
            definition,
            started_at: Utc::now(),
            frame_count: 0,
            repetitions: 0,
            hold_ticks: 0,
            tracker,
            records: Vec::new(),
        }
    }
}

/// One exercise session: feeds frames through the analyzer and the phase
/// machine and produces a [`Report`] when finished.
///
/// Sessions are independent values; run as many side by side as needed.
#[derive(Debug)]
pub struct Session {
    catalog: Arc<Catalog>,
    settings: AnalysisSettings,
    active: Option<ActiveExercise>,
}

impl Session {
    pub fn new(catalog: Arc<Catalog>, settings: AnalysisSettings) -> Self {
        Self {
            catalog,
            settings,
            active: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Starts analyzing `name` (e.g. `"squat"`), discarding any previous state.
    pub fn start_exercise(&mut self, name: &str) -> Result<Uuid, AnalysisError> {
        let definition = self.catalog.resolve(name)?;
        Ok(self.begin(definition))
    }

    pub fn start(&mut self, kind: ExerciseKind) -> Result<Uuid, AnalysisError> {
        let definition = self
            .catalog
            .get(kind)
            .ok_or_else(|| AnalysisError::UnknownExerciseKind(kind.to_string()))?;
        Ok(self.begin(definition))
    }

    fn begin(&mut self, definition: Arc<ExerciseDefinition>) -> Uuid {
        let active = ActiveExercise::new(definition);
        let id = active.id;
        log_info!(
            "Started {} session {}",
            active.definition.kind,
            id
        );
        self.active = Some(active);
        id
    }

    /// Analyzes one frame of the active exercise and records the result.
    ///
    /// Frames without a person are rejected with `NoPersonDetected` and leave
    /// the session untouched.
    pub fn analyze_frame(&mut self, frame: &PoseFrame) -> Result<FrameRecord, AnalysisError> {
        let active = self
            .active
            .as_mut()
            .ok_or(AnalysisError::NoActiveExercise)?;
        let pose = frame
            .primary()
            .filter(|pose| !pose.is_empty())
            .ok_or(AnalysisError::NoPersonDetected)?;

        let measurement = measure(&active.definition, pose, self.settings.min_confidence);
        let score = form_score(measurement.deviations.values());

        let dominant_angle = active
            .tracker
            .dominant_joint()
            .and_then(|joint| measurement.angle(joint));
        let transition = active.tracker.observe(dominant_angle);

        if active.definition.is_hold() {
            active.hold_ticks += 1;
        } else if transition.completed_rep {
            active.repetitions += 1;
            log_info!(
                "{} repetition {} completed",
                active.definition.kind,
                active.repetitions
            );
        }
        if transition.changed {
            log_debug!("Phase -> {}", transition.phase);
        }

        let record = FrameRecord {
            frame_number: active.frame_count,
            timestamp: frame.captured_at.unwrap_or_else(Utc::now),
            angles: measurement.angles,
            deviations: measurement.deviations,
            form_score: score,
            phase: transition.phase,
            repetitions: active.repetitions,
        };
        active.frame_count += 1;
        active.records.push(record.clone());

        Ok(record)
    }

    /// Ends the active exercise and builds its report. The session is idle
    /// afterwards.
    pub fn finish_exercise(&mut self) -> Result<Report, AnalysisError> {
        let active = self.active.take().ok_or(AnalysisError::NoActiveExercise)?;
        let definition = active.definition;

        let duration_secs = definition
            .is_hold()
            .then(|| active.hold_ticks as f64 / self.settings.assumed_fps);
        let average_score = average_form_score(&active.records);
        let errors = common_errors(
            &definition,
            &active.records,
            self.settings.error_threshold_pct,
        );

        log_info!(
            "Finished {} session {}: {} reps, {} frames, average score {:.2}",
            definition.kind,
            active.id,
            active.repetitions,
            active.records.len(),
            average_score
        );

        Ok(Report {
            session_id: active.id,
            exercise: definition.display_name.to_string(),
            kind: definition.kind,
            repetitions: active.repetitions,
            duration_secs,
            average_score,
            total_frames: active.records.len(),
            common_errors: errors,
            frames: active.records,
            started_at: active.started_at,
            created_at: Utc::now(),
            feedback: None,
        })
    }

    /// Drops the active exercise without producing a report.
    pub fn reset(&mut self) {
        if let Some(active) = self.active.take() {
            log_info!("Discarded {} session {}", active.definition.kind, active.id);
        }
    }

    pub fn stats(&self) -> SessionStats {
        match &self.active {
            Some(active) => SessionStats {
                kind: Some(active.definition.kind),
                repetitions: active.repetitions,
                phase: active.tracker.current(),
                frames_analyzed: active.frame_count,
                last_score: active.records.last().map(|r| r.form_score),
            },
            None => SessionStats {
                kind: None,
                repetitions: 0,
                phase: None,
                frames_analyzed: 0,
                last_score: None,
            },
        }
    }

    /// Records of the active exercise so far.
    pub fn records(&self) -> &[FrameRecord] {
        self.active
            .as_ref()
            .map(|active| active.records.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Landmark, Pose};

    fn session() -> Session {
        Session::new(
            Arc::new(Catalog::builtin().unwrap()),
            AnalysisSettings::default(),
        )
    }

    /// Plank pose with the torso 170 degrees away from the upper arm.
    fn ideal_plank() -> PoseFrame {
        let shoulder = (0.0, 0.0);
        let elbow = (0.0, 1.0);
        let theta = 170f64.to_radians();
        let hip = (theta.sin(), theta.cos());
        PoseFrame::single(Pose::new(vec![
            Landmark::new("left_shoulder", shoulder.0, shoulder.1, 0.9),
            Landmark::new("left_elbow", elbow.0, elbow.1, 0.9),
            Landmark::new("left_hip", hip.0, hip.1, 0.9),
        ]))
    }

    #[test]
    fn test_analyze_without_start_fails() {
        let mut session = session();
        assert_eq!(
            session.analyze_frame(&PoseFrame::default()).unwrap_err(),
            AnalysisError::NoActiveExercise
        );
    }

    #[test]
    fn test_finish_without_start_fails() {
        let mut session = session();
        assert_eq!(
            session.finish_exercise().unwrap_err(),
            AnalysisError::NoActiveExercise
        );
    }

    #[test]
    fn test_unknown_exercise_is_rejected() {
        let mut session = session();
        assert_eq!(
            session.start_exercise("unknown").unwrap_err(),
            AnalysisError::UnknownExerciseKind("unknown".into())
        );
        assert!(!session.is_active());
    }

    #[test]
    fn test_empty_frame_is_not_recorded() {
        let mut session = session();
        session.start(ExerciseKind::Squat).unwrap();

        let err = session.analyze_frame(&PoseFrame::default()).unwrap_err();
        assert_eq!(err, AnalysisError::NoPersonDetected);
        let err = session
            .analyze_frame(&PoseFrame::single(Pose::default()))
            .unwrap_err();
        assert_eq!(err, AnalysisError::NoPersonDetected);

        assert!(session.records().is_empty());
        assert_eq!(session.stats().frames_analyzed, 0);
    }

    #[test]
    fn test_empty_finish_reports_zero() {
        let mut session = session();
        session.start(ExerciseKind::Pushup).unwrap();
        let report = session.finish_exercise().unwrap();

        assert_eq!(report.average_score, 0.0);
        assert_eq!(report.total_frames, 0);
        assert!(report.common_errors.is_empty());
        assert_eq!(report.duration_secs, None);
        assert!(!session.is_active());
    }

    #[test]
    fn test_plank_counts_hold_time() {
        let mut session = session();
        session.start_exercise("plank").unwrap();
        for _ in 0..45 {
            let record = session.analyze_frame(&ideal_plank()).unwrap();
            assert_eq!(record.phase, Phase::Holding);
            assert_eq!(record.repetitions, 0);
        }
        let report = session.finish_exercise().unwrap();
        assert_eq!(report.duration_secs, Some(1.5));
        assert_eq!(report.repetitions, 0);
    }

    #[test]
    fn test_frame_numbers_and_timestamps() {
        let mut session = session();
        session.start(ExerciseKind::Plank).unwrap();
        let stamp = Utc::now();
        let first = session
            .analyze_frame(&ideal_plank().with_timestamp(stamp))
            .unwrap();
        let second = session.analyze_frame(&ideal_plank()).unwrap();
        assert_eq!(first.frame_number, 0);
        assert_eq!(first.timestamp, stamp);
        assert_eq!(second.frame_number, 1);
    }

    #[test]
    fn test_stats_follow_the_session() {
        let mut session = session();
        assert_eq!(session.stats().kind, None);

        session.start(ExerciseKind::Plank).unwrap();
        session.analyze_frame(&ideal_plank()).unwrap();

        let stats = session.stats();
        assert_eq!(stats.kind, Some(ExerciseKind::Plank));
        assert_eq!(stats.phase, Some(Phase::Holding));
        assert_eq!(stats.frames_analyzed, 1);
        assert!(stats.last_score.is_some());
    }

    #[test]
    fn test_restart_discards_previous_state() {
        let mut session = session();
        session.start(ExerciseKind::Plank).unwrap();
        session.analyze_frame(&ideal_plank()).unwrap();
        session.start(ExerciseKind::Squat).unwrap();
        assert!(session.records().is_empty());
        assert_eq!(session.stats().kind, Some(ExerciseKind::Squat));
    }

    #[test]
    fn test_reset_clears_without_report() {
        let mut session = session();
        session.start(ExerciseKind::Plank).unwrap();
        session.analyze_frame(&ideal_plank()).unwrap();
        session.reset();
        assert!(!session.is_active());
        assert_eq!(
            session.finish_exercise().unwrap_err(),
            AnalysisError::NoActiveExercise
        );
    }
}
