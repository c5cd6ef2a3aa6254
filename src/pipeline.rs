use anyhow::Result;

use crate::analysis::{AnalysisError, Report, Session};
use crate::pose::PoseFrame;
use crate::log_debug;

const ENABLE_LOGS: bool = true;

/// Outcome of feeding a whole frame stream through a session.
#[derive(Debug, Clone)]
pub struct SessionRun {
    pub report: Report,
    /// Frames rejected because nobody was in them.
    pub skipped_frames: usize,
}

/// Starts `exercise`, analyzes every frame and finishes the session.
///
/// Frames without a person are skipped and counted. A source error aborts the
/// run and leaves the session idle.
pub fn run_frames<I>(session: &mut Session, exercise: &str, frames: I) -> Result<SessionRun>
where
    I: IntoIterator<Item = Result<PoseFrame>>,
{
    session.start_exercise(exercise)?;

    let mut skipped_frames = 0;
    for frame in frames {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                session.reset();
                return Err(err);
            }
        };
        match session.analyze_frame(&frame) {
            Ok(_) => {}
            Err(AnalysisError::NoPersonDetected) => {
                skipped_frames += 1;
                log_debug!("Skipping frame without a person");
            }
            Err(err) => {
                session.reset();
                return Err(err.into());
            }
        }
    }

    let report = session.finish_exercise()?;
    Ok(SessionRun {
        report,
        skipped_frames,
    })
}
