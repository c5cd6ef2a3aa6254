//! Frame-by-frame form analysis: joint measurement, scoring, the phase and
//! repetition state machine, and session aggregation into a [`Report`].

pub mod error;
pub mod frame;
pub mod phase;
pub mod report;
pub mod session;

pub use error::AnalysisError;
pub use frame::{form_score, measure, FrameRecord, JointDeviation, Measurement, RangeStatus};
pub use phase::{next_phase, PhaseTracker, Transition};
pub use report::{ErrorEntry, Feedback, FeedbackSource, Report};
pub use session::{Session, SessionStats};
