pub mod geometry;
pub mod landmark;

pub use geometry::angle_at;
pub use landmark::{Landmark, Point, Pose, PoseFrame, MIN_LANDMARK_CONFIDENCE};
