//! Where pose frames come from: recorded JSON Lines files or a seeded
//! generator.

pub mod replay;
pub mod synthetic;

pub use replay::ReplaySource;
pub use synthetic::{SyntheticConfig, SyntheticSource};
