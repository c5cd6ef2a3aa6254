//! Per-module logging switches layered over the `log` facade.
//!
//! A module opts in by declaring a boolean constant and importing the macros
//! from the crate root:
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_info};
//!
//! log_info!("session {} started", session_id);
//! ```
//!
//! Flipping the constant to `false` silences the module without touching
//! `RUST_LOG`, which is handy for the per-frame analysis path.

/// Info-level log gated by the calling module's `ENABLE_LOGS` constant.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Warn-level log gated by the calling module's `ENABLE_LOGS` constant.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Error-level log gated by the calling module's `ENABLE_LOGS` constant.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

/// Debug-level log gated by the calling module's `ENABLE_LOGS` constant.
/// Used on per-frame paths where info would flood the output.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}
