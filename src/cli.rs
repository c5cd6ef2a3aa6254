use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Upper bound for `simulate --reps`.
pub const MAX_SIMULATED_REPS: i64 = 10_000;

/// Exercise form analysis from pose landmarks.
#[derive(Debug, Parser)]
#[command(name = "repcoach", version, about)]
pub struct Cli {
    /// Settings file (defaults to .repcoach/settings.json)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Skip the feedback service and use the local text
    #[arg(long, global = true)]
    pub no_feedback: bool,

    /// Do not store the report in the history database
    #[arg(long, global = true)]
    pub no_save: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze a recorded JSON Lines pose file
    Analyze {
        #[arg(long)]
        exercise: String,
        #[arg(long)]
        input: PathBuf,
    },
    /// Analyze a generated session
    Simulate {
        #[arg(long)]
        exercise: String,
        /// Repetitions (cyclic) or one-second blocks (holds)
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..=MAX_SIMULATED_REPS))]
        reps: u32,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// List stored reports, newest first
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        exercise: Option<String>,
    },
    /// Print one stored report
    Show { id: Uuid },
    /// Remove one stored report
    Delete { id: Uuid },
    /// Print the effective settings
    Config {
        /// Save the settings file with every key filled in
        #[arg(long)]
        write: bool,
    },
}

impl Command {
    /// Whether the command reads or writes the history database.
    pub fn needs_history(&self, no_save: bool) -> bool {
        match self {
            Command::Analyze { .. } | Command::Simulate { .. } => !no_save,
            Command::History { .. } | Command::Show { .. } | Command::Delete { .. } => true,
            Command::Config { .. } => false,
        }
    }
}
