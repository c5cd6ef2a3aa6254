use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::analysis::{Report, Session};
use crate::db::{Database, ReportSummary};
use crate::exercise::{Catalog, ExerciseKind};
use crate::feedback::{attach_feedback, from_settings, FeedbackProvider};
use crate::pipeline::{run_frames, SessionRun};
use crate::settings::Settings;
use crate::source::{ReplaySource, SyntheticConfig, SyntheticSource};
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// Everything a command needs, built once in `run()`.
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub settings: Settings,
    pub db: Option<Database>,
    pub cancel: CancellationToken,
    pub use_feedback: bool,
    pub save: bool,
}

impl AppState {
    fn session(&self) -> Session {
        Session::new(Arc::clone(&self.catalog), self.settings.analysis.clone())
    }

    fn history(&self) -> Result<&Database> {
        self.db
            .as_ref()
            .ok_or_else(|| anyhow!("history database is not open"))
    }

    fn provider(&self) -> Option<Box<dyn FeedbackProvider>> {
        if !self.use_feedback {
            return None;
        }
        match from_settings(&self.settings.feedback) {
            Ok(provider) => provider,
            Err(err) => {
                log_warn!("feedback provider unavailable, using local feedback: {err}");
                None
            }
        }
    }

    /// Attaches feedback and stores the report unless saving is disabled.
    async fn complete(&self, run: SessionRun) -> Result<Report> {
        if run.skipped_frames > 0 {
            log_info!("{} frames had no person and were skipped", run.skipped_frames);
        }

        let provider = self.provider();
        let timeout = Duration::from_secs(self.settings.feedback.timeout_secs);
        let report = attach_feedback(run.report, provider.as_deref(), timeout, &self.cancel).await;

        if self.save {
            self.history()?
                .insert_report(&report)
                .await
                .context("failed to save report")?;
            log_info!("Saved report {}", report.session_id);
        }
        Ok(report)
    }
}

pub async fn analyze(state: &AppState, exercise: &str, input: &std::path::Path) -> Result<Report> {
    let source = ReplaySource::open(input)?;
    let mut session = state.session();
    let run = run_frames(&mut session, exercise, source)?;
    state.complete(run).await
}

pub async fn simulate(state: &AppState, exercise: &str, reps: u32, seed: u64) -> Result<Report> {
    let definition = state.catalog.resolve(exercise)?;
    let config = SyntheticConfig {
        repetitions: reps,
        seed,
        fps: state.settings.analysis.assumed_fps,
        ..SyntheticConfig::default()
    };
    let frames = SyntheticSource::new(definition, config)?.map(Ok);
    let mut session = state.session();
    let run = run_frames(&mut session, exercise, frames)?;
    state.complete(run).await
}

pub async fn history(
    state: &AppState,
    limit: usize,
    offset: usize,
    exercise: Option<&str>,
) -> Result<Vec<ReportSummary>> {
    let db = state.history()?;
    match exercise {
        Some(name) => {
            let kind: ExerciseKind = name.parse()?;
            db.list_reports_for_exercise(kind, limit, offset).await
        }
        None => db.list_reports_paginated(limit, offset).await,
    }
}

pub async fn show(state: &AppState, id: Uuid) -> Result<Report> {
    state
        .history()?
        .get_report(id)
        .await?
        .ok_or_else(|| anyhow!("no report with id {id}"))
}

pub async fn delete(state: &AppState, id: Uuid) -> Result<()> {
    if state.history()?.delete_report(id).await? {
        log_info!("Deleted report {id}");
        Ok(())
    } else {
        Err(anyhow!("no report with id {id}"))
    }
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize output")
}

/// Human-readable summary of a report.
pub fn render_report(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({}): {} repetitions, average form score {:.2}/100 over {} frames",
        report.exercise,
        report.session_id,
        report.repetitions,
        report.average_score,
        report.total_frames
    );
    if let Some(duration) = report.duration_secs {
        let _ = writeln!(out, "Held for {duration:.1} s");
    }

    if report.common_errors.is_empty() {
        out.push_str("No recurring form errors.\n");
    } else {
        out.push_str("Common errors:\n");
        for entry in &report.common_errors {
            let _ = writeln!(
                out,
                "  - {} ({}): {}",
                entry.joint,
                entry.frequency_label(),
                entry.description
            );
        }
    }

    if let Some(feedback) = &report.feedback {
        let _ = writeln!(out, "\nFeedback ({}):\n{}", feedback.source.as_str(), feedback.text);
    }
    out.trim_end().to_string()
}

pub fn render_history(summaries: &[ReportSummary]) -> String {
    if summaries.is_empty() {
        return "No reports stored.".to_string();
    }
    let mut out = String::new();
    for summary in summaries {
        let _ = writeln!(
            out,
            "{}  {}  {:<9} reps {:>3}  score {:>6.2}  errors {}",
            summary.id,
            summary.created_at.format("%Y-%m-%d %H:%M"),
            summary.kind.as_str(),
            summary.repetitions,
            summary.average_score,
            summary.error_count
        );
    }
    out.trim_end().to_string()
}
