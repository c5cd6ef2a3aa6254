use anyhow::{Context, Result};
use chrono::SecondsFormat;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::analysis::Report;
use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_feedback_source, parse_kind, to_i64, to_u64},
    models::ReportSummary,
};
use crate::exercise::ExerciseKind;

const SUMMARY_COLUMNS: &str = "id, exercise_kind, exercise_name, repetitions, duration_secs, \
     average_score, total_frames, error_count, feedback_source, started_at, created_at";

fn row_to_summary(row: &Row) -> Result<ReportSummary> {
    let kind: String = row.get("exercise_kind")?;
    let repetitions: i64 = row.get("repetitions")?;
    let total_frames: i64 = row.get("total_frames")?;
    let error_count: i64 = row.get("error_count")?;
    let feedback_source: Option<String> = row.get("feedback_source")?;
    let started_at: String = row.get("started_at")?;
    let created_at: String = row.get("created_at")?;

    Ok(ReportSummary {
        id: row.get("id")?,
        kind: parse_kind(&kind)?,
        exercise: row.get("exercise_name")?,
        repetitions: u32::try_from(to_u64(repetitions, "repetitions")?)
            .context("repetitions out of range")?,
        duration_secs: row.get("duration_secs")?,
        average_score: row.get("average_score")?,
        total_frames: to_u64(total_frames, "total_frames")?,
        error_count: to_u64(error_count, "error_count")?,
        feedback_source: parse_feedback_source(feedback_source)?,
        started_at: parse_datetime(&started_at, "started_at")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn collect_summaries(rows: &mut rusqlite::Rows<'_>) -> Result<Vec<ReportSummary>> {
    let mut summaries = Vec::new();
    while let Some(row) = rows.next()? {
        summaries.push(row_to_summary(row)?);
    }
    Ok(summaries)
}

impl Database {
    /// Stores a finished report. Re-inserting the same session replaces it.
    ///
    /// Timestamps use a fixed-width format so `ORDER BY created_at` sorts
    /// chronologically.
    pub async fn insert_report(&self, report: &Report) -> Result<()> {
        let summary = ReportSummary::from(report);
        let payload = serde_json::to_string(report).context("failed to serialize report")?;
        self.execute(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO reports (id, exercise_kind, exercise_name, repetitions, duration_secs,
                     average_score, total_frames, error_count, feedback_source, started_at, created_at, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    summary.id,
                    summary.kind.as_str(),
                    summary.exercise,
                    summary.repetitions,
                    summary.duration_secs,
                    summary.average_score,
                    to_i64(summary.total_frames)?,
                    to_i64(summary.error_count)?,
                    summary.feedback_source.map(|source| source.as_str()),
                    summary.started_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                    summary.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                    payload,
                ],
            )
            .with_context(|| "failed to insert report")?;
            Ok(())
        })
        .await
    }

    pub async fn get_report(&self, id: Uuid) -> Result<Option<Report>> {
        let id = id.to_string();
        self.execute(move |conn| {
            let payload: Option<String> = conn
                .query_row(
                    "SELECT payload FROM reports WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;

            payload
                .map(|json| {
                    serde_json::from_str::<Report>(&json)
                        .with_context(|| format!("failed to parse stored report {id}"))
                })
                .transpose()
        })
        .await
    }

    /// Most recent reports first.
    pub async fn list_reports_paginated(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ReportSummary>> {
        let limit = limit as i64;
        let offset = offset as i64;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUMMARY_COLUMNS}
                 FROM reports
                 ORDER BY created_at DESC
                 LIMIT ?1 OFFSET ?2"
            ))?;

            let mut rows = stmt.query(params![limit, offset])?;
            collect_summaries(&mut rows)
        })
        .await
    }

    pub async fn list_reports_for_exercise(
        &self,
        kind: ExerciseKind,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ReportSummary>> {
        let limit = limit as i64;
        let offset = offset as i64;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUMMARY_COLUMNS}
                 FROM reports
                 WHERE exercise_kind = ?1
                 ORDER BY created_at DESC
                 LIMIT ?2 OFFSET ?3"
            ))?;

            let mut rows = stmt.query(params![kind.as_str(), limit, offset])?;
            collect_summaries(&mut rows)
        })
        .await
    }

    /// Returns whether a report was removed.
    pub async fn delete_report(&self, id: Uuid) -> Result<bool> {
        let id = id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn
                .execute("DELETE FROM reports WHERE id = ?1", params![id])
                .with_context(|| "failed to delete report")?;
            Ok(rows_affected > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::analysis::{ErrorEntry, Feedback, FeedbackSource};

    fn open() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("history.sqlite3")).unwrap();
        (dir, db)
    }

    fn report(kind: ExerciseKind, minutes_ago: i64) -> Report {
        let created_at = Utc::now() - Duration::minutes(minutes_ago);
        Report {
            session_id: Uuid::new_v4(),
            exercise: kind.as_str().to_string(),
            kind,
            repetitions: 6,
            duration_secs: (kind == ExerciseKind::Plank).then_some(31.5),
            average_score: 74.25,
            total_frames: 180,
            common_errors: vec![ErrorEntry {
                joint: "knee".into(),
                frequency_pct: 42.0,
                description: "Knees off.".into(),
            }],
            frames: Vec::new(),
            started_at: created_at - Duration::seconds(30),
            created_at,
            feedback: Some(Feedback {
                text: "Nice work.".into(),
                source: FeedbackSource::LocalFallback,
            }),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let (_dir, db) = open();
        let original = report(ExerciseKind::Squat, 0);
        db.insert_report(&original).await.unwrap();

        let stored = db.get_report(original.session_id).await.unwrap().unwrap();
        assert_eq!(stored, original);
    }

    #[tokio::test]
    async fn test_get_missing_report_is_none() {
        let (_dir, db) = open();
        assert!(db.get_report(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_paginated() {
        let (_dir, db) = open();
        let oldest = report(ExerciseKind::Squat, 30);
        let middle = report(ExerciseKind::Plank, 20);
        let newest = report(ExerciseKind::Pushup, 10);
        for r in [&oldest, &middle, &newest] {
            db.insert_report(r).await.unwrap();
        }

        let first_page = db.list_reports_paginated(2, 0).await.unwrap();
        let ids: Vec<_> = first_page.iter().map(|s| s.id.clone()).collect();
        assert_eq!(
            ids,
            [newest.session_id.to_string(), middle.session_id.to_string()]
        );
        assert_eq!(first_page[1].duration_secs, Some(31.5));
        assert_eq!(first_page[0].error_count, 1);
        assert_eq!(
            first_page[0].feedback_source,
            Some(FeedbackSource::LocalFallback)
        );

        let second_page = db.list_reports_paginated(2, 2).await.unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].id, oldest.session_id.to_string());
    }

    #[tokio::test]
    async fn test_list_for_exercise_filters_by_kind() {
        let (_dir, db) = open();
        db.insert_report(&report(ExerciseKind::Squat, 5)).await.unwrap();
        db.insert_report(&report(ExerciseKind::Deadlift, 4)).await.unwrap();
        db.insert_report(&report(ExerciseKind::Squat, 3)).await.unwrap();

        let squats = db
            .list_reports_for_exercise(ExerciseKind::Squat, 10, 0)
            .await
            .unwrap();
        assert_eq!(squats.len(), 2);
        assert!(squats.iter().all(|s| s.kind == ExerciseKind::Squat));
    }

    #[tokio::test]
    async fn test_delete_report() {
        let (_dir, db) = open();
        let r = report(ExerciseKind::Squat, 0);
        db.insert_report(&r).await.unwrap();

        assert!(db.delete_report(r.session_id).await.unwrap());
        assert!(!db.delete_report(r.session_id).await.unwrap());
        assert!(db.get_report(r.session_id).await.unwrap().is_none());
    }
}
