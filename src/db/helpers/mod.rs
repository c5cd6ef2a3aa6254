use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::analysis::FeedbackSource;
use crate::exercise::ExerciseKind;

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_kind(value: &str) -> Result<ExerciseKind> {
    value
        .parse()
        .map_err(|_| anyhow!("unknown exercise kind {value}"))
}

pub fn parse_feedback_source(value: Option<String>) -> Result<Option<FeedbackSource>> {
    match value.as_deref() {
        None => Ok(None),
        Some("collaborator") => Ok(Some(FeedbackSource::Collaborator)),
        Some("local_fallback") => Ok(Some(FeedbackSource::LocalFallback)),
        Some(other) => Err(anyhow!("unknown feedback source {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_counts_are_rejected() {
        assert!(to_u64(-1, "repetitions").is_err());
        assert_eq!(to_u64(7, "repetitions").unwrap(), 7);
    }

    #[test]
    fn test_feedback_source_strings() {
        for source in [FeedbackSource::Collaborator, FeedbackSource::LocalFallback] {
            let parsed = parse_feedback_source(Some(source.as_str().to_string())).unwrap();
            assert_eq!(parsed, Some(source));
        }
        assert!(parse_feedback_source(Some("generic".into())).is_err());
    }
}
