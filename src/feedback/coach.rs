use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::fallback::local_feedback;
use super::provider::FeedbackProvider;
use super::request::build_request;
use crate::analysis::{Feedback, FeedbackSource, Report};
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// Fills in `report.feedback`, asking `provider` first and falling back to
/// the local text on failure, timeout or cancellation.
pub async fn attach_feedback(
    report: Report,
    provider: Option<&dyn FeedbackProvider>,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Report {
    let Some(provider) = provider else {
        return with_fallback(report);
    };

    let request = build_request(&report);
    let outcome = tokio::select! {
        result = tokio::time::timeout(timeout, provider.generate(&request)) => result,
        _ = cancel.cancelled() => {
            log_info!("feedback request to {} cancelled", provider.name());
            return with_fallback(report);
        }
    };

    match outcome {
        Ok(Ok(text)) => {
            log_info!(
                "received {} chars of feedback from {}",
                text.len(),
                provider.name()
            );
            report.with_feedback(Feedback {
                text,
                source: FeedbackSource::Collaborator,
            })
        }
        Ok(Err(err)) => {
            log_warn!("feedback provider {} failed: {err}", provider.name());
            with_fallback(report)
        }
        Err(_) => {
            log_warn!(
                "feedback provider {} timed out (> {}s)",
                provider.name(),
                timeout.as_secs_f64()
            );
            with_fallback(report)
        }
    }
}

fn with_fallback(report: Report) -> Report {
    let text = local_feedback(&report);
    report.with_feedback(Feedback {
        text,
        source: FeedbackSource::LocalFallback,
    })
}
