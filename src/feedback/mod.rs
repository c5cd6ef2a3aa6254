//! Turning a finished [`Report`](crate::analysis::Report) into coaching text:
//! the request sent to the feedback service, the providers that call it, and
//! the local text used when it is unavailable.

pub mod coach;
pub mod fallback;
pub mod provider;
pub mod request;

pub use coach::attach_feedback;
pub use fallback::local_feedback;
pub use provider::{
    from_settings, ChatCompletionsProvider, FeedbackError, FeedbackProvider, RelayProvider,
};
pub use request::{build_request, FeedbackMetadata, FeedbackRequest};
