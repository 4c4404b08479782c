//! Operator-visible failure reporting.
//!
//! The fetcher never surfaces errors to the rendering layer; recurring
//! failures go through this channel instead, at most once per escalation
//! window per feed (see the failure policy in `feed::fetcher`).

use chrono::{DateTime, Utc};

/// Diagnostic context attached to a failure report.
#[derive(Debug, Clone)]
pub struct FailureContext {
    /// The feed URL as requested (not the normalized cache key).
    pub feed_url: String,
    /// Body snippet from the failed response, when one was captured (parse
    /// failures have one, connection failures do not).
    pub response_body: Option<String>,
    /// Wall-clock time when the retry suppression lapses and the next fetch
    /// attempt (and therefore the next possible notification) can happen.
    pub next_notification: DateTime<Utc>,
}

/// Where recurring fetch failures get surfaced to operators.
pub trait Reporter: Send + Sync {
    fn report(&self, message: &str, context: &FailureContext);
}

/// Default reporter: a structured error-level trace event.
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, message: &str, context: &FailureContext) {
        tracing::error!(
            feed = %context.feed_url,
            error = %message,
            next_notification = %context.next_notification.to_rfc3339(),
            body = context.response_body.as_deref().unwrap_or(""),
            "Feed fetch failing repeatedly"
        );
    }
}
