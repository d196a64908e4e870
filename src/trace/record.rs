//! Attribute encoding rules and the [`LogRecord`] a [`super::span::Span`]
//! emits: an error becomes its message string, a timestamp becomes RFC3339
//! with nanosecond precision, anything implementing `Display` becomes its
//! rendered string, everything else is passed through as-is.
//!
//! `serde_json::Value` gives a native JSON representation for all of these,
//! so attributes are produced as `Value`s directly rather than through an
//! intermediate byte buffer.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use super::span::Span;

/// Encodes an error attribute as its display string, not a structured
/// breakdown.
pub fn error_attr(err: &dyn std::error::Error) -> serde_json::Value {
    serde_json::Value::String(err.to_string())
}

/// Encodes a timestamp as RFC3339 with nanosecond precision.
pub fn time_attr(at: DateTime<Utc>) -> serde_json::Value {
    serde_json::Value::String(at.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true))
}

/// Encodes anything `Display` as its rendered string.
pub fn display_attr(value: impl fmt::Display) -> serde_json::Value {
    serde_json::Value::String(value.to_string())
}

/// One structured log line attached to a span. The level follows
/// [`tracing::Level`] since engine-side code already imports it for its own
/// operational logging; task-tracing and engine-logging share a severity
/// vocabulary even though they flow through different sinks.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub span: Arc<Span>,
    pub level: tracing::Level,
    pub message: String,
    pub attrs: serde_json::Map<String, serde_json::Value>,
    /// `file:line` of the call site that produced this record.
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl LogRecord {
    /// Builds a record stamped with the call site's `file:line`, the way
    /// Go's `slog` captures `PC` at the logging call rather than at the
    /// sink. Call this directly from the site emitting the log, not from a
    /// shared helper a few frames removed, or the source will point at the
    /// helper instead of the real origin.
    #[track_caller]
    pub fn new(
        span: Arc<Span>,
        level: tracing::Level,
        message: impl Into<String>,
        attrs: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        let location = std::panic::Location::caller();
        Self {
            span,
            level,
            message: message.into(),
            attrs,
            source: format!("{}:{}", location.file(), location.line()),
            created_at: Utc::now(),
        }
    }

    pub fn span_id(&self) -> String {
        self.span.id().to_string()
    }

    pub fn trace_id(&self) -> String {
        self.span.trace_id().to_string()
    }
}
