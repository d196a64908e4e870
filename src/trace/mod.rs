//! Hand-rolled per-task tracing, distinct from the engine's own operational
//! logging in [`crate::logging`]. A [`tracer::Tracer`] covers one run; a
//! [`span::Span`] covers one task within it; a [`record::LogRecord`] is one
//! structured line emitted against a span, sent over a channel to whatever
//! sink the caller wired up rather than printed directly.

pub mod record;
pub mod span;
pub mod tracer;

pub use record::{display_attr, error_attr, time_attr, LogRecord};
pub use span::Span;
pub use tracer::{new_tracer_and_root_span, Tracer};
