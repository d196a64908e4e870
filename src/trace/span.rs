//! Span: a named interval nested under a [`super::tracer::Tracer`]. A span
//! holds an `Arc<Span>` to its parent so the chain stays alive for as long as
//! any descendant does.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub struct Span {
    name: String,
    id: Uuid,
    parent: Option<Arc<Span>>,
    trace_id: Uuid,
    begin_at: DateTime<Utc>,
    end_at: Mutex<Option<DateTime<Utc>>>,
    attrs: serde_json::Map<String, serde_json::Value>,
}

impl Span {
    pub(super) fn new(
        trace_id: Uuid,
        parent: Option<Arc<Span>>,
        name: impl Into<String>,
        attrs: serde_json::Map<String, serde_json::Value>,
    ) -> Arc<Span> {
        Arc::new(Span {
            name: name.into(),
            id: Uuid::now_v7(),
            parent,
            trace_id,
            begin_at: Utc::now(),
            end_at: Mutex::new(None),
            attrs,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }

    pub fn parent(&self) -> Option<&Arc<Span>> {
        self.parent.as_ref()
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    pub fn attr(&self, key: &str) -> Option<&serde_json::Value> {
        self.attrs.get(key)
    }

    pub fn begin_at(&self) -> DateTime<Utc> {
        self.begin_at
    }

    pub fn end_at(&self) -> Option<DateTime<Utc>> {
        *self.end_at.lock().unwrap()
    }

    pub fn is_closed(&self) -> bool {
        self.end_at().is_some()
    }

    /// Creates a child span of `self`, panicking if `self` has already been
    /// closed — mirroring `WithSpan`'s panic on a closed parent, since
    /// resuming work under an already-ended span is a programming error, not
    /// a recoverable condition.
    pub fn child(
        self: &Arc<Self>,
        name: impl Into<String>,
        attrs: serde_json::Map<String, serde_json::Value>,
    ) -> Arc<Span> {
        if self.is_closed() {
            panic!(
                "span '{}' (beginAt: {}) has already ended",
                self.name,
                self.begin_at.to_rfc3339()
            );
        }
        Span::new(self.trace_id, Some(self.clone()), name, attrs)
    }

    /// Closes this span. Idempotent: closing twice only records the first
    /// end time.
    pub fn close(&self) {
        let mut end_at = self.end_at.lock().unwrap();
        if end_at.is_none() {
            *end_at = Some(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Arc<Span> {
        Span::new(Uuid::now_v7(), None, "root", serde_json::Map::new())
    }

    #[test]
    fn child_inherits_trace_id() {
        let parent = root();
        let child = parent.child("step", serde_json::Map::new());
        assert_eq!(child.trace_id(), parent.trace_id());
        assert!(child.has_parent());
    }

    #[test]
    fn close_is_idempotent() {
        let span = root();
        span.close();
        let first_end = span.end_at();
        span.close();
        assert_eq!(span.end_at(), first_end);
    }

    #[test]
    #[should_panic(expected = "has already ended")]
    fn child_of_closed_span_panics() {
        let parent = root();
        parent.close();
        parent.child("too-late", serde_json::Map::new());
    }
}
