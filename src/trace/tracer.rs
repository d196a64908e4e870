//! Tracer: owns the root span of one traced operation and indexes every span
//! created under it.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::span::Span;

pub struct Tracer {
    name: String,
    id: Uuid,
    spans: DashMap<Uuid, Arc<Span>>,
    begin_at: DateTime<Utc>,
    end_at: Mutex<Option<DateTime<Utc>>>,
}

impl Tracer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn begin_at(&self) -> DateTime<Utc> {
        self.begin_at
    }

    pub fn end_at(&self) -> Option<DateTime<Utc>> {
        *self.end_at.lock().unwrap()
    }

    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    fn register_span(&self, span: &Arc<Span>) {
        self.spans.insert(span.id(), span.clone());
    }
}

/// Creates a new tracer and its root span. Returns the tracer, the root
/// span, and a closer that ends both when the traced operation is done.
pub fn new_tracer_and_root_span(
    name: impl Into<String>,
    attrs: serde_json::Map<String, serde_json::Value>,
) -> (Arc<Tracer>, Arc<Span>, impl FnOnce()) {
    let name = name.into();
    let tracer = Arc::new(Tracer {
        name: name.clone(),
        id: Uuid::now_v7(),
        spans: DashMap::new(),
        begin_at: Utc::now(),
        end_at: Mutex::new(None),
    });

    let root = Span::new(tracer.id, None, name, attrs);
    tracer.register_span(&root);

    let closer_tracer = tracer.clone();
    let closer_root = root.clone();
    let closer = move || {
        closer_root.close();
        let mut end_at = closer_tracer.end_at.lock().unwrap();
        if end_at.is_none() {
            *end_at = Some(Utc::now());
        }
    };

    (tracer, root, closer)
}

/// Registers a freshly created span under `tracer`, the way
/// `Tracer.registerSpan` tracks every span it creates so the tracer's span
/// count stays accurate for callers that want to report it.
pub fn register(tracer: &Tracer, span: &Arc<Span>) {
    tracer.register_span(span);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_span_is_registered_and_unparented() {
        let (tracer, root, _closer) = new_tracer_and_root_span("run", serde_json::Map::new());
        assert_eq!(tracer.span_count(), 1);
        assert!(!root.has_parent());
        assert_eq!(root.trace_id(), tracer.id());
    }

    #[test]
    fn closer_closes_root_and_stamps_tracer_end() {
        let (tracer, root, closer) = new_tracer_and_root_span("run", serde_json::Map::new());
        closer();
        assert!(root.is_closed());
        assert!(tracer.end_at().is_some());
    }

    #[test]
    fn child_spans_can_be_registered_explicitly() {
        let (tracer, root, _closer) = new_tracer_and_root_span("run", serde_json::Map::new());
        let child = root.child("step", serde_json::Map::new());
        register(&tracer, &child);
        assert_eq!(tracer.span_count(), 2);
    }
}
