//! Condition engine.
//!
//! A [`Condition`] is a predicate evaluated by a worker immediately before it
//! would otherwise build a runner for a task. Skip-conditions short-circuit
//! on the first `true`; require-conditions short-circuit on the first
//! `false`. An error inside a predicate is handed to that predicate's own
//! `on_error` recovery before it is allowed to propagate.

use std::fmt;

/// Context handed to a condition predicate. Empty for now; the engine itself
/// never inspects it, it exists so a predicate can close over whatever
/// caller-supplied state it needs (working directory, exported env so far,
/// etc.) without the engine committing to a richer context type.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConditionContext;

#[derive(thiserror::Error, Debug)]
#[error("{0}")]
pub struct ConditionError(pub String);

/// What to do when a condition's predicate returns an error.
#[derive(Debug, Clone, Copy)]
pub enum Recovery {
    /// The error propagates; the condition's evaluation is a hard failure.
    Propagate,
    /// The error is swallowed and the condition is treated as if it had
    /// evaluated to `as_value`.
    RecoverAs(bool),
}

pub struct Condition {
    name: String,
    predicate: Box<dyn Fn(ConditionContext) -> Result<bool, ConditionError> + Send + Sync>,
    on_error: Box<dyn Fn(&ConditionError) -> Recovery + Send + Sync>,
    on_trigger: Box<dyn Fn() + Send + Sync>,
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition").field("name", &self.name).finish()
    }
}

impl Condition {
    pub fn new(
        name: impl Into<String>,
        predicate: impl Fn(ConditionContext) -> Result<bool, ConditionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
            on_error: Box::new(|_| Recovery::Propagate),
            on_trigger: Box::new(|| {}),
        }
    }

    /// Sets the error-recovery policy for this condition.
    pub fn with_on_error(
        mut self,
        on_error: impl Fn(&ConditionError) -> Recovery + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Box::new(on_error);
        self
    }

    /// Sets the side-effect logger invoked when this condition is the one
    /// that decided the outcome (skip fired, or require was unmet).
    pub fn with_on_trigger(mut self, on_trigger: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_trigger = Box::new(on_trigger);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, ctx: ConditionContext) -> Result<bool, ConditionError> {
        match (self.predicate)(ctx) {
            Ok(result) => Ok(result),
            Err(err) => match (self.on_error)(&err) {
                Recovery::Propagate => Err(err),
                Recovery::RecoverAs(value) => Ok(value),
            },
        }
    }
}

/// Evaluates an ordered list of skip-conditions. Returns `Ok(true)` on the
/// first condition that evaluates `true` (firing its `on_trigger`), `Ok(false)`
/// if none fire, or the first propagated error.
pub fn any_skip_fires(
    conditions: &[Condition],
    ctx: ConditionContext,
) -> Result<bool, ConditionError> {
    for condition in conditions {
        if condition.evaluate(ctx)? {
            (condition.on_trigger)();
            return Ok(true);
        }
    }
    Ok(false)
}

/// Evaluates an ordered list of require-conditions. Returns `Ok(true)` if all
/// are satisfied, `Ok(false)` on the first that is not (firing its
/// `on_trigger`), or the first propagated error.
pub fn all_requires_satisfied(
    conditions: &[Condition],
    ctx: ConditionContext,
) -> Result<bool, ConditionError> {
    for condition in conditions {
        if !condition.evaluate(ctx)? {
            (condition.on_trigger)();
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn skip_short_circuits_on_first_true() {
        let second_evaluated = Arc::new(AtomicBool::new(false));
        let second_evaluated_clone = second_evaluated.clone();

        let conditions = vec![
            Condition::new("first", |_| Ok(true)),
            Condition::new("second", move |_| {
                second_evaluated_clone.store(true, Ordering::SeqCst);
                Ok(true)
            }),
        ];

        assert!(any_skip_fires(&conditions, ConditionContext).unwrap());
        assert!(!second_evaluated.load(Ordering::SeqCst));
    }

    #[test]
    fn require_short_circuits_on_first_false() {
        let conditions = vec![Condition::new("unmet", |_| Ok(false))];
        assert!(!all_requires_satisfied(&conditions, ConditionContext).unwrap());
    }

    #[rstest]
    #[case::recover_as_true(Recovery::RecoverAs(true), Ok(true))]
    #[case::recover_as_false(Recovery::RecoverAs(false), Ok(false))]
    fn error_recovery(#[case] recovery: Recovery, #[case] expected: Result<bool, ()>) {
        let condition =
            Condition::new("flaky", |_| Err(ConditionError("boom".into())))
                .with_on_error(move |_| recovery);

        let result = any_skip_fires(std::slice::from_ref(&condition), ConditionContext);
        assert_eq!(result.map_err(|_| ()), expected);
    }

    #[test]
    fn error_propagates_without_recovery() {
        let condition = Condition::new("flaky", |_| Err(ConditionError("boom".into())));
        assert!(any_skip_fires(std::slice::from_ref(&condition), ConditionContext).is_err());
    }

    #[test]
    fn trigger_fires_once_on_decisive_condition() {
        let triggered = Arc::new(AtomicBool::new(false));
        let triggered_clone = triggered.clone();
        let condition = Condition::new("skip-me", |_| Ok(true))
            .with_on_trigger(move || triggered_clone.store(true, Ordering::SeqCst));

        any_skip_fires(std::slice::from_ref(&condition), ConditionContext).unwrap();
        assert!(triggered.load(Ordering::SeqCst));
    }
}
