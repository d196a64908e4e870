//! Status manager: tracks the current [`TaskStatus`] of every scheduled
//! execution and rolls a set of them up into a single aggregate status.
//!
//! Representation is bucketed: one `DashMap<ExecutionId, ()>` set per status
//! (in [`TaskStatus::BUCKET_ORDER`]), rather than a single id-to-status map.
//! A task id lives in exactly one bucket at a time; `register`/`update` move
//! it there by removing it from every bucket first, then inserting into the
//! target one. This trades a slightly more expensive write (five removes
//! instead of one upsert) for an `aggregate` that only ever needs membership
//! tests against whichever buckets its priority rule cares about, which
//! dominates the hot path during scheduling — `aggregate` runs once per
//! state-change notification, `register`/`update` once per status
//! transition.
//!
//! [`StatusManager::prepare_task`] performs the Waiting-to-Running transition
//! synchronously and returns whether the caller actually won the transition,
//! so two workers racing to start the same task never both spawn it.

use crate::model::ids::ExecutionId;
use crate::model::status::TaskStatus;
use dashmap::DashMap;

const NUM_BUCKETS: usize = TaskStatus::BUCKET_ORDER.len();

pub struct StatusManager {
    buckets: [DashMap<ExecutionId, ()>; NUM_BUCKETS],
}

impl Default for StatusManager {
    fn default() -> Self {
        Self::new()
    }
}

fn bucket_index(status: TaskStatus) -> usize {
    TaskStatus::BUCKET_ORDER
        .iter()
        .position(|candidate| *candidate == status)
        .expect("TaskStatus::Undefined has no bucket and must never reach the status manager")
}

impl StatusManager {
    pub fn new() -> Self {
        Self {
            buckets: [
                DashMap::new(),
                DashMap::new(),
                DashMap::new(),
                DashMap::new(),
                DashMap::new(),
            ],
        }
    }

    fn evict(&self, id: ExecutionId) {
        for bucket in &self.buckets {
            bucket.remove(&id);
        }
    }

    /// Registers `id` with its initial status. Re-registering an id
    /// overwrites its previous status.
    pub fn register(&self, id: ExecutionId, initial: TaskStatus) {
        self.evict(id);
        self.buckets[bucket_index(initial)].insert(id, ());
    }

    /// Moves `id` to `status`. A no-op if `id` is already at `status`.
    pub fn update(&self, id: ExecutionId, status: TaskStatus) {
        self.evict(id);
        self.buckets[bucket_index(status)].insert(id, ());
    }

    pub fn status_of(&self, id: ExecutionId) -> Option<TaskStatus> {
        TaskStatus::BUCKET_ORDER
            .iter()
            .zip(&self.buckets)
            .find_map(|(status, bucket)| bucket.contains_key(&id).then_some(*status))
    }

    /// Atomically transitions `id` from `Waiting` to `Running`, returning
    /// `true` only if this call performed the transition. A second caller
    /// racing to start the same task observes `false` and does not spawn a
    /// duplicate process.
    pub fn prepare_task(&self, id: ExecutionId) -> bool {
        let waiting = &self.buckets[bucket_index(TaskStatus::Waiting)];
        if waiting.remove(&id).is_some() {
            self.buckets[bucket_index(TaskStatus::Running)].insert(id, ());
            true
        } else {
            false
        }
    }

    /// Rolls up the statuses of `ids` into a single status, in priority
    /// order: any `NotPlan` wins outright, then any `Failed`, then "all
    /// `Success`", then "all `Waiting`", else `Running`.
    ///
    /// Panics on an empty `ids` slice — calling this with nothing to
    /// aggregate is a caller bug.
    pub fn aggregate(&self, ids: &[ExecutionId]) -> TaskStatus {
        assert!(!ids.is_empty(), "aggregate: ids argument is empty");

        let not_plan = &self.buckets[bucket_index(TaskStatus::NotPlan)];
        if ids.iter().any(|id| not_plan.contains_key(id)) {
            return TaskStatus::NotPlan;
        }

        let failed = &self.buckets[bucket_index(TaskStatus::Failed)];
        if ids.iter().any(|id| failed.contains_key(id)) {
            return TaskStatus::Failed;
        }

        let success = &self.buckets[bucket_index(TaskStatus::Success)];
        if ids.iter().all(|id| success.contains_key(id)) {
            return TaskStatus::Success;
        }

        let waiting = &self.buckets[bucket_index(TaskStatus::Waiting)];
        if ids.iter().all(|id| waiting.contains_key(id)) {
            return TaskStatus::Waiting;
        }

        TaskStatus::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_task_transitions_waiting_to_running_once() {
        let manager = StatusManager::new();
        let id = ExecutionId::new();
        manager.register(id, TaskStatus::Waiting);

        assert!(manager.prepare_task(id));
        assert_eq!(manager.status_of(id), Some(TaskStatus::Running));
        assert!(!manager.prepare_task(id));
    }

    #[test]
    fn a_task_lives_in_exactly_one_bucket_after_repeated_updates() {
        let manager = StatusManager::new();
        let id = ExecutionId::new();
        manager.register(id, TaskStatus::Waiting);
        manager.update(id, TaskStatus::Running);
        manager.update(id, TaskStatus::Success);

        assert_eq!(manager.status_of(id), Some(TaskStatus::Success));
        let occupied = manager
            .buckets
            .iter()
            .filter(|bucket| bucket.contains_key(&id))
            .count();
        assert_eq!(occupied, 1);
    }

    #[test]
    fn aggregate_prioritizes_not_plan_over_everything() {
        let manager = StatusManager::new();
        let a = ExecutionId::new();
        let b = ExecutionId::new();
        manager.register(a, TaskStatus::Failed);
        manager.register(b, TaskStatus::NotPlan);

        assert_eq!(manager.aggregate(&[a, b]), TaskStatus::NotPlan);
    }

    #[test]
    fn aggregate_prioritizes_failed_over_success() {
        let manager = StatusManager::new();
        let a = ExecutionId::new();
        let b = ExecutionId::new();
        manager.register(a, TaskStatus::Success);
        manager.register(b, TaskStatus::Failed);

        assert_eq!(manager.aggregate(&[a, b]), TaskStatus::Failed);
    }

    #[test]
    fn aggregate_is_success_only_when_all_succeed() {
        let manager = StatusManager::new();
        let a = ExecutionId::new();
        let b = ExecutionId::new();
        manager.register(a, TaskStatus::Success);
        manager.register(b, TaskStatus::Success);

        assert_eq!(manager.aggregate(&[a, b]), TaskStatus::Success);
    }

    #[test]
    fn aggregate_is_waiting_only_when_all_waiting() {
        let manager = StatusManager::new();
        let a = ExecutionId::new();
        let b = ExecutionId::new();
        manager.register(a, TaskStatus::Waiting);
        manager.register(b, TaskStatus::Waiting);

        assert_eq!(manager.aggregate(&[a, b]), TaskStatus::Waiting);
    }

    #[test]
    fn aggregate_falls_back_to_running_for_a_mixed_set() {
        let manager = StatusManager::new();
        let a = ExecutionId::new();
        let b = ExecutionId::new();
        manager.register(a, TaskStatus::Success);
        manager.register(b, TaskStatus::Waiting);

        assert_eq!(manager.aggregate(&[a, b]), TaskStatus::Running);
    }

    #[test]
    #[should_panic(expected = "ids argument is empty")]
    fn aggregate_panics_on_empty_input() {
        let manager = StatusManager::new();
        manager.aggregate(&[]);
    }
}
