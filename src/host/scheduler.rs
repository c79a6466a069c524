//! Deferred-task scheduler with a virtual clock.
//!
//! The host runs one shared, single-threaded event loop. Operations that
//! need a short deferral (document-load settle, page-hide repaint, media
//! force-attach) enqueue a task here instead of sleeping. Time only moves
//! when the owner calls [`Scheduler::advance`] or
//! [`Scheduler::run_until_idle`], so tests drive deferrals deterministically.
//!
//! Tasks run outside the queue lock, so a running task may schedule new
//! tasks. Tasks are never cancelled; callbacks are expected to detect stale
//! references and degrade to no-ops.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use crate::identifiers::TaskId;

// ============================================================================
// Types
// ============================================================================

/// A queued deferred task.
struct Task {
    /// Identifier, for logging.
    id: TaskId,
    /// Virtual deadline.
    deadline: Duration,
    /// Insertion order tiebreaker for equal deadlines.
    seq: u64,
    /// The callback.
    run: Box<dyn FnOnce() + Send>,
}

/// Queue state behind the lock.
struct SchedulerState {
    /// Current virtual time.
    now: Duration,
    /// Next insertion sequence number.
    seq: u64,
    /// Pending tasks, unordered; selection scans for the earliest.
    tasks: Vec<Task>,
}

/// Internal shared state.
struct SchedulerInner {
    state: Mutex<SchedulerState>,
}

// ============================================================================
// Scheduler
// ============================================================================

/// Handle to the shared deferred-task queue.
///
/// Cheap to clone; all clones share one queue and one virtual clock.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Scheduler")
            .field("now", &state.now)
            .field("pending", &state.tasks.len())
            .finish()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Scheduler - Implementation
// ============================================================================

impl Scheduler {
    /// Creates an empty scheduler at virtual time zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                state: Mutex::new(SchedulerState {
                    now: Duration::ZERO,
                    seq: 0,
                    tasks: Vec::new(),
                }),
            }),
        }
    }

    /// Returns the current virtual time.
    #[inline]
    #[must_use]
    pub fn now(&self) -> Duration {
        self.inner.state.lock().now
    }

    /// Returns the number of pending tasks.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.state.lock().tasks.len()
    }

    /// Enqueues `run` to fire `delay` after the current virtual time.
    pub fn schedule(&self, delay: Duration, run: impl FnOnce() + Send + 'static) -> TaskId {
        let id = TaskId::next();
        let mut state = self.inner.state.lock();
        let deadline = state.now + delay;
        let seq = state.seq;
        state.seq += 1;
        state.tasks.push(Task {
            id,
            deadline,
            seq,
            run: Box::new(run),
        });
        trace!(task_id = %id, deadline_ms = deadline.as_millis() as u64, "Task scheduled");
        id
    }

    /// Advances the virtual clock by `delta`, running every task whose
    /// deadline falls within the advanced span, in deadline order.
    pub fn advance(&self, delta: Duration) {
        let target = {
            let state = self.inner.state.lock();
            state.now + delta
        };
        loop {
            let task = {
                let mut state = self.inner.state.lock();
                match Self::earliest_index(&state.tasks) {
                    Some(idx) if state.tasks[idx].deadline <= target => {
                        let task = state.tasks.swap_remove(idx);
                        state.now = state.now.max(task.deadline);
                        task
                    }
                    _ => {
                        state.now = target;
                        break;
                    }
                }
            };
            trace!(task_id = %task.id, "Task firing");
            (task.run)();
        }
    }

    /// Runs every pending task (including tasks scheduled by running tasks),
    /// advancing the virtual clock as far as needed.
    pub fn run_until_idle(&self) {
        loop {
            let task = {
                let mut state = self.inner.state.lock();
                match Self::earliest_index(&state.tasks) {
                    Some(idx) => {
                        let task = state.tasks.swap_remove(idx);
                        state.now = state.now.max(task.deadline);
                        task
                    }
                    None => break,
                }
            };
            trace!(task_id = %task.id, "Task firing");
            (task.run)();
        }
    }

    /// Index of the task with the earliest (deadline, seq) pair.
    fn earliest_index(tasks: &[Task]) -> Option<usize> {
        tasks
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| (t.deadline, t.seq))
            .map(|(idx, _)| idx)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_advance_runs_due_tasks_in_order() {
        let scheduler = Scheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = Arc::clone(&order);
        scheduler.schedule(Duration::from_millis(200), move || o.lock().push("late"));
        let o = Arc::clone(&order);
        scheduler.schedule(Duration::from_millis(100), move || o.lock().push("early"));

        scheduler.advance(Duration::from_millis(150));
        assert_eq!(*order.lock(), vec!["early"]);

        scheduler.advance(Duration::from_millis(100));
        assert_eq!(*order.lock(), vec!["early", "late"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_equal_deadlines_fire_in_insertion_order() {
        let scheduler = Scheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for label in ["a", "b", "c"] {
            let o = Arc::clone(&order);
            scheduler.schedule(Duration::from_millis(50), move || o.lock().push(label));
        }
        scheduler.advance(Duration::from_millis(50));
        assert_eq!(*order.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_task_may_schedule_another_task() {
        let scheduler = Scheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let sched = scheduler.clone();
        let f = Arc::clone(&fired);
        scheduler.schedule(Duration::from_millis(10), move || {
            f.fetch_add(1, Ordering::SeqCst);
            let f2 = Arc::clone(&f);
            sched.schedule(Duration::from_millis(10), move || {
                f2.fetch_add(1, Ordering::SeqCst);
            });
        });

        scheduler.run_until_idle();
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_clock_advances_without_tasks() {
        let scheduler = Scheduler::new();
        scheduler.advance(Duration::from_millis(75));
        assert_eq!(scheduler.now(), Duration::from_millis(75));
    }
}
