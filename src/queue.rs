use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use rand::Rng;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::BotConfig;
use crate::metrics::METRICS;
use crate::types::{CompletionFn, Task, TaskKind};

/// Diagnostic view of one queued task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub kind: TaskKind,
    pub rank: i32,
    pub label: String,
}

#[derive(Default)]
struct QueueState {
    pending: Vec<Task>,
    admitted: HashMap<TaskKind, usize>,
    last_executed_at: Option<Instant>,
}

/// Prioritized, rate-limited task queue.
///
/// Admission is gated by a per-kind concurrency ceiling. Each call to
/// [`check_and_execute`](TaskQueue::check_and_execute) runs at most one
/// task: the queue is sorted by rank, every queued task is aged by one, and
/// the lowest-rank task is dispatched after the pacing floor and a random
/// jitter delay. Expired tasks are pruned without executing; failed tasks
/// are re-enqueued up to the configured retry bound.
pub struct TaskQueue {
    state: Mutex<QueueState>,
    /// Held for the duration of one scheduling cycle. A concurrent caller
    /// fails the try-lock and returns immediately.
    cycle: tokio::sync::Mutex<()>,
    gap: Duration,
    bias: Duration,
    max_retries: u32,
    on_complete: Mutex<Option<CompletionFn>>,
}

impl TaskQueue {
    pub fn new(config: &BotConfig) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            cycle: tokio::sync::Mutex::new(()),
            gap: config.task_gap,
            bias: config.task_bias,
            max_retries: config.max_retries,
            on_complete: Mutex::new(None),
        }
    }

    /// Sets the callback invoked with the outcome of every successful task.
    pub fn set_completion_callback(&self, callback: CompletionFn) {
        *self
            .on_complete
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    /// Builder form of [`set_completion_callback`](Self::set_completion_callback).
    pub fn with_completion_callback(self, callback: CompletionFn) -> Self {
        self.set_completion_callback(callback);
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admits a task into the queue.
    ///
    /// Returns `false` without mutating anything when the task's kind is
    /// already at its concurrency ceiling. This is the only back-pressure
    /// mechanism; the ceiling is not re-checked at execution time.
    pub fn enqueue(&self, task: Task) -> bool {
        let mut state = self.state();

        let count = state.admitted.get(&task.kind).copied().unwrap_or(0);
        if count >= task.kind.limit() {
            warn!(kind = %task.kind, label = %task.label, "admission rejected: kind at capacity");
            METRICS.inc_admission_rejected(task.kind.as_str());
            return false;
        }

        info!(kind = %task.kind, rank = task.rank, label = %task.label, "task admitted");
        state.admitted.insert(task.kind, count + 1);
        state.pending.push(task);
        METRICS.update_queue_size(state.pending.len() as i64);
        true
    }

    /// Number of tasks currently queued.
    pub fn len(&self) -> usize {
        self.state().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().pending.is_empty()
    }

    /// Diagnostic snapshot of the queue, in current storage order.
    pub fn snapshot(&self) -> Vec<TaskSnapshot> {
        self.state()
            .pending
            .iter()
            .map(|task| TaskSnapshot {
                kind: task.kind,
                rank: task.rank,
                label: task.label.clone(),
            })
            .collect()
    }

    /// Drops all pending tasks and resets the admission counters.
    pub fn clear(&self) {
        let mut state = self.state();
        state.pending.clear();
        state.admitted.clear();
        METRICS.update_queue_size(0);
        info!("task queue cleared");
    }

    /// Drops all pending tasks of one kind. Returns the number removed.
    pub fn remove_by_kind(&self, kind: TaskKind) -> usize {
        let mut state = self.state();
        let before = state.pending.len();
        state.pending.retain(|task| task.kind != kind);
        let removed = before - state.pending.len();
        state.admitted.insert(kind, 0);
        METRICS.update_queue_size(state.pending.len() as i64);
        info!(kind = %kind, removed, "removed tasks by kind");
        removed
    }

    /// Runs one scheduling cycle: selects, paces, and executes at most one
    /// task. Safe to call from a fixed-period loop; a call made while a
    /// cycle is already in flight returns immediately.
    pub async fn check_and_execute(&self) {
        let Ok(_guard) = self.cycle.try_lock() else {
            return;
        };
        self.execute_next().await;
    }

    async fn execute_next(&self) {
        loop {
            let (task, last_executed_at) = {
                let mut state = self.state();
                if state.pending.is_empty() {
                    return;
                }

                // Stable sort keeps arrival order among equal ranks.
                state.pending.sort_by_key(|task| task.rank);
                log_queue_status(&state.pending);

                // Priority aging: every queued task gains one rank per pass,
                // so nothing starves under a stream of high-priority work.
                for task in &mut state.pending {
                    task.rank -= 1;
                }

                let task = state.pending.remove(0);
                let counter = state.admitted.entry(task.kind).or_insert(0);
                *counter = counter.saturating_sub(1);
                METRICS.update_queue_size(state.pending.len() as i64);

                (task, state.last_executed_at)
            };

            debug!(label = %task.label, rank = task.rank, "checking task");

            let now = Instant::now();
            if task.is_expired(now) {
                warn!(kind = %task.kind, label = %task.label, "task expired, discarding");
                METRICS.inc_tasks_expired(task.kind.as_str());
                continue;
            }

            // A task that cannot survive the pacing delay is dropped now
            // instead of wasting the wait on it.
            if let Some(last) = last_executed_at {
                let expected_execute_at = last + self.gap + self.bias / 2;
                if task.is_expired(expected_execute_at) {
                    warn!(
                        kind = %task.kind,
                        label = %task.label,
                        "task would expire before dispatch, discarding"
                    );
                    METRICS.inc_tasks_expired(task.kind.as_str());
                    continue;
                }

                let since_last = now.duration_since(last);
                if since_last < self.gap {
                    let remaining = self.gap - since_last;
                    let delay_ms = remaining.as_millis() as u64;
                    debug!(delay_ms, "pacing floor delay");
                    sleep(remaining).await;
                }
            }

            let jitter_ms = rand::thread_rng().gen_range(0..=self.bias.as_millis() as u64);
            if jitter_ms > 0 {
                debug!(delay_ms = jitter_ms, "jitter delay");
                sleep(Duration::from_millis(jitter_ms)).await;
            }

            info!(label = %task.label, attempt = task.retry + 1, "dispatching task");
            let started = Instant::now();

            match (task.action)().await {
                Ok(outcome) => {
                    self.state().last_executed_at = Some(Instant::now());
                    METRICS.inc_tasks_executed(task.kind.as_str());
                    METRICS
                        .record_task_execution(task.kind.as_str(), started.elapsed().as_secs_f64());

                    let callback = self
                        .on_complete
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .clone();
                    if let Some(callback) = callback {
                        if let Err(e) = callback(outcome).await {
                            error!(error = %e, label = %task.label, "completion callback failed");
                            METRICS.record_error("queue", "callback");
                        }
                    }

                    info!(label = %task.label, "task completed");
                }
                Err(e) => {
                    error!(
                        label = %task.label,
                        attempt = task.retry + 1,
                        error = %e,
                        "task failed"
                    );
                    METRICS.record_error("queue", "task");

                    if task.retry < self.max_retries {
                        let mut task = task;
                        task.retry += 1;
                        METRICS.inc_tasks_retried(task.kind.as_str());
                        info!(label = %task.label, attempt = task.retry + 1, "re-enqueueing for retry");
                        // Re-admission re-checks the ceiling; a full kind
                        // silently drops the retry.
                        self.enqueue(task);
                    } else {
                        warn!(label = %task.label, "retries exhausted, discarding task");
                    }
                }
            }

            // At most one execution per cycle.
            break;
        }
    }
}

fn log_queue_status(pending: &[Task]) {
    if pending.is_empty() {
        return;
    }
    debug!("task queue:");
    for task in pending {
        debug!("> {:4} - {}", task.rank, task.label);
    }
}
