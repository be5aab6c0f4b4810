// src/metrics.rs

#[cfg(feature = "metrics")]
mod metrics_impl {
    use once_cell::sync::Lazy;
    use prometheus::{
        register_histogram_vec, register_int_counter_vec, register_int_gauge, HistogramVec,
        IntCounterVec, IntGauge,
    };

    /// Metrics collection and reporting for the scheduling core.
    ///
    /// This module provides a simple metrics implementation that can be replaced
    /// with a more sophisticated one in production environments.
    pub struct Metrics {
        /// The counter for recording the total number of tasks executed.
        pub tasks_executed_total: IntCounterVec,
        /// The histogram for recording the duration of task executions.
        pub task_execution_duration: HistogramVec,
        /// The counter for recording tasks discarded due to expiry.
        pub tasks_expired_total: IntCounterVec,
        /// The counter for recording failed tasks that were re-enqueued.
        pub tasks_retried_total: IntCounterVec,
        /// The counter for recording admissions rejected at the kind ceiling.
        pub admission_rejected_total: IntCounterVec,
        /// The gauge for recording the current size of the task queue.
        pub task_queue_size: IntGauge,
        /// The counter for recording bot state transitions.
        pub state_transitions_total: IntCounterVec,
        /// The counter for recording error occurrences.
        pub error_count: IntCounterVec,
    }

    impl Metrics {
        /// Creates a new metrics instance.
        pub fn new() -> Self {
            Self {
                tasks_executed_total: register_int_counter_vec!(
                    "botsched_tasks_executed_total",
                    "Total number of tasks executed",
                    &["kind"]
                )
                .expect("failed to create counter"),
                task_execution_duration: register_histogram_vec!(
                    "botsched_task_execution_duration_seconds",
                    "Time taken to execute task actions",
                    &["kind"]
                )
                .expect("failed to create histogram"),
                tasks_expired_total: register_int_counter_vec!(
                    "botsched_tasks_expired_total",
                    "Total number of tasks discarded due to expiry",
                    &["kind"]
                )
                .expect("failed to create counter"),
                tasks_retried_total: register_int_counter_vec!(
                    "botsched_tasks_retried_total",
                    "Total number of failed tasks re-enqueued for retry",
                    &["kind"]
                )
                .expect("failed to create counter"),
                admission_rejected_total: register_int_counter_vec!(
                    "botsched_admission_rejected_total",
                    "Total number of tasks rejected at the kind concurrency ceiling",
                    &["kind"]
                )
                .expect("failed to create counter"),
                task_queue_size: register_int_gauge!(
                    "botsched_task_queue_size",
                    "Current number of pending tasks in the queue"
                )
                .expect("failed to create gauge"),
                state_transitions_total: register_int_counter_vec!(
                    "botsched_state_transitions_total",
                    "Total number of bot state transitions",
                    &["state"]
                )
                .expect("failed to create counter"),
                error_count: register_int_counter_vec!(
                    "botsched_errors_total",
                    "Total number of errors encountered",
                    &["component", "error_type"]
                )
                .expect("failed to create counter"),
            }
        }

        // Methods for recording metrics

        /// Increments the count of executed tasks.
        ///
        /// # Arguments
        ///
        /// * `kind` - The label identifying the task kind
        pub fn inc_tasks_executed(&self, kind: &str) {
            self.tasks_executed_total.with_label_values(&[kind]).inc();
        }

        /// Records the duration of a task execution.
        ///
        /// # Arguments
        ///
        /// * `kind` - The label identifying the task kind
        /// * `duration` - The duration of the task execution in seconds
        pub fn record_task_execution(&self, kind: &str, duration: f64) {
            self.task_execution_duration
                .with_label_values(&[kind])
                .observe(duration);
        }

        /// Increments the count of expired tasks.
        ///
        /// # Arguments
        ///
        /// * `kind` - The label identifying the task kind
        pub fn inc_tasks_expired(&self, kind: &str) {
            self.tasks_expired_total.with_label_values(&[kind]).inc();
        }

        /// Increments the count of retried tasks.
        ///
        /// # Arguments
        ///
        /// * `kind` - The label identifying the task kind
        pub fn inc_tasks_retried(&self, kind: &str) {
            self.tasks_retried_total.with_label_values(&[kind]).inc();
        }

        /// Increments the count of rejected admissions.
        ///
        /// # Arguments
        ///
        /// * `kind` - The label identifying the task kind
        pub fn inc_admission_rejected(&self, kind: &str) {
            self.admission_rejected_total
                .with_label_values(&[kind])
                .inc();
        }

        /// Updates the current size of the task queue.
        ///
        /// # Arguments
        ///
        /// * `size` - The current size of the queue
        pub fn update_queue_size(&self, size: i64) {
            self.task_queue_size.set(size);
        }

        /// Increments the count of state transitions.
        ///
        /// # Arguments
        ///
        /// * `state` - The label identifying the state entered
        pub fn inc_state_transitions(&self, state: &str) {
            self.state_transitions_total
                .with_label_values(&[state])
                .inc();
        }

        /// Records an error occurrence.
        ///
        /// # Arguments
        ///
        /// * `component` - The component where the error occurred
        /// * `error_type` - The type of error that occurred
        pub fn record_error(&self, component: &str, error_type: &str) {
            self.error_count
                .with_label_values(&[component, error_type])
                .inc();
        }
    }

    pub static METRICS: Lazy<Metrics> = Lazy::new(|| Metrics::new());
}

#[cfg(feature = "metrics")]
pub use metrics_impl::*;

////////////////////////////////////////////////////
// When the metrics feature is disabled, provide a stub
#[cfg(not(feature = "metrics"))]
mod metrics_stub {
    /// A mock metrics implementation for testing.
    ///
    /// This struct provides no-op implementations of all metrics methods
    /// to facilitate testing without requiring a real metrics backend.
    pub struct Metrics;

    impl Metrics {
        /// Creates a new mock metrics instance.
        pub fn new() -> Self {
            Metrics
        }

        /// Increments the count of executed tasks.
        ///
        /// # Arguments
        ///
        /// * `kind` - The label identifying the task kind
        pub fn inc_tasks_executed(&self, _kind: &str) {}

        /// Records the duration of a task execution.
        ///
        /// # Arguments
        ///
        /// * `kind` - The label identifying the task kind
        /// * `duration` - The duration of the task execution in seconds
        pub fn record_task_execution(&self, _kind: &str, _duration: f64) {}

        /// Increments the count of expired tasks.
        ///
        /// # Arguments
        ///
        /// * `kind` - The label identifying the task kind
        pub fn inc_tasks_expired(&self, _kind: &str) {}

        /// Increments the count of retried tasks.
        ///
        /// # Arguments
        ///
        /// * `kind` - The label identifying the task kind
        pub fn inc_tasks_retried(&self, _kind: &str) {}

        /// Increments the count of rejected admissions.
        ///
        /// # Arguments
        ///
        /// * `kind` - The label identifying the task kind
        pub fn inc_admission_rejected(&self, _kind: &str) {}

        /// Updates the current size of the task queue.
        ///
        /// # Arguments
        ///
        /// * `size` - The current size of the queue
        pub fn update_queue_size(&self, _size: i64) {}

        /// Increments the count of state transitions.
        ///
        /// # Arguments
        ///
        /// * `state` - The label identifying the state entered
        pub fn inc_state_transitions(&self, _state: &str) {}

        /// Records an error occurrence.
        ///
        /// # Arguments
        ///
        /// * `component` - The component where the error occurred
        /// * `error_type` - The type of error that occurred
        pub fn record_error(&self, _component: &str, _error_type: &str) {}
    }

    /// The global metrics instance used throughout the crate.
    ///
    /// This is a mock implementation used for testing that provides
    /// no-op implementations of all metrics methods.
    pub static METRICS: Metrics = Metrics;
}

#[cfg(not(feature = "metrics"))]
pub use metrics_stub::*;
