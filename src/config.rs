use std::time::Duration;

/// Construction-time configuration for the scheduling core.
///
/// All values are plain scalars; loading and validating them from a file is
/// a caller concern.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Minimum delay between two consecutive task dispatches.
    pub task_gap: Duration,

    /// Ceiling of the uniformly-random jitter added on top of the gap.
    pub task_bias: Duration,

    /// Maximum retry attempts for a failed task.
    pub max_retries: u32,

    /// Period of the controller's check loop.
    pub check_interval: Duration,

    /// Interval of the recurring map/profession/verification timers.
    pub timer_interval: Duration,

    /// Expiry window for the recurring tasks the timers enqueue.
    pub task_expiry: Duration,

    /// Profession command to repeat (e.g. `"mine"`). `None` disables the
    /// profession timer entirely.
    pub profession: Option<String>,
}

impl BotConfig {
    pub fn new() -> Self {
        Self {
            task_gap: Duration::from_millis(2000),
            task_bias: Duration::from_millis(3000),
            max_retries: 2,
            check_interval: Duration::from_secs(1),
            timer_interval: Duration::from_secs(60),
            task_expiry: Duration::from_secs(180),
            profession: None,
        }
    }

    pub fn with_task_gap(mut self, gap: Duration) -> Self {
        self.task_gap = gap;
        self
    }

    pub fn with_task_bias(mut self, bias: Duration) -> Self {
        self.task_bias = bias;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn with_timer_interval(mut self, interval: Duration) -> Self {
        self.timer_interval = interval;
        self
    }

    pub fn with_task_expiry(mut self, expiry: Duration) -> Self {
        self.task_expiry = expiry;
        self
    }

    pub fn with_profession(mut self, profession: impl Into<String>) -> Self {
        self.profession = Some(profession.into());
        self
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self::new()
    }
}
