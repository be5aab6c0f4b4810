use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::Result;

/// A boxed future produced by a task action.
pub type ActionFuture = Pin<Box<dyn Future<Output = Result<TaskOutcome>> + Send>>;

/// A task action: a zero-argument asynchronous operation. Stored behind an
/// [`Arc`] so a failed task can be re-run on retry.
pub type ActionFn = Arc<dyn Fn() -> ActionFuture + Send + Sync>;

/// A boxed future produced by a hook (completion callback or state handler).
pub type HookFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// The completion callback invoked with the outcome of a successful task.
pub type CompletionFn = Arc<dyn Fn(TaskOutcome) -> HookFuture + Send + Sync>;

/// A state handler: an asynchronous callback with no arguments.
pub type HandlerFn = Arc<dyn Fn() -> HookFuture + Send + Sync>;

/// Classification of a task, determining its static priority rank and
/// concurrency ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Verify,
    Command,
    EmojiVerifyBattle,
    EmojiVerifyProfession,
    Treasure,
    Inventory,
    Food,
    Retainer,
    NewBattle,
    NewProfession,
    NewBattleWindow,
    NewProfessionWindow,
}

/// Static configuration for a task kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSetting {
    /// Default priority rank. Lower rank executes sooner.
    pub rank: i32,
    /// Maximum number of queued tasks of this kind.
    pub limit: usize,
}

impl TaskKind {
    /// All task kinds, for iteration.
    pub const ALL: [TaskKind; 12] = [
        TaskKind::Verify,
        TaskKind::Command,
        TaskKind::EmojiVerifyBattle,
        TaskKind::EmojiVerifyProfession,
        TaskKind::Treasure,
        TaskKind::Inventory,
        TaskKind::Food,
        TaskKind::Retainer,
        TaskKind::NewBattle,
        TaskKind::NewProfession,
        TaskKind::NewBattleWindow,
        TaskKind::NewProfessionWindow,
    ];

    /// The static (rank, limit) pair for this kind. Resolved at compile time
    /// and never mutated at runtime.
    pub const fn settings(self) -> KindSetting {
        match self {
            TaskKind::Verify => KindSetting {
                rank: -999,
                limit: 999,
            },
            TaskKind::Command => KindSetting {
                rank: -998,
                limit: 999,
            },
            TaskKind::EmojiVerifyBattle => KindSetting { rank: 2, limit: 1 },
            TaskKind::EmojiVerifyProfession => KindSetting { rank: 2, limit: 1 },
            TaskKind::Treasure => KindSetting {
                rank: 1,
                limit: 999,
            },
            TaskKind::Inventory => KindSetting { rank: 1, limit: 2 },
            TaskKind::Food => KindSetting { rank: 1, limit: 1 },
            TaskKind::Retainer => KindSetting { rank: 1, limit: 3 },
            TaskKind::NewBattle => KindSetting { rank: 3, limit: 1 },
            TaskKind::NewProfession => KindSetting { rank: 3, limit: 1 },
            TaskKind::NewBattleWindow => KindSetting { rank: 4, limit: 1 },
            TaskKind::NewProfessionWindow => KindSetting { rank: 4, limit: 1 },
        }
    }

    /// Default priority rank for this kind.
    pub const fn default_rank(self) -> i32 {
        self.settings().rank
    }

    /// Maximum number of queued tasks of this kind.
    pub const fn limit(self) -> usize {
        self.settings().limit
    }

    /// Stable label used in logs and metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            TaskKind::Verify => "Verify",
            TaskKind::Command => "Command",
            TaskKind::EmojiVerifyBattle => "EmojiVerifyBattle",
            TaskKind::EmojiVerifyProfession => "EmojiVerifyProfession",
            TaskKind::Treasure => "Treasure",
            TaskKind::Inventory => "Inventory",
            TaskKind::Food => "Food",
            TaskKind::Retainer => "Retainer",
            TaskKind::NewBattle => "NewBattle",
            TaskKind::NewProfession => "NewProfession",
            TaskKind::NewBattleWindow => "NewBattleWindow",
            TaskKind::NewProfessionWindow => "NewProfessionWindow",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work for the [`TaskQueue`](crate::queue::TaskQueue).
///
/// Tasks are prioritized by rank (lower executes sooner) and expire if not
/// dispatched before their deadline.
#[derive(Clone)]
pub struct Task {
    pub(crate) action: ActionFn,
    pub(crate) kind: TaskKind,
    pub(crate) rank: i32,
    pub(crate) expire_at: Instant,
    pub(crate) label: String,
    pub(crate) retry: u32,
}

impl Task {
    /// Creates a task with the kind's default rank.
    pub fn new<F, Fut>(
        kind: TaskKind,
        label: impl Into<String>,
        expire_at: Instant,
        action: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TaskOutcome>> + Send + 'static,
    {
        Self {
            action: Arc::new(move || Box::pin(action()) as ActionFuture),
            kind,
            rank: kind.default_rank(),
            expire_at,
            label: label.into(),
            retry: 0,
        }
    }

    /// Overrides the default rank.
    pub fn with_rank(mut self, rank: i32) -> Self {
        self.rank = rank;
        self
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn rank(&self) -> i32 {
        self.rank
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of retry attempts so far.
    pub fn retry_count(&self) -> u32 {
        self.retry
    }

    /// Whether the task's deadline is in the past relative to `at`.
    pub fn is_expired(&self, at: Instant) -> bool {
        self.expire_at < at
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("kind", &self.kind)
            .field("rank", &self.rank)
            .field("label", &self.label)
            .field("retry", &self.retry)
            .field("expire_at", &self.expire_at)
            .finish_non_exhaustive()
    }
}

/// The value returned by a successful task action.
///
/// An outcome may carry a next-state signal, which the
/// [`Controller`](crate::controller::Controller) turns into a state
/// transition. Any other content is opaque to the core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskOutcome {
    /// State the bot should transition to, if the task discovered one.
    pub next_state: Option<BotState>,
}

impl TaskOutcome {
    /// An outcome requesting a transition to `state`.
    pub fn transition(state: BotState) -> Self {
        Self {
            next_state: Some(state),
        }
    }
}

/// Operating state of the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BotState {
    Init,
    Running,
    Defeated,
    Blocked,
    Banned,
    Stopped,
}

impl BotState {
    /// States in which no further activity should be generated.
    pub fn is_terminal(self) -> bool {
        matches!(self, BotState::Defeated | BotState::Banned | BotState::Stopped)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            BotState::Init => "init",
            BotState::Running => "running",
            BotState::Defeated => "defeated",
            BotState::Blocked => "blocked",
            BotState::Banned => "banned",
            BotState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for BotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key identifying one of the recurring timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    Map,
    Profession,
    Verification,
}

impl TimerKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            TimerKey::Map => "map",
            TimerKey::Profession => "profession",
            TimerKey::Verification => "verification",
        }
    }
}

impl fmt::Display for TimerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient per-session data, cleared when the bot enters a terminal state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Reference to the active battle message, if any.
    pub battle_message: Option<String>,
    /// Reference to the active profession message, if any.
    pub profession_message: Option<String>,
    /// Reference to the pending verification image, if any.
    pub verify_image: Option<String>,
    /// Number of queued sell operations.
    pub pending_sells: u32,
}

impl Session {
    /// Clears all transient state.
    pub fn reset(&mut self) {
        self.battle_message = None;
        self.profession_message = None;
        self.verify_image = None;
        self.pending_sells = 0;
    }
}

/// The narrow boundary to the chat-protocol client.
///
/// The core only needs to push command strings; message parsing, embeds and
/// component interactions live entirely behind this trait.
#[async_trait]
pub trait CommandSink: Send + Sync {
    /// Sends a command string to the channel the bot operates in.
    async fn send(&self, command: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_settings_for_all_kinds() {
        for kind in TaskKind::ALL {
            let setting = kind.settings();
            assert!(setting.limit >= 1);
            assert_eq!(setting.rank, kind.default_rank());
        }
    }

    #[test]
    fn test_verify_outranks_everything() {
        assert_eq!(TaskKind::Verify.default_rank(), -999);
        assert_eq!(TaskKind::Command.default_rank(), -998);
        for kind in TaskKind::ALL {
            if kind != TaskKind::Verify {
                assert!(kind.default_rank() > TaskKind::Verify.default_rank());
            }
        }
    }

    #[test]
    fn test_kind_limits() {
        assert_eq!(TaskKind::Food.limit(), 1);
        assert_eq!(TaskKind::Inventory.limit(), 2);
        assert_eq!(TaskKind::Retainer.limit(), 3);
        assert_eq!(TaskKind::Verify.limit(), 999);
    }

    #[test]
    fn test_task_default_rank_from_kind() {
        let now = Instant::now();
        let task = Task::new(TaskKind::Verify, "verify", now + Duration::from_secs(60), || async {
            Ok(TaskOutcome::default())
        });
        assert_eq!(task.rank(), -999);

        let task = task.with_rank(7);
        assert_eq!(task.rank(), 7);
    }

    #[test]
    fn test_task_expiry() {
        let now = Instant::now();
        let task = Task::new(TaskKind::Command, "cmd", now + Duration::from_secs(1), || async {
            Ok(TaskOutcome::default())
        });
        assert!(!task.is_expired(now));
        assert!(task.is_expired(now + Duration::from_secs(2)));
    }

    #[test]
    fn test_outcome_transition() {
        assert_eq!(TaskOutcome::default().next_state, None);
        assert_eq!(
            TaskOutcome::transition(BotState::Blocked).next_state,
            Some(BotState::Blocked)
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(BotState::Defeated.is_terminal());
        assert!(BotState::Banned.is_terminal());
        assert!(BotState::Stopped.is_terminal());
        assert!(!BotState::Init.is_terminal());
        assert!(!BotState::Running.is_terminal());
        assert!(!BotState::Blocked.is_terminal());
    }
}
