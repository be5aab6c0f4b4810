use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::config::BotConfig;
use crate::queue::TaskQueue;
use crate::state::StateMachine;
use crate::timer::TimerSet;
use crate::types::{
    BotState, CommandSink, HookFuture, Session, Task, TaskKind, TaskOutcome, TimerKey,
};

/// Composes the [`TaskQueue`], [`StateMachine`] and [`TimerSet`] into the
/// closed feedback loop that drives the bot.
///
/// The controller owns the fixed-period check loop, wires task outcomes to
/// state transitions, and wires state transitions to the recurring timers
/// that keep enqueueing work. External observers influence it only through
/// [`add_task`](Controller::add_task) and
/// [`update_state`](Controller::update_state).
pub struct Controller {
    inner: Arc<Inner>,
}

struct Inner {
    config: BotConfig,
    queue: TaskQueue,
    machine: StateMachine,
    timers: TimerSet,
    sink: Arc<dyn CommandSink>,
    session: Mutex<Session>,
    check_loop: Mutex<Option<JoinHandle<()>>>,
}

impl Controller {
    pub fn new(config: BotConfig, sink: Arc<dyn CommandSink>) -> Self {
        let inner = Arc::new(Inner {
            queue: TaskQueue::new(&config),
            machine: StateMachine::new(),
            timers: TimerSet::new(config.timer_interval),
            sink,
            session: Mutex::new(Session::default()),
            check_loop: Mutex::new(None),
            config,
        });

        // Task outcomes carrying a next-state signal drive transitions.
        let weak = Arc::downgrade(&inner);
        inner
            .queue
            .set_completion_callback(Arc::new(move |outcome: TaskOutcome| {
                let weak = weak.clone();
                Box::pin(async move {
                    if let (Some(inner), Some(state)) = (weak.upgrade(), outcome.next_state) {
                        inner.update_state(state);
                    }
                    Ok(())
                }) as HookFuture
            }));

        let weak = Arc::downgrade(&inner);
        inner.machine.on(BotState::Init, move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.update_state(BotState::Running);
                    inner.arm_timer(TimerKey::Map);
                    inner.arm_timer(TimerKey::Profession);
                }
                Ok(())
            }
        });

        for state in [BotState::Defeated, BotState::Banned, BotState::Stopped] {
            let weak = Arc::downgrade(&inner);
            inner.machine.on(state, move || {
                let weak = weak.clone();
                async move {
                    if let Some(inner) = weak.upgrade() {
                        inner.reset_session();
                        inner.timers.cancel_all();
                    }
                    Ok(())
                }
            });
        }

        let weak = Arc::downgrade(&inner);
        inner.machine.on(BotState::Blocked, move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.arm_timer(TimerKey::Verification);
                }
                Ok(())
            }
        });

        Self { inner }
    }

    /// Spawns the fixed-period check loop. Idempotent while running.
    pub fn start(&self) {
        let mut guard = self
            .inner
            .check_loop
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if guard.as_ref().is_some_and(|handle| !handle.is_finished()) {
            warn!("controller already started");
            return;
        }

        info!("controller starting");
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.config.check_interval;
        *guard = Some(tokio::spawn(async move {
            let mut ticks = IntervalStream::new(interval(period));
            while ticks.next().await.is_some() {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.queue.check_and_execute().await;
            }
        }));
    }

    /// Shuts down depth-first: timers, then the check loop, then the queue.
    pub async fn stop(&self) {
        info!("controller stopping");
        self.inner.timers.cancel_all();

        let handle = self
            .inner
            .check_loop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            // Cancellation is the expected shutdown path, not an error.
            let _ = handle.await;
        }

        self.inner.queue.clear();
    }

    /// Transitions to `state`, emitting asynchronously. A request for the
    /// currently active state is a no-op.
    pub fn update_state(&self, state: BotState) {
        self.inner.update_state(state);
    }

    /// The current bot state, if any transition has happened yet.
    pub fn state(&self) -> Option<BotState> {
        self.inner.machine.current_state()
    }

    /// Admits a task into the queue. See [`TaskQueue::enqueue`].
    pub fn add_task(&self, task: Task) -> bool {
        self.inner.queue.enqueue(task)
    }

    /// Admits a task and restarts the named timer's interval from zero.
    pub fn add_task_refreshing(&self, task: Task, key: TimerKey) -> bool {
        let admitted = self.inner.queue.enqueue(task);
        self.inner.arm_timer(key);
        admitted
    }

    /// Restarts the named timer's interval from zero.
    pub fn refresh_timer(&self, key: TimerKey) {
        self.inner.arm_timer(key);
    }

    /// Whether the named timer is currently armed.
    pub fn timer_armed(&self, key: TimerKey) -> bool {
        self.inner.timers.is_armed(key)
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.inner.queue
    }

    /// The state machine, for registering observer handlers on states the
    /// controller leaves unhandled (e.g. `Running`).
    pub fn machine(&self) -> &StateMachine {
        &self.inner.machine
    }

    /// A copy of the transient session data.
    pub fn session(&self) -> Session {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Mutates the transient session data under the controller's lock.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut session = self
            .inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut session)
    }
}

impl Inner {
    fn update_state(self: &Arc<Self>, state: BotState) {
        if self.machine.current_state() == Some(state) {
            debug!(state = %state, "state unchanged, skipping emit");
            return;
        }

        info!(state = %state, "state transition");
        self.machine.set_current(state);

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            inner.machine.emit(state).await;
        });
    }

    fn reset_session(&self) {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
        debug!("session reset");
    }

    /// Arms the recurring timer for `key`. On firing it enqueues a fresh
    /// repeating task and re-arms itself under the same key.
    fn arm_timer(self: &Arc<Self>, key: TimerKey) {
        let command = match key {
            TimerKey::Map => Some(("$map".to_string(), TaskKind::NewBattleWindow)),
            TimerKey::Profession => self
                .config
                .profession
                .as_ref()
                .map(|p| (format!("${p}"), TaskKind::NewProfessionWindow)),
            TimerKey::Verification => Some(("$verify".to_string(), TaskKind::Verify)),
        };
        let Some((command, kind)) = command else {
            debug!(timer = %key, "no profession configured, timer not armed");
            return;
        };

        let weak = Arc::downgrade(self);
        self.timers.start(key, move || async move {
            if let Some(inner) = weak.upgrade() {
                inner.queue.enqueue(inner.repeating_task(&command, kind));
                inner.arm_timer(key);
            }
        });
    }

    /// Builds the task a timer firing enqueues: send one command through
    /// the sink, expiring if not dispatched within the configured window.
    fn repeating_task(&self, command: &str, kind: TaskKind) -> Task {
        let sink = Arc::clone(&self.sink);
        let send_command = command.to_string();
        Task::new(
            kind,
            command,
            Instant::now() + self.config.task_expiry,
            move || {
                let sink = Arc::clone(&sink);
                let command = send_command.clone();
                async move {
                    sink.send(&command).await?;
                    Ok(TaskOutcome::default())
                }
            },
        )
    }
}
