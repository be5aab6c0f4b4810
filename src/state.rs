use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, error};

use crate::error::Result;
use crate::metrics::METRICS;
use crate::types::{BotState, HandlerFn, HookFuture};

/// Flat state machine over [`BotState`] with zero or one asynchronous
/// handler per state.
///
/// Transitions are not constrained by a table; the machine trusts its
/// caller. [`emit`](StateMachine::emit) records the state and invokes the
/// registered handler, isolating handler failures so one broken handler
/// cannot crash the loop. Re-entry suppression is the caller's concern
/// (see [`Controller::update_state`](crate::controller::Controller::update_state)).
pub struct StateMachine {
    handlers: RwLock<HashMap<BotState, HandlerFn>>,
    current: Mutex<Option<BotState>>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            current: Mutex::new(None),
        }
    }

    /// Registers the handler for `state`, replacing any existing one.
    pub fn on<F, Fut>(&self, state: BotState, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handler: HandlerFn = Arc::new(move || Box::pin(handler()) as HookFuture);
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(state, handler);
    }

    /// Removes the handler for `state`. Returns whether one was registered.
    pub fn off(&self, state: BotState) -> bool {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&state)
            .is_some()
    }

    /// Removes every registered handler.
    pub fn clear(&self) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// The most recently emitted (or recorded) state.
    pub fn current_state(&self) -> Option<BotState> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_current(&self, state: BotState) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(state);
    }

    /// Records `state` as current and invokes its handler, if any.
    ///
    /// Handler failures are logged and swallowed. The handler is awaited
    /// with no internal lock held, so it may freely call back into the
    /// machine.
    pub async fn emit(&self, state: BotState) {
        debug!(state = %state, "emitting state");
        self.set_current(state);
        METRICS.inc_state_transitions(state.as_str());

        let handler = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&state)
            .cloned();

        if let Some(handler) = handler {
            if let Err(e) = handler().await {
                error!(state = %state, error = %e, "state handler failed");
                METRICS.record_error("state_machine", "handler");
            }
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BotError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_emit_invokes_handler() {
        let machine = StateMachine::new();
        let count = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&count);
        machine.on(BotState::Running, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        machine.emit(BotState::Running).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(machine.current_state(), Some(BotState::Running));
    }

    #[tokio::test]
    async fn test_emit_without_handler_records_state() {
        let machine = StateMachine::new();
        machine.emit(BotState::Blocked).await;
        assert_eq!(machine.current_state(), Some(BotState::Blocked));
    }

    #[tokio::test]
    async fn test_handler_replacement() {
        let machine = StateMachine::new();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&first);
        machine.on(BotState::Init, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        let counter = Arc::clone(&second);
        machine.on(BotState::Init, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        machine.emit(BotState::Init).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_off_and_clear() {
        let machine = StateMachine::new();
        machine.on(BotState::Init, || async { Ok(()) });
        machine.on(BotState::Stopped, || async { Ok(()) });

        assert!(machine.off(BotState::Init));
        assert!(!machine.off(BotState::Init));

        machine.clear();
        assert!(!machine.off(BotState::Stopped));
    }

    #[tokio::test]
    async fn test_handler_error_is_swallowed() {
        let machine = StateMachine::new();
        machine.on(BotState::Banned, || async {
            Err(BotError::handler_error("boom"))
        });

        // Must not panic or propagate.
        machine.emit(BotState::Banned).await;
        assert_eq!(machine.current_state(), Some(BotState::Banned));
    }
}
