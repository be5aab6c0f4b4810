#![warn(unused_crate_dependencies)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

//! A prioritized, rate-limited task scheduling and orchestration core for
//! long-running interactive bots.
//!
//! This crate provides the scheduling heart of an automated agent that must
//! repeatedly decide what to do next:
//! - A [`TaskQueue`](queue::TaskQueue) with per-kind concurrency ceilings,
//!   priority aging, expiry pruning, pacing with randomized jitter, and
//!   bounded retry
//! - A [`StateMachine`](state::StateMachine) with per-state async handlers
//! - A [`TimerSet`](timer::TimerSet) of named, cancelable recurring triggers
//!
//! # Architecture
//!
//! These components are composed by the [`Controller`](controller::Controller),
//! which owns the fixed-period check loop and closes the feedback loop: task
//! outcomes drive state transitions, state transitions start and stop timers,
//! and timers enqueue fresh tasks. External observers influence the core only
//! through [`Controller::add_task`](controller::Controller::add_task) and
//! [`Controller::update_state`](controller::Controller::update_state).
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use botsched::{
//!     BotConfig, BotState, CommandSink, Controller, Result, Task, TaskKind, TaskOutcome,
//! };
//! use tokio::time::{Duration, Instant};
//!
//! struct ChannelSink;
//!
//! #[async_trait::async_trait]
//! impl CommandSink for ChannelSink {
//!     async fn send(&self, command: &str) -> Result<()> {
//!         println!("> {command}");
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = BotConfig::new().with_profession("mine");
//!     let controller = Controller::new(config, Arc::new(ChannelSink));
//!
//!     // Start the check loop, then kick the state machine into gear.
//!     controller.start();
//!     controller.update_state(BotState::Init);
//!
//!     // External observers feed work in as tasks.
//!     controller.add_task(Task::new(
//!         TaskKind::Command,
//!         "$daily",
//!         Instant::now() + Duration::from_secs(60),
//!         || async { Ok(TaskOutcome::default()) },
//!     ));
//!
//!     let _ = tokio::signal::ctrl_c().await;
//!     controller.stop().await;
//!     Ok(())
//! }
//! ```

/// Construction-time configuration scalars
pub mod config;

/// Orchestration layer binding queue, state machine and timers
pub mod controller;

/// Error types and handling
pub mod error;

/// Prometheus metrics for monitoring
pub mod metrics;

/// The prioritized, rate-limited task queue
pub mod queue;

/// Bot state machine with per-state handlers
pub mod state;

/// Named recurring timers
pub mod timer;

/// Core types and the chat-client boundary trait
pub mod types;

pub use config::BotConfig;
pub use controller::Controller;
pub use error::{BotError, Result};
pub use types::{BotState, CommandSink, Session, Task, TaskKind, TaskOutcome, TimerKey};
