//! A minimal idle-game bot wired to a println-backed command sink.
//!
//! This example demonstrates:
//! - Implementing the `CommandSink` boundary trait
//! - Configuring and starting the `Controller`
//! - Feeding external observations in as tasks and state updates
//!
//! To run this example:
//! ```sh
//! cargo run --example idle_bot
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use botsched::{
    BotConfig, BotState, CommandSink, Controller, Result, Task, TaskKind, TaskOutcome,
};
use tokio::time::{self, Instant};

/// A sink that prints commands instead of delivering them to a chat channel.
struct PrintlnSink;

#[async_trait]
impl CommandSink for PrintlnSink {
    async fn send(&self, command: &str) -> Result<()> {
        println!("-> {command}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = BotConfig::new()
        .with_task_gap(Duration::from_millis(500))
        .with_task_bias(Duration::from_millis(750))
        .with_timer_interval(Duration::from_secs(5))
        .with_profession("fish");
    let controller = Controller::new(config, Arc::new(PrintlnSink));

    // Start the check loop, then kick the state machine into gear. The Init
    // handler transitions to Running and arms the map and profession timers,
    // which keep the queue fed from here on.
    controller.start();
    controller.update_state(BotState::Init);

    // Simulate an external observer spotting a treasure drop.
    controller.add_task(Task::new(
        TaskKind::Treasure,
        "$treasure",
        Instant::now() + Duration::from_secs(30),
        || async {
            println!("-> $treasure");
            Ok(TaskOutcome::default())
        },
    ));

    // Let the bot run for a while, then shut down cleanly.
    time::sleep(Duration::from_secs(30)).await;
    controller.stop().await;

    Ok(())
}
