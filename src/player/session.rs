//! Async driver that owns a [`PlayerController`] on its own task.
//!
//! Fired timers, engine reports and user commands all funnel into one
//! `select!` loop, so the controller is only ever touched from a single task.

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info};

use super::{
    attempt::PlaybackState,
    clock::{Clock, Timer},
    controller::PlayerController,
    engine::{EngineReport, PlaybackEngine},
    fallback::FallbackOpener,
};

/// User actions available while a session runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Retry,
    OpenNow,
    Cancel,
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlaybackOutcome {
    Playing { attempt_url: String, retries: u32 },
    Redirected { url: String },
    Cancelled,
}

pub struct PlayerSession {
    commands: mpsc::UnboundedSender<PlayerCommand>,
    task: JoinHandle<PlaybackOutcome>,
}

impl PlayerSession {
    /// Start playing `source_url` on a new task. `timers` must be the channel
    /// the controller's clock fires into and `reports` the channel its engine
    /// reports into.
    pub fn spawn<C, E, F>(
        source_url: String,
        mut controller: PlayerController<C, E, F>,
        mut timers: mpsc::UnboundedReceiver<Timer>,
        mut reports: mpsc::UnboundedReceiver<EngineReport>,
    ) -> Self
    where
        C: Clock + Send + 'static,
        E: PlaybackEngine + Send + 'static,
        F: FallbackOpener + Send + 'static,
    {
        let (commands, mut command_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            controller.start(&source_url);
            loop {
                if let Some(outcome) = outcome_of(&controller) {
                    info!(?outcome, "Player session finished");
                    return outcome;
                }
                tokio::select! {
                    Some(timer) = timers.recv() => controller.on_timer(timer),
                    Some(report) = reports.recv() => controller.on_engine_report(report),
                    command = command_rx.recv() => match command {
                        Some(PlayerCommand::Retry) => controller.manual_retry(),
                        Some(PlayerCommand::OpenNow) => controller.open_now(),
                        Some(PlayerCommand::Cancel) | None => {
                            controller.cancel();
                            return PlaybackOutcome::Cancelled;
                        }
                    },
                    else => {
                        debug!("All session channels closed");
                        controller.cancel();
                        return PlaybackOutcome::Cancelled;
                    }
                }
            }
        });

        Self { commands, task }
    }

    /// Abort the escalation countdown and start over
    pub fn retry(&self) -> bool {
        self.commands.send(PlayerCommand::Retry).is_ok()
    }

    pub fn open_now(&self) -> bool {
        self.commands.send(PlayerCommand::OpenNow).is_ok()
    }

    pub fn cancel(&self) -> bool {
        self.commands.send(PlayerCommand::Cancel).is_ok()
    }

    pub fn commands(&self) -> mpsc::UnboundedSender<PlayerCommand> {
        self.commands.clone()
    }

    /// Wait for the session to finish. The command channel stays open until
    /// then; dropping the session without waiting cancels it.
    pub async fn wait(self) -> Result<PlaybackOutcome, JoinError> {
        let Self { commands, task } = self;
        let outcome = task.await;
        drop(commands);
        outcome
    }
}

fn outcome_of<C, E, F>(controller: &PlayerController<C, E, F>) -> Option<PlaybackOutcome>
where
    C: Clock,
    E: PlaybackEngine,
    F: FallbackOpener,
{
    let attempt = controller.attempt()?;
    match attempt.state {
        PlaybackState::Playing => Some(PlaybackOutcome::Playing {
            attempt_url: attempt.attempt_url.clone(),
            retries: attempt.retry_count,
        }),
        PlaybackState::Redirected => Some(PlaybackOutcome::Redirected {
            url: attempt.source_url.clone(),
        }),
        _ => None,
    }
}
