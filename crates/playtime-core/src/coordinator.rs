//! Launch coordinator
//!
//! Mediates between launch requests from the shell and the process
//! supervisor. At most one session is active at a time; a request that
//! arrives while a game is running is dropped.

use playtime_config::GameDescriptor;
use playtime_store::{StoreResult, UsageStore};
use playtime_util::{SessionId, format_duration};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{CoreEvent, ProcessSupervisor, SessionResult};

/// Coordinator lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CoordinatorState {
    Idle,
    Active {
        session_id: SessionId,
        game_index: usize,
        game: String,
    },
}

/// Result of a launch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The game was spawned and is being supervised
    Started { session_id: SessionId },
    /// Another session is already active
    Ignored,
    /// Today's budget is already used up; nothing was spawned
    BudgetExceeded,
    /// No game at the requested index
    UnknownGame,
    /// The process could not be created
    SpawnFailed,
}

/// Point-in-time view of the coordinator and today's budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoordinatorStatus {
    pub state: CoordinatorState,
    pub accumulated: Duration,
    pub daily_limit: Duration,
    pub remaining: Duration,
}

/// Single-session launch coordinator
pub struct LaunchCoordinator {
    games: Vec<GameDescriptor>,
    daily_limit: Duration,
    store: Arc<dyn UsageStore>,
    supervisor: Arc<ProcessSupervisor>,
    events: mpsc::UnboundedSender<CoreEvent>,
    state: Arc<Mutex<CoordinatorState>>,
}

impl LaunchCoordinator {
    pub fn new(
        games: Vec<GameDescriptor>,
        daily_limit: Duration,
        store: Arc<dyn UsageStore>,
        supervisor: Arc<ProcessSupervisor>,
        events: mpsc::UnboundedSender<CoreEvent>,
    ) -> Self {
        info!(
            game_count = games.len(),
            daily_limit = %format_duration(daily_limit),
            "Launch coordinator initialized"
        );

        Self {
            games,
            daily_limit,
            store,
            supervisor,
            events,
            state: Arc::new(Mutex::new(CoordinatorState::Idle)),
        }
    }

    pub fn games(&self) -> &[GameDescriptor] {
        &self.games
    }

    /// Handle a "launch game" request from the shell.
    ///
    /// Spawning happens on the calling thread; supervision runs as a
    /// background tokio task, so this must be called from within a runtime.
    pub fn notify_launch_requested(&self, game_index: usize) -> LaunchOutcome {
        let Some(game) = self.games.get(game_index) else {
            warn!(game_index, "Launch requested for unknown game");
            return LaunchOutcome::UnknownGame;
        };

        let session_id = {
            let mut state = lock(&self.state);

            if let CoordinatorState::Active { game: running, .. } = &*state {
                debug!(requested = %game.name, running = %running, "Session active, ignoring launch");
                return LaunchOutcome::Ignored;
            }

            let accumulated = self.store.accumulated();
            if accumulated >= self.daily_limit {
                drop(state);
                info!(
                    game = %game.name,
                    accumulated = %format_duration(accumulated),
                    "Launch blocked, daily limit reached"
                );
                self.emit(CoreEvent::BudgetExceeded {
                    accumulated,
                    daily_limit: self.daily_limit,
                });
                return LaunchOutcome::BudgetExceeded;
            }

            let session_id = SessionId::new();
            *state = CoordinatorState::Active {
                session_id: session_id.clone(),
                game_index,
                game: game.name.clone(),
            };
            session_id
        };

        let process = match self.supervisor.spawn(&game.argv()) {
            Ok(process) => process,
            Err(e) => {
                *lock(&self.state) = CoordinatorState::Idle;
                warn!(game = %game.name, error = %e, "Failed to launch game");
                self.emit(CoreEvent::ProcessFailed {
                    game: game.name.clone(),
                    reason: e.to_string(),
                });
                return LaunchOutcome::SpawnFailed;
            }
        };

        info!(session_id = %session_id, game = %game.name, "Game launched");
        self.emit(CoreEvent::SessionStarted {
            session_id: session_id.clone(),
            game: game.name.clone(),
        });

        let supervisor = self.supervisor.clone();
        let store = self.store.clone();
        let daily_limit = self.daily_limit;
        let task_session_id = session_id.clone();
        let supervision = tokio::spawn(async move {
            supervisor
                .supervise(process, store, daily_limit, task_session_id)
                .await
        });

        // Watch the supervision task separately so a panic still releases
        // the Active state.
        let completion = SessionCompletion {
            game: game.name.clone(),
            daily_limit,
            store: self.store.clone(),
            events: self.events.clone(),
            state: self.state.clone(),
        };
        tokio::spawn(async move {
            match supervision.await {
                Ok(result) => completion.finish(result),
                Err(e) => completion.abort(&e.to_string()),
            }
        });

        LaunchOutcome::Started { session_id }
    }

    /// Handle application shutdown: persist pending usage.
    ///
    /// An in-flight session is left running.
    pub fn notify_shutdown_requested(&self) -> StoreResult<bool> {
        if self.is_active() {
            warn!("Shutting down with a session still active");
        }

        let written = self.store.flush()?;
        info!(written, "Usage flushed on shutdown");
        Ok(written)
    }

    pub fn status(&self) -> CoordinatorStatus {
        let state = lock(&self.state).clone();
        let accumulated = self.store.accumulated();

        CoordinatorStatus {
            state,
            accumulated,
            daily_limit: self.daily_limit,
            remaining: self.daily_limit.saturating_sub(accumulated),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(*lock(&self.state), CoordinatorState::Active { .. })
    }

    fn emit(&self, event: CoreEvent) {
        send_event(&self.events, event);
    }
}

/// Everything needed to wind down a session once supervision stops
struct SessionCompletion {
    game: String,
    daily_limit: Duration,
    store: Arc<dyn UsageStore>,
    events: mpsc::UnboundedSender<CoreEvent>,
    state: Arc<Mutex<CoordinatorState>>,
}

impl SessionCompletion {
    fn finish(self, result: SessionResult) {
        *lock(&self.state) = CoordinatorState::Idle;

        if result.timed_out {
            send_event(
                &self.events,
                CoreEvent::BudgetExceeded {
                    accumulated: self.store.accumulated(),
                    daily_limit: self.daily_limit,
                },
            );
        } else if result.is_failure() {
            send_event(
                &self.events,
                CoreEvent::ProcessFailed {
                    game: self.game.clone(),
                    reason: format!("exited with {}", result.exit),
                },
            );
        }

        send_event(
            &self.events,
            CoreEvent::SessionEnded {
                game: self.game,
                result,
            },
        );
    }

    fn abort(self, reason: &str) {
        *lock(&self.state) = CoordinatorState::Idle;
        error!(game = %self.game, reason, "Supervision task failed");

        if let Err(e) = self.store.flush() {
            warn!(error = %e, "Failed to flush usage after supervision failure");
        }

        send_event(
            &self.events,
            CoreEvent::ProcessFailed {
                game: self.game,
                reason: format!("supervision failed: {}", reason),
            },
        );
    }
}

fn send_event(events: &mpsc::UnboundedSender<CoreEvent>, event: CoreEvent) {
    if events.send(event).is_err() {
        debug!("Event receiver dropped");
    }
}

fn lock(state: &Mutex<CoordinatorState>) -> MutexGuard<'_, CoordinatorState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
