//! Core events emitted towards the presentation shell

use playtime_util::SessionId;
use serde::Serialize;
use std::time::Duration;

use crate::SessionResult;

/// User-facing text for every budget-exceeded notification
pub const BUDGET_EXCEEDED_MESSAGE: &str = "time limit reached for today";

/// Events emitted by the launch coordinator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreEvent {
    /// A game was spawned and is now supervised
    SessionStarted { session_id: SessionId, game: String },

    /// The daily budget is used up, either before launch or mid-session
    BudgetExceeded {
        accumulated: Duration,
        daily_limit: Duration,
    },

    /// A game failed to start or exited abnormally
    ProcessFailed { game: String, reason: String },

    /// A supervised session is over and the coordinator is idle again
    SessionEnded { game: String, result: SessionResult },
}

impl CoreEvent {
    /// Notification text for the shell, if this event warrants one
    pub fn user_message(&self) -> Option<String> {
        match self {
            CoreEvent::BudgetExceeded { .. } => Some(BUDGET_EXCEEDED_MESSAGE.to_string()),
            CoreEvent::ProcessFailed { game, reason } => {
                Some(format!("{} failed: {}", game, reason))
            }
            CoreEvent::SessionStarted { .. } | CoreEvent::SessionEnded { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_message_is_verbatim() {
        let event = CoreEvent::BudgetExceeded {
            accumulated: Duration::from_secs(3600),
            daily_limit: Duration::from_secs(3600),
        };
        assert_eq!(event.user_message().as_deref(), Some("time limit reached for today"));
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = CoreEvent::ProcessFailed {
            game: "Tux".into(),
            reason: "exit code 1".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "process_failed");
        assert_eq!(json["game"], "Tux");
    }
}
