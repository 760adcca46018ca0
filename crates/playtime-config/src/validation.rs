//! Configuration validation

use crate::schema::{RawConfig, RawGame};
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Game '{name}': {message}")]
    GameError { name: String, message: String },

    #[error("Duplicate game name: {0}")]
    DuplicateGameName(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    match config.launcher.daily_limit_seconds {
        None => errors.push(ValidationError::MissingSetting("launcher.daily_limit_seconds")),
        Some(0) => errors.push(ValidationError::GlobalError(
            "daily_limit_seconds must be greater than zero".into(),
        )),
        Some(_) => {}
    }

    let mut seen_names = HashSet::new();
    for game in &config.games {
        if !seen_names.insert(game.name.as_str()) {
            errors.push(ValidationError::DuplicateGameName(game.name.clone()));
        }
    }

    for (index, game) in config.games.iter().enumerate() {
        errors.extend(validate_game(index, game));
    }

    errors
}

fn validate_game(index: usize, game: &RawGame) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let name = if game.name.trim().is_empty() {
        errors.push(ValidationError::GameError {
            name: format!("#{}", index),
            message: "name cannot be empty".into(),
        });
        format!("#{}", index)
    } else {
        game.name.clone()
    };

    if game.command.trim().is_empty() {
        errors.push(ValidationError::GameError {
            name,
            message: "command cannot be empty".into(),
        });
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawLauncherConfig;

    fn game(name: &str, command: &str) -> RawGame {
        RawGame {
            name: name.into(),
            command: command.into(),
            args: vec![],
        }
    }

    fn config(games: Vec<RawGame>) -> RawConfig {
        RawConfig {
            config_version: 1,
            launcher: RawLauncherConfig {
                daily_limit_seconds: Some(3600),
                ..Default::default()
            },
            games,
        }
    }

    #[test]
    fn test_valid_config() {
        let errors = validate_config(&config(vec![game("A", "a"), game("B", "b")]));
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_duplicate_name_detection() {
        let errors = validate_config(&config(vec![game("Game", "game1"), game("Game", "game2")]));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::DuplicateGameName(n) if n == "Game")));
    }

    #[test]
    fn test_empty_command() {
        let errors = validate_config(&config(vec![game("Game", "  ")]));
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], ValidationError::GameError { name, .. } if name == "Game"));
    }

    #[test]
    fn test_empty_name_uses_position() {
        let errors = validate_config(&config(vec![game("A", "a"), game("", "b")]));
        assert!(matches!(&errors[0], ValidationError::GameError { name, .. } if name == "#1"));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let mut cfg = config(vec![]);
        cfg.launcher.daily_limit_seconds = Some(0);
        let errors = validate_config(&cfg);
        assert!(matches!(errors[0], ValidationError::GlobalError(_)));
    }

    #[test]
    fn test_errors_are_collected() {
        let mut cfg = config(vec![game("", ""), game("X", "x"), game("X", "")]);
        cfg.launcher.daily_limit_seconds = None;
        let errors = validate_config(&cfg);
        // missing limit, duplicate X, empty name + empty command for #0, empty command for X
        assert_eq!(errors.len(), 5);
    }
}
