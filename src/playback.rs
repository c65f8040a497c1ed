//! Deterministic action replay
//!
//! A playback file is a time-ordered list of input actions recorded from a
//! real run. Replay feeds them through the same player-input surface a human
//! would drive, keyed off the same clock, so a session replays identically.

use serde::Deserialize;
use thiserror::Error;

use crate::sim::state::{InputAction, SessionState};

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("playback file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimedAction {
    pub time: f64,
    pub action: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackScript {
    pub actions: Vec<TimedAction>,
}

impl PlaybackScript {
    pub fn from_json(json: &str) -> Result<Self, PlaybackError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Monotonic cursor over a script's actions
#[derive(Debug)]
pub struct PlaybackCursor {
    script: PlaybackScript,
    next: usize,
}

impl PlaybackCursor {
    pub fn new(script: PlaybackScript) -> Self {
        log::info!("playback mode: {} actions", script.actions.len());
        Self { script, next: 0 }
    }
}

/// Map a recorded action name onto the input surface. Unknown names are a
/// data problem, not a crash: the caller logs and skips them.
pub fn parse_action(name: &str) -> Option<InputAction> {
    match name {
        "moveLeft" => Some(InputAction::MoveLeft),
        "moveRight" => Some(InputAction::MoveRight),
        "stopLeft" => Some(InputAction::StopLeft),
        "stopRight" => Some(InputAction::StopRight),
        _ => None,
    }
}

/// Apply every action whose time the clock has reached
pub fn process(state: &mut SessionState, now: f64) {
    let mut due = Vec::new();
    if let Some(pb) = state.playback.as_mut() {
        while let Some(entry) = pb.script.actions.get(pb.next) {
            if now < entry.time {
                break;
            }
            match parse_action(&entry.action) {
                Some(action) => due.push(action),
                None => log::warn!("unknown playback action: {}", entry.action),
            }
            pb.next += 1;
        }
    }
    for action in due {
        state.handle_input(action);
    }
}
