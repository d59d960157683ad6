//! Automatic status promotion.
//!
//! Rules are evaluated top to bottom and the first matching guard wins. The
//! table only promotes: no rule targets `dropped` and none moves a game out
//! of `completed`.

use serde::Serialize;

use super::calculator::ProgressSummary;
use crate::types::GameStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    NoChange,
    ChangeTo(GameStatus),
}

struct Rule {
    name: &'static str,
    guard: fn(GameStatus, &ProgressSummary) -> bool,
    target: GameStatus,
}

const RULES: &[Rule] = &[
    Rule {
        name: "completionist",
        guard: |_, p| p.completionist == 100,
        target: GameStatus::Completed,
    },
    Rule {
        name: "full",
        guard: |current, p| p.full == 100 && current != GameStatus::Completed,
        target: GameStatus::Finished,
    },
    Rule {
        name: "started",
        guard: |current, p| current == GameStatus::Backlog && p.main > 0,
        target: GameStatus::Playing,
    },
];

/// Returns the status change implied by the scores, if any.
#[must_use]
pub fn evaluate(current: GameStatus, progress: &ProgressSummary) -> Transition {
    let Some(rule) = RULES.iter().find(|rule| (rule.guard)(current, progress)) else {
        return Transition::NoChange;
    };

    if rule.target == current {
        return Transition::NoChange;
    }

    tracing::trace!("status rule '{}' matched: {current} -> {}", rule.name, rule.target);
    Transition::ChangeTo(rule.target)
}

/// Reported back to callers after the transition is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusOutcome {
    pub status_changed: bool,
    pub new_status: Option<GameStatus>,
}

impl From<Transition> for StatusOutcome {
    fn from(transition: Transition) -> Self {
        match transition {
            Transition::NoChange => Self {
                status_changed: false,
                new_status: None,
            },
            Transition::ChangeTo(status) => Self {
                status_changed: true,
                new_status: Some(status),
            },
        }
    }
}
