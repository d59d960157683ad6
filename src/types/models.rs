use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AdditionType, CompletionType, GameStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Identifies one library entry: a game owned by a user on a platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgressKey {
    pub user_id: String,
    pub game_id: String,
    pub platform_id: String,
}

impl ProgressKey {
    pub fn new(
        user_id: impl Into<String>,
        game_id: impl Into<String>,
        platform_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            game_id: game_id.into(),
            platform_id: platform_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionLogEntry {
    pub id: String,
    pub user_id: String,
    pub game_id: String,
    pub platform_id: String,
    pub completion_type: CompletionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dlc_id: Option<String>,
    pub percentage: u8,
    pub logged_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CompletionLogEntry {
    #[must_use]
    pub fn key(&self) -> ProgressKey {
        ProgressKey::new(&self.user_id, &self.game_id, &self.platform_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameAddition {
    pub id: String,
    pub game_id: String,
    pub name: String,
    pub weight: f64,
    pub required_for_full: bool,
    pub addition_type: AdditionType,
    pub is_complete_edition: bool,
}

impl GameAddition {
    #[must_use]
    pub fn is_dlc(&self) -> bool {
        self.addition_type == AdditionType::Dlc
    }

    /// A DLC whose percentage counts toward full completion once owned.
    #[must_use]
    pub fn is_required_dlc(&self) -> bool {
        self.is_dlc() && self.required_for_full
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserGameEdition {
    pub user_id: String,
    pub game_id: String,
    pub platform_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edition_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserGameAddition {
    pub user_id: String,
    pub game_id: String,
    pub platform_id: String,
    pub addition_id: String,
    pub owned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserGameProgress {
    pub user_id: String,
    pub game_id: String,
    pub platform_id: String,
    pub status: GameStatus,
    pub completion_percentage: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate achievement counts from the external providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementTotals {
    pub total: u32,
    pub completed: u32,
}
