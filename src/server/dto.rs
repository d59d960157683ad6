use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::progress::{ProgressSummary, Recalculation};
use crate::types::{CompletionLogEntry, GameStatus};

#[derive(Debug, Deserialize)]
pub struct CreateCompletionLogRequest {
    pub completion_type: String,
    #[serde(default)]
    pub dlc_id: Option<String>,
    /// Range-checked by the handler so that out-of-range values get a 400.
    pub percentage: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub logged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListCompletionLogsParams {
    #[serde(default, rename = "type")]
    pub completion_type: Option<String>,
    #[serde(default)]
    pub limit: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct CompletionLogResponse {
    pub log: CompletionLogEntry,
    #[serde(flatten)]
    pub recalculation: Recalculation,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub game_id: String,
    pub platform_id: String,
    pub status: GameStatus,
    #[serde(flatten)]
    pub progress: ProgressSummary,
}
