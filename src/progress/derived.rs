use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::CompletionLogStore;
use crate::types::{CompletionLogEntry, CompletionType, ProgressKey};

pub const AUTO_CALCULATED_NOTE: &str = "Auto-calculated";

/// Appends a derived entry only when the value differs from the latest one.
/// Returns the appended entry, or `None` when the log was already current.
pub fn record_derived(
    log: &dyn CompletionLogStore,
    key: &ProgressKey,
    derived_type: CompletionType,
    percentage: u8,
    logged_at: DateTime<Utc>,
) -> Result<Option<CompletionLogEntry>> {
    if !derived_type.is_derived() {
        return Err(Error::Validation(format!(
            "{derived_type} is not a derived completion type"
        )));
    }

    let latest = log.latest_completion_log(key, derived_type, None)?;
    if latest.is_some_and(|entry| entry.percentage == percentage) {
        tracing::debug!(
            user_id = %key.user_id,
            game_id = %key.game_id,
            platform_id = %key.platform_id,
            "{derived_type} unchanged at {percentage}%"
        );
        return Ok(None);
    }

    let entry = CompletionLogEntry {
        id: Uuid::new_v4().to_string(),
        user_id: key.user_id.clone(),
        game_id: key.game_id.clone(),
        platform_id: key.platform_id.clone(),
        completion_type: derived_type,
        dlc_id: None,
        percentage,
        logged_at,
        notes: Some(AUTO_CALCULATED_NOTE.to_string()),
    };
    log.append_completion_log(&entry)?;

    tracing::debug!(
        user_id = %key.user_id,
        game_id = %key.game_id,
        platform_id = %key.platform_id,
        "{derived_type} recorded at {percentage}%"
    );

    Ok(Some(entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn key() -> ProgressKey {
        ProgressKey::new("user-1", "game-1", "pc")
    }

    #[test]
    fn test_first_value_is_written() {
        let store = MemoryStore::new();
        let written = record_derived(&store, &key(), CompletionType::Full, 40, Utc::now())
            .unwrap()
            .unwrap();

        assert_eq!(written.percentage, 40);
        assert_eq!(written.notes.as_deref(), Some(AUTO_CALCULATED_NOTE));
        assert_eq!(store.completion_log_count(), 1);
    }

    #[test]
    fn test_unchanged_value_is_skipped() {
        let store = MemoryStore::new();
        record_derived(&store, &key(), CompletionType::Full, 40, Utc::now()).unwrap();
        let second = record_derived(&store, &key(), CompletionType::Full, 40, Utc::now()).unwrap();

        assert!(second.is_none());
        assert_eq!(store.completion_log_count(), 1);
    }

    #[test]
    fn test_changed_value_appends() {
        let store = MemoryStore::new();
        record_derived(&store, &key(), CompletionType::Completionist, 40, Utc::now()).unwrap();
        record_derived(&store, &key(), CompletionType::Completionist, 55, Utc::now()).unwrap();
        // Returning to an earlier value is still a change from the latest.
        record_derived(&store, &key(), CompletionType::Completionist, 40, Utc::now()).unwrap();

        assert_eq!(store.completion_log_count(), 3);
    }

    #[test]
    fn test_types_are_tracked_independently() {
        let store = MemoryStore::new();
        record_derived(&store, &key(), CompletionType::Full, 70, Utc::now()).unwrap();
        let completionist =
            record_derived(&store, &key(), CompletionType::Completionist, 70, Utc::now()).unwrap();

        assert!(completionist.is_some());
    }

    #[test]
    fn test_user_types_are_rejected() {
        let store = MemoryStore::new();
        let result = record_derived(&store, &key(), CompletionType::Main, 10, Utc::now());
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
