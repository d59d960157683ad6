use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::calculator::{ProgressInputs, ProgressSummary, calculate, owned_required_dlcs};
use super::derived::record_derived;
use super::ownership::resolve_owned_dlcs;
use super::status::{StatusOutcome, Transition, evaluate};
use crate::error::{Error, Result};
use crate::store::{
    AchievementProvider, AdditionCatalog, CompletionLogStore, OwnershipStore, ProgressStore, Store,
};
use crate::types::*;

/// Compare-and-set retries. The status ladder has three promotions.
const MAX_PROMOTION_ATTEMPTS: usize = 4;

/// A user-submitted completion value.
#[derive(Debug, Clone)]
pub struct NewCompletion {
    pub completion_type: CompletionType,
    pub dlc_id: Option<String>,
    pub percentage: u8,
    pub notes: Option<String>,
    /// Defaults to the time of the request.
    pub logged_at: Option<DateTime<Utc>>,
}

/// Result of running the pipeline once.
#[derive(Debug, Clone, Serialize)]
pub struct Recalculation {
    pub progress: ProgressSummary,
    #[serde(flatten)]
    pub status: StatusOutcome,
    /// Number of derived log entries appended by this run.
    pub derived_written: usize,
}

/// Runs ownership resolution, scoring, derived logging and status promotion
/// against injected collaborators.
pub struct ProgressEngine {
    logs: Arc<dyn CompletionLogStore>,
    catalog: Arc<dyn AdditionCatalog>,
    ownership: Arc<dyn OwnershipStore>,
    achievements: Arc<dyn AchievementProvider>,
    progress: Arc<dyn ProgressStore>,
}

impl ProgressEngine {
    pub fn new(
        logs: Arc<dyn CompletionLogStore>,
        catalog: Arc<dyn AdditionCatalog>,
        ownership: Arc<dyn OwnershipStore>,
        achievements: Arc<dyn AchievementProvider>,
        progress: Arc<dyn ProgressStore>,
    ) -> Self {
        Self {
            logs,
            catalog,
            ownership,
            achievements,
            progress,
        }
    }

    /// Wires every collaborator to the same store.
    pub fn from_store<S: Store + 'static>(store: Arc<S>) -> Self {
        Self::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
        )
    }

    /// Computes the current scores without writing anything.
    pub fn summarize(&self, key: &ProgressKey) -> Result<ProgressSummary> {
        let additions = self.catalog.list_game_additions(&key.game_id)?;
        let owned = resolve_owned_dlcs(self.ownership.as_ref(), &additions, key)?;

        let main = self
            .logs
            .latest_completion_log(key, CompletionType::Main, None)?
            .map_or(0, |entry| entry.percentage);

        let mut dlc_percentages = HashMap::new();
        for dlc in owned_required_dlcs(&additions, &owned) {
            let latest =
                self.logs
                    .latest_completion_log(key, CompletionType::Dlc, Some(dlc.id.as_str()))?;
            if let Some(entry) = latest {
                dlc_percentages.insert(dlc.id.clone(), entry.percentage);
            }
        }

        let achievements = match self.achievements.achievement_totals(key) {
            Ok(totals) => totals,
            Err(e) => {
                tracing::warn!(
                    user_id = %key.user_id,
                    game_id = %key.game_id,
                    "Achievement totals unavailable, ignoring achievements: {e}"
                );
                AchievementTotals::default()
            }
        };

        Ok(calculate(&ProgressInputs {
            main,
            additions: &additions,
            owned: &owned,
            dlc_percentages: &dlc_percentages,
            achievements,
        }))
    }

    /// Current library status; a missing row means `backlog`.
    pub fn current_status(&self, key: &ProgressKey) -> Result<GameStatus> {
        Ok(self
            .progress
            .get_game_progress(key)?
            .map(|p| p.status)
            .unwrap_or_default())
    }

    /// Recomputes scores, records changed derived values and applies any
    /// status promotion. Running it again without a mutation writes nothing.
    pub fn recalculate(&self, key: &ProgressKey) -> Result<Recalculation> {
        let summary = self.summarize(key)?;
        let now = Utc::now();

        let mut derived_written = 0;
        for (derived_type, value) in [
            (CompletionType::Full, summary.full),
            (CompletionType::Completionist, summary.completionist),
        ] {
            if record_derived(self.logs.as_ref(), key, derived_type, value, now)?.is_some() {
                derived_written += 1;
            }
        }

        let transition = self.apply_status(key, &summary, now)?;

        Ok(Recalculation {
            progress: summary,
            status: transition.into(),
            derived_written,
        })
    }

    /// Promotes the stored status with a compare-and-set. When another writer
    /// moves the status first, the rules are evaluated again against the
    /// status it wrote, so a stale promotion never overwrites a newer one.
    fn apply_status(
        &self,
        key: &ProgressKey,
        summary: &ProgressSummary,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let mut current = self.current_status(key)?;

        for _ in 0..MAX_PROMOTION_ATTEMPTS {
            let Transition::ChangeTo(status) = evaluate(current, summary) else {
                return Ok(Transition::NoChange);
            };

            let promoted = self.progress.promote_game_progress(
                current,
                &UserGameProgress {
                    user_id: key.user_id.clone(),
                    game_id: key.game_id.clone(),
                    platform_id: key.platform_id.clone(),
                    status,
                    completion_percentage: summary.full,
                    started_at: Some(now),
                    updated_at: now,
                },
            )?;

            if promoted {
                tracing::info!(
                    user_id = %key.user_id,
                    game_id = %key.game_id,
                    platform_id = %key.platform_id,
                    "Status changed: {current} -> {status}"
                );
                return Ok(Transition::ChangeTo(status));
            }

            current = self.current_status(key)?;
        }

        tracing::warn!(
            user_id = %key.user_id,
            game_id = %key.game_id,
            platform_id = %key.platform_id,
            "Status left at {current} after concurrent updates"
        );
        Ok(Transition::NoChange)
    }

    /// Appends a user-submitted `main` or `dlc` entry, then recalculates.
    pub fn log_completion(
        &self,
        key: &ProgressKey,
        completion: NewCompletion,
    ) -> Result<(CompletionLogEntry, Recalculation)> {
        self.validate_completion(key, &completion)?;

        let entry = CompletionLogEntry {
            id: Uuid::new_v4().to_string(),
            user_id: key.user_id.clone(),
            game_id: key.game_id.clone(),
            platform_id: key.platform_id.clone(),
            completion_type: completion.completion_type,
            dlc_id: completion.dlc_id,
            percentage: completion.percentage,
            logged_at: completion.logged_at.unwrap_or_else(Utc::now),
            notes: completion.notes,
        };
        self.logs.append_completion_log(&entry)?;

        let recalculation = self.recalculate(key)?;
        Ok((entry, recalculation))
    }

    /// Deletes an entry owned by `user_id`, then recalculates its key.
    /// Entries of other users are reported as not found.
    pub fn delete_completion(
        &self,
        user_id: &str,
        entry_id: &str,
    ) -> Result<(CompletionLogEntry, Recalculation)> {
        let entry = self
            .logs
            .get_completion_log(entry_id)?
            .filter(|entry| entry.user_id == user_id)
            .ok_or(Error::NotFound)?;

        if !self.logs.delete_completion_log(&entry.id)? {
            return Err(Error::NotFound);
        }

        let recalculation = self.recalculate(&entry.key())?;
        Ok((entry, recalculation))
    }

    fn validate_completion(&self, key: &ProgressKey, completion: &NewCompletion) -> Result<()> {
        if completion.completion_type.is_derived() {
            return Err(Error::Validation(format!(
                "{} completion is calculated automatically and cannot be submitted",
                completion.completion_type
            )));
        }
        if completion.percentage > 100 {
            return Err(Error::Validation(
                "percentage must be between 0 and 100".to_string(),
            ));
        }

        match (completion.completion_type, completion.dlc_id.as_deref()) {
            (CompletionType::Dlc, None) => Err(Error::Validation(
                "dlc_id is required for dlc completion".to_string(),
            )),
            (CompletionType::Dlc, Some(dlc_id)) => {
                let addition = self.catalog.get_addition(dlc_id)?;
                match addition {
                    Some(a) if a.game_id == key.game_id && a.is_dlc() => Ok(()),
                    _ => Err(Error::NotFound),
                }
            }
            (_, Some(_)) => Err(Error::Validation(
                "dlc_id is only allowed for dlc completion".to_string(),
            )),
            (_, None) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Duration;
    use std::sync::Mutex;

    struct Fixture {
        store: Arc<MemoryStore>,
        engine: ProgressEngine,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        store
            .create_user(&User {
                id: "user-1".to_string(),
                name: "ada".to_string(),
                created_at: now,
            })
            .unwrap();
        store
            .create_game(&Game {
                id: "game-1".to_string(),
                name: "Hollow Depths".to_string(),
                created_at: now,
            })
            .unwrap();
        let engine = ProgressEngine::from_store(store.clone());
        Fixture { store, engine }
    }

    fn key() -> ProgressKey {
        ProgressKey::new("user-1", "game-1", "pc")
    }

    fn add_dlc(store: &MemoryStore, id: &str, weight: f64) {
        store
            .create_addition(&GameAddition {
                id: id.to_string(),
                game_id: "game-1".to_string(),
                name: id.to_string(),
                weight,
                required_for_full: true,
                addition_type: AdditionType::Dlc,
                is_complete_edition: false,
            })
            .unwrap();
    }

    fn own(store: &MemoryStore, id: &str) {
        store
            .set_addition_ownership(&UserGameAddition {
                user_id: "user-1".to_string(),
                game_id: "game-1".to_string(),
                platform_id: "pc".to_string(),
                addition_id: id.to_string(),
                owned: true,
            })
            .unwrap();
    }

    fn main(percentage: u8) -> NewCompletion {
        NewCompletion {
            completion_type: CompletionType::Main,
            dlc_id: None,
            percentage,
            notes: None,
            logged_at: None,
        }
    }

    fn dlc(id: &str, percentage: u8) -> NewCompletion {
        NewCompletion {
            completion_type: CompletionType::Dlc,
            dlc_id: Some(id.to_string()),
            percentage,
            notes: None,
            logged_at: None,
        }
    }

    fn latest(store: &MemoryStore, completion_type: CompletionType) -> Option<u8> {
        store
            .latest_completion_log(&key(), completion_type, None)
            .unwrap()
            .map(|e| e.percentage)
    }

    #[test]
    fn test_main_only_completes_game() {
        let f = fixture();
        let (_, result) = f.engine.log_completion(&key(), main(100)).unwrap();

        assert_eq!(result.progress.full, 100);
        assert_eq!(result.progress.completionist, 100);
        assert!(result.status.status_changed);
        assert_eq!(result.status.new_status, Some(GameStatus::Completed));
        assert_eq!(
            f.engine.current_status(&key()).unwrap(),
            GameStatus::Completed
        );
    }

    #[test]
    fn test_owned_dlc_contributes_to_full() {
        let f = fixture();
        add_dlc(&f.store, "dlc-1", 1.0);
        own(&f.store, "dlc-1");

        f.engine.log_completion(&key(), main(60)).unwrap();
        let (_, result) = f.engine.log_completion(&key(), dlc("dlc-1", 100)).unwrap();

        assert_eq!(result.progress.full, 80);
        assert!(result.progress.has_dlcs);
        assert_eq!(latest(&f.store, CompletionType::Full), Some(80));
    }

    #[test]
    fn test_unowned_dlc_is_excluded() {
        let f = fixture();
        add_dlc(&f.store, "dlc-1", 1.0);

        f.engine.log_completion(&key(), main(60)).unwrap();
        let (_, result) = f.engine.log_completion(&key(), dlc("dlc-1", 100)).unwrap();

        assert_eq!(result.progress.full, 60);
        assert!(!result.progress.has_dlcs);
    }

    #[test]
    fn test_complete_edition_counts_every_dlc() {
        let f = fixture();
        add_dlc(&f.store, "dlc-1", 1.0);
        add_dlc(&f.store, "dlc-2", 1.0);
        f.store
            .create_addition(&GameAddition {
                id: "goty".to_string(),
                game_id: "game-1".to_string(),
                name: "Game of the Year".to_string(),
                weight: 1.0,
                required_for_full: false,
                addition_type: AdditionType::Edition,
                is_complete_edition: true,
            })
            .unwrap();
        f.store
            .set_edition_selection(&UserGameEdition {
                user_id: "user-1".to_string(),
                game_id: "game-1".to_string(),
                platform_id: "pc".to_string(),
                edition_id: Some("goty".to_string()),
            })
            .unwrap();

        f.engine.log_completion(&key(), main(90)).unwrap();
        let summary = f.engine.summarize(&key()).unwrap();

        // (90 + 0 + 0) / 3
        assert_eq!(summary.full, 30);
        assert!(summary.has_dlcs);
    }

    #[test]
    fn test_half_achievements_only_finishes() {
        let f = fixture();
        f.store
            .set_achievement_totals(
                "user-1",
                "game-1",
                AchievementTotals {
                    total: 10,
                    completed: 5,
                },
            )
            .unwrap();

        let (_, result) = f.engine.log_completion(&key(), main(100)).unwrap();

        assert_eq!(result.progress.achievement_percentage, 50);
        assert_eq!(result.progress.completionist, 75);
        assert_eq!(result.status.new_status, Some(GameStatus::Finished));
    }

    #[test]
    fn test_recalculate_is_idempotent() {
        let f = fixture();
        f.engine.log_completion(&key(), main(40)).unwrap();
        let count = f.store.completion_log_count();

        let result = f.engine.recalculate(&key()).unwrap();
        assert_eq!(result.derived_written, 0);
        assert!(!result.status.status_changed);
        assert_eq!(f.store.completion_log_count(), count);
    }

    #[test]
    fn test_first_progress_starts_playing() {
        let f = fixture();
        let (_, result) = f.engine.log_completion(&key(), main(5)).unwrap();

        assert_eq!(result.status.new_status, Some(GameStatus::Playing));
        assert_eq!(result.derived_written, 2);
        let progress = f.store.get_game_progress(&key()).unwrap().unwrap();
        assert!(progress.started_at.is_some());
        assert_eq!(progress.completion_percentage, 5);
    }

    #[test]
    fn test_deleting_only_main_resets_scores() {
        let f = fixture();
        let (entry, _) = f.engine.log_completion(&key(), main(50)).unwrap();
        assert_eq!(latest(&f.store, CompletionType::Full), Some(50));

        let (deleted, result) = f.engine.delete_completion("user-1", &entry.id).unwrap();
        assert_eq!(deleted.id, entry.id);
        assert_eq!(result.progress.main, 0);
        assert_eq!(result.progress.full, 0);
        assert_eq!(result.derived_written, 2);
        assert_eq!(latest(&f.store, CompletionType::Full), Some(0));

        // Status is never demoted back to backlog.
        assert_eq!(f.engine.current_status(&key()).unwrap(), GameStatus::Playing);
    }

    #[test]
    fn test_delete_falls_back_to_previous_main() {
        let f = fixture();
        let mut older = main(30);
        older.logged_at = Some(Utc::now() - Duration::hours(2));
        f.engine.log_completion(&key(), older).unwrap();
        let (newest, _) = f.engine.log_completion(&key(), main(70)).unwrap();

        let (_, result) = f.engine.delete_completion("user-1", &newest.id).unwrap();
        assert_eq!(result.progress.main, 30);
        assert_eq!(result.progress.full, 30);
    }

    #[test]
    fn test_delete_unchanged_value_writes_nothing() {
        let f = fixture();
        let mut older = main(30);
        older.logged_at = Some(Utc::now() - Duration::hours(2));
        let (old_entry, _) = f.engine.log_completion(&key(), older).unwrap();
        f.engine.log_completion(&key(), main(30)).unwrap();

        let count = f.store.completion_log_count();
        let (_, result) = f.engine.delete_completion("user-1", &old_entry.id).unwrap();
        assert_eq!(result.derived_written, 0);
        assert_eq!(f.store.completion_log_count(), count - 1);
    }

    #[test]
    fn test_delete_other_users_entry_is_not_found() {
        let f = fixture();
        let (entry, _) = f.engine.log_completion(&key(), main(50)).unwrap();

        let result = f.engine.delete_completion("user-2", &entry.id);
        assert!(matches!(result, Err(Error::NotFound)));
        assert!(f.store.get_completion_log(&entry.id).unwrap().is_some());

        let result = f.engine.delete_completion("user-1", "missing");
        assert!(matches!(result, Err(Error::NotFound)));
    }

    #[test]
    fn test_completed_is_never_demoted() {
        let f = fixture();
        add_dlc(&f.store, "dlc-1", 1.0);
        own(&f.store, "dlc-1");

        f.engine.log_completion(&key(), main(100)).unwrap();
        let (_, result) = f.engine.log_completion(&key(), dlc("dlc-1", 100)).unwrap();
        assert_eq!(result.progress.completionist, 100);
        assert_eq!(
            f.engine.current_status(&key()).unwrap(),
            GameStatus::Completed
        );

        let (_, result) = f.engine.log_completion(&key(), dlc("dlc-1", 20)).unwrap();
        assert_eq!(result.progress.full, 60);
        assert!(!result.status.status_changed);
        assert_eq!(
            f.engine.current_status(&key()).unwrap(),
            GameStatus::Completed
        );
    }

    /// Lets another writer promote the row right after the engine reads it.
    struct InterleavedProgress {
        store: Arc<MemoryStore>,
        concurrent_write: Mutex<Option<GameStatus>>,
    }

    impl ProgressStore for InterleavedProgress {
        fn get_game_progress(&self, key: &ProgressKey) -> Result<Option<UserGameProgress>> {
            let row = self.store.get_game_progress(key)?;
            let pending = self.concurrent_write.lock().unwrap().take();
            if let Some(status) = pending {
                let current = row.as_ref().map_or(GameStatus::Backlog, |p| p.status);
                let now = Utc::now();
                let written = self.store.promote_game_progress(
                    current,
                    &UserGameProgress {
                        user_id: key.user_id.clone(),
                        game_id: key.game_id.clone(),
                        platform_id: key.platform_id.clone(),
                        status,
                        completion_percentage: 100,
                        started_at: Some(now),
                        updated_at: now,
                    },
                )?;
                assert!(written);
            }
            Ok(row)
        }

        fn promote_game_progress(
            &self,
            expected: GameStatus,
            progress: &UserGameProgress,
        ) -> Result<bool> {
            self.store.promote_game_progress(expected, progress)
        }
    }

    #[test]
    fn test_concurrent_completion_is_not_demoted() {
        let f = fixture();
        f.store
            .set_achievement_totals(
                "user-1",
                "game-1",
                AchievementTotals {
                    total: 10,
                    completed: 5,
                },
            )
            .unwrap();
        f.engine.log_completion(&key(), main(50)).unwrap();
        assert_eq!(f.engine.current_status(&key()).unwrap(), GameStatus::Playing);

        let progress = Arc::new(InterleavedProgress {
            store: f.store.clone(),
            concurrent_write: Mutex::new(Some(GameStatus::Completed)),
        });
        let engine = ProgressEngine::new(
            f.store.clone(),
            f.store.clone(),
            f.store.clone(),
            f.store.clone(),
            progress,
        );

        // This request would finish the game from `playing`, but another
        // request completes it between the status read and the write.
        let (_, result) = engine.log_completion(&key(), main(100)).unwrap();

        assert_eq!(result.progress.full, 100);
        assert_eq!(result.progress.completionist, 75);
        assert!(!result.status.status_changed);
        assert_eq!(result.status.new_status, None);
        assert_eq!(
            f.engine.current_status(&key()).unwrap(),
            GameStatus::Completed
        );
    }

    #[test]
    fn test_stale_promotion_retries_against_new_status() {
        let f = fixture();
        f.store
            .set_achievement_totals(
                "user-1",
                "game-1",
                AchievementTotals {
                    total: 10,
                    completed: 5,
                },
            )
            .unwrap();

        let progress = Arc::new(InterleavedProgress {
            store: f.store.clone(),
            concurrent_write: Mutex::new(Some(GameStatus::Playing)),
        });
        let engine = ProgressEngine::new(
            f.store.clone(),
            f.store.clone(),
            f.store.clone(),
            f.store.clone(),
            progress,
        );

        // Read as backlog, moved to playing underneath; full still applies.
        let (_, result) = engine.log_completion(&key(), main(100)).unwrap();

        assert_eq!(result.status.new_status, Some(GameStatus::Finished));
        assert_eq!(
            f.engine.current_status(&key()).unwrap(),
            GameStatus::Finished
        );
    }

    #[test]
    fn test_achievement_outage_degrades_to_full() {
        let f = fixture();
        f.store
            .set_achievement_totals(
                "user-1",
                "game-1",
                AchievementTotals {
                    total: 10,
                    completed: 1,
                },
            )
            .unwrap();
        f.store.set_achievements_unavailable(true);

        let (_, result) = f.engine.log_completion(&key(), main(80)).unwrap();
        assert_eq!(result.progress.full, 80);
        assert_eq!(result.progress.completionist, 80);
        assert_eq!(result.progress.achievement_percentage, 100);
    }

    #[test]
    fn test_derived_types_cannot_be_submitted() {
        let f = fixture();
        for completion_type in CompletionType::DERIVED {
            let result = f.engine.log_completion(
                &key(),
                NewCompletion {
                    completion_type,
                    dlc_id: None,
                    percentage: 100,
                    notes: None,
                    logged_at: None,
                },
            );
            assert!(matches!(result, Err(Error::Validation(_))));
        }
        assert_eq!(f.store.completion_log_count(), 0);
    }

    #[test]
    fn test_dlc_id_rules() {
        let f = fixture();
        add_dlc(&f.store, "dlc-1", 1.0);
        f.store
            .create_addition(&GameAddition {
                id: "other-game-dlc".to_string(),
                game_id: "game-2".to_string(),
                name: "Elsewhere".to_string(),
                weight: 1.0,
                required_for_full: true,
                addition_type: AdditionType::Dlc,
                is_complete_edition: false,
            })
            .unwrap();

        let mut missing_id = dlc("dlc-1", 10);
        missing_id.dlc_id = None;
        assert!(matches!(
            f.engine.log_completion(&key(), missing_id),
            Err(Error::Validation(_))
        ));

        let mut main_with_dlc = main(10);
        main_with_dlc.dlc_id = Some("dlc-1".to_string());
        assert!(matches!(
            f.engine.log_completion(&key(), main_with_dlc),
            Err(Error::Validation(_))
        ));

        assert!(matches!(
            f.engine.log_completion(&key(), dlc("other-game-dlc", 10)),
            Err(Error::NotFound)
        ));
        assert!(matches!(
            f.engine.log_completion(&key(), dlc("nope", 10)),
            Err(Error::NotFound)
        ));
        assert!(matches!(
            f.engine.log_completion(&key(), main(101)),
            Err(Error::Validation(_))
        ));
    }
}
