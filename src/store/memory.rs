use std::collections::HashMap;
use std::sync::Mutex;

use super::{
    AchievementProvider, AdditionCatalog, CatalogRecord, CompletionLogStore, OwnershipStore,
    ProgressStore, Store,
};
use crate::error::{Error, Result};
use crate::types::*;

#[derive(Default, Clone)]
struct Inner {
    users: HashMap<String, User>,
    games: HashMap<String, Game>,
    platforms: HashMap<String, Platform>,
    additions: HashMap<String, GameAddition>,
    editions: HashMap<ProgressKey, UserGameEdition>,
    ownership: HashMap<(ProgressKey, String), UserGameAddition>,
    achievements: HashMap<(String, String), AchievementTotals>,
    progress: HashMap<ProgressKey, UserGameProgress>,
    /// Insertion order; later entries win ties on `logged_at`.
    logs: Vec<CompletionLogEntry>,
    /// When set, `achievement_totals` fails to simulate an unavailable provider.
    achievements_unavailable: bool,
}

/// In-process store for tests and embedding. Mirrors the SQLite semantics.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes the achievement provider return errors until reset.
    pub fn set_achievements_unavailable(&self, unavailable: bool) {
        self.inner().achievements_unavailable = unavailable;
    }

    /// Number of stored log entries across all keys.
    #[must_use]
    pub fn completion_log_count(&self) -> usize {
        self.inner().logs.len()
    }
}

fn matches_key(entry: &CompletionLogEntry, key: &ProgressKey) -> bool {
    entry.user_id == key.user_id && entry.game_id == key.game_id && entry.platform_id == key.platform_id
}

impl CompletionLogStore for MemoryStore {
    fn append_completion_log(&self, entry: &CompletionLogEntry) -> Result<()> {
        if (entry.completion_type == CompletionType::Dlc) != entry.dlc_id.is_some() {
            return Err(Error::Validation(
                "dlc_id must be set exactly for dlc entries".to_string(),
            ));
        }
        self.inner().logs.push(entry.clone());
        Ok(())
    }

    fn latest_completion_log(
        &self,
        key: &ProgressKey,
        completion_type: CompletionType,
        dlc_id: Option<&str>,
    ) -> Result<Option<CompletionLogEntry>> {
        let inner = self.inner();
        Ok(inner
            .logs
            .iter()
            .filter(|e| {
                matches_key(e, key)
                    && e.completion_type == completion_type
                    && e.dlc_id.as_deref() == dlc_id
            })
            .max_by_key(|e| e.logged_at)
            .cloned())
    }

    fn get_completion_log(&self, id: &str) -> Result<Option<CompletionLogEntry>> {
        Ok(self.inner().logs.iter().find(|e| e.id == id).cloned())
    }

    fn list_completion_logs(
        &self,
        key: &ProgressKey,
        completion_type: Option<CompletionType>,
        limit: i32,
    ) -> Result<Vec<CompletionLogEntry>> {
        let inner = self.inner();
        let mut entries: Vec<(usize, &CompletionLogEntry)> = inner
            .logs
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                matches_key(e, key) && completion_type.is_none_or(|t| e.completion_type == t)
            })
            .collect();
        entries.sort_by(|(ai, a), (bi, b)| b.logged_at.cmp(&a.logged_at).then(bi.cmp(ai)));

        Ok(entries
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|(_, e)| e.clone())
            .collect())
    }

    fn delete_completion_log(&self, id: &str) -> Result<bool> {
        let mut inner = self.inner();
        let before = inner.logs.len();
        inner.logs.retain(|e| e.id != id);
        Ok(inner.logs.len() < before)
    }
}

impl AdditionCatalog for MemoryStore {
    fn get_addition(&self, id: &str) -> Result<Option<GameAddition>> {
        Ok(self.inner().additions.get(id).cloned())
    }

    fn list_game_additions(&self, game_id: &str) -> Result<Vec<GameAddition>> {
        let mut additions: Vec<GameAddition> = self
            .inner()
            .additions
            .values()
            .filter(|a| a.game_id == game_id)
            .cloned()
            .collect();
        additions.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(additions)
    }
}

impl OwnershipStore for MemoryStore {
    fn get_edition_selection(&self, key: &ProgressKey) -> Result<Option<UserGameEdition>> {
        Ok(self.inner().editions.get(key).cloned())
    }

    fn list_addition_ownership(&self, key: &ProgressKey) -> Result<Vec<UserGameAddition>> {
        let mut rows: Vec<UserGameAddition> = self
            .inner()
            .ownership
            .iter()
            .filter(|((k, _), _)| k == key)
            .map(|(_, row)| row.clone())
            .collect();
        rows.sort_by(|a, b| a.addition_id.cmp(&b.addition_id));
        Ok(rows)
    }
}

impl AchievementProvider for MemoryStore {
    fn achievement_totals(&self, key: &ProgressKey) -> Result<AchievementTotals> {
        let inner = self.inner();
        if inner.achievements_unavailable {
            return Err(Error::Io(std::io::Error::other(
                "achievement provider unavailable",
            )));
        }
        Ok(inner
            .achievements
            .get(&(key.user_id.clone(), key.game_id.clone()))
            .copied()
            .unwrap_or_default())
    }
}

impl ProgressStore for MemoryStore {
    fn get_game_progress(&self, key: &ProgressKey) -> Result<Option<UserGameProgress>> {
        Ok(self.inner().progress.get(key).cloned())
    }

    fn promote_game_progress(
        &self,
        expected: GameStatus,
        progress: &UserGameProgress,
    ) -> Result<bool> {
        let key = ProgressKey::new(&progress.user_id, &progress.game_id, &progress.platform_id);
        let mut inner = self.inner();

        let existing = inner.progress.get(&key);
        if existing.map_or(GameStatus::Backlog, |p| p.status) != expected {
            return Ok(false);
        }

        let mut row = progress.clone();
        if let Some(existing) = existing {
            row.started_at = existing.started_at.or(row.started_at);
        }
        inner.progress.insert(key, row);
        Ok(true)
    }
}

fn insert_new<T>(map: &mut HashMap<String, T>, id: &str, value: T, what: &str) -> Result<()> {
    if map.contains_key(id) {
        return Err(Error::Validation(format!("{what} '{id}' already exists")));
    }
    map.insert(id.to_string(), value);
    Ok(())
}

impl Inner {
    fn apply(&mut self, record: &CatalogRecord) -> Result<()> {
        match record {
            CatalogRecord::User(user) => insert_new(&mut self.users, &user.id, user.clone(), "user"),
            CatalogRecord::Game(game) => insert_new(&mut self.games, &game.id, game.clone(), "game"),
            CatalogRecord::Platform(platform) => {
                insert_new(&mut self.platforms, &platform.id, platform.clone(), "platform")
            }
            CatalogRecord::Addition(addition) => {
                insert_new(&mut self.additions, &addition.id, addition.clone(), "addition")
            }
            CatalogRecord::Edition(selection) => {
                let key =
                    ProgressKey::new(&selection.user_id, &selection.game_id, &selection.platform_id);
                self.editions.insert(key, selection.clone());
                Ok(())
            }
            CatalogRecord::Ownership(ownership) => {
                let key =
                    ProgressKey::new(&ownership.user_id, &ownership.game_id, &ownership.platform_id);
                self.ownership
                    .insert((key, ownership.addition_id.clone()), ownership.clone());
                Ok(())
            }
            CatalogRecord::Achievements {
                user_id,
                game_id,
                totals,
            } => {
                self.achievements
                    .insert((user_id.clone(), game_id.clone()), *totals);
                Ok(())
            }
        }
    }
}

impl Store for MemoryStore {
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn create_user(&self, user: &User) -> Result<()> {
        self.inner().apply(&CatalogRecord::User(user.clone()))
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.inner().users.get(id).cloned())
    }

    fn create_game(&self, game: &Game) -> Result<()> {
        self.inner().apply(&CatalogRecord::Game(game.clone()))
    }

    fn get_game(&self, id: &str) -> Result<Option<Game>> {
        Ok(self.inner().games.get(id).cloned())
    }

    fn create_platform(&self, platform: &Platform) -> Result<()> {
        self.inner().apply(&CatalogRecord::Platform(platform.clone()))
    }

    fn get_platform(&self, id: &str) -> Result<Option<Platform>> {
        Ok(self.inner().platforms.get(id).cloned())
    }

    fn create_addition(&self, addition: &GameAddition) -> Result<()> {
        self.inner().apply(&CatalogRecord::Addition(addition.clone()))
    }

    fn set_edition_selection(&self, selection: &UserGameEdition) -> Result<()> {
        self.inner().apply(&CatalogRecord::Edition(selection.clone()))
    }

    fn set_addition_ownership(&self, ownership: &UserGameAddition) -> Result<()> {
        self.inner().apply(&CatalogRecord::Ownership(ownership.clone()))
    }

    fn set_achievement_totals(
        &self,
        user_id: &str,
        game_id: &str,
        totals: AchievementTotals,
    ) -> Result<()> {
        self.inner().apply(&CatalogRecord::Achievements {
            user_id: user_id.to_string(),
            game_id: game_id.to_string(),
            totals,
        })
    }

    fn write_catalog(&self, records: &[CatalogRecord]) -> Result<()> {
        let mut inner = self.inner();
        let mut staged = inner.clone();
        for record in records {
            staged.apply(record)?;
        }
        *inner = staged;
        Ok(())
    }
}
