mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Append-only log of completion events.
///
/// The "current" value of a key is whatever `latest_completion_log` returns;
/// nothing is cached.
pub trait CompletionLogStore: Send + Sync {
    fn append_completion_log(&self, entry: &CompletionLogEntry) -> Result<()>;

    /// Returns the most recently logged entry for the key, type and (for
    /// `dlc` entries) the DLC id. Ties on `logged_at` go to the later insert.
    fn latest_completion_log(
        &self,
        key: &ProgressKey,
        completion_type: CompletionType,
        dlc_id: Option<&str>,
    ) -> Result<Option<CompletionLogEntry>>;

    fn get_completion_log(&self, id: &str) -> Result<Option<CompletionLogEntry>>;

    /// Lists entries newest first, optionally restricted to one type.
    fn list_completion_logs(
        &self,
        key: &ProgressKey,
        completion_type: Option<CompletionType>,
        limit: i32,
    ) -> Result<Vec<CompletionLogEntry>>;

    /// Callers must verify the entry belongs to the requesting user.
    fn delete_completion_log(&self, id: &str) -> Result<bool>;
}

/// Read-only DLC and edition metadata.
pub trait AdditionCatalog: Send + Sync {
    fn get_addition(&self, id: &str) -> Result<Option<GameAddition>>;
    fn list_game_additions(&self, game_id: &str) -> Result<Vec<GameAddition>>;
}

/// Which editions and additions a user owns.
pub trait OwnershipStore: Send + Sync {
    fn get_edition_selection(&self, key: &ProgressKey) -> Result<Option<UserGameEdition>>;
    fn list_addition_ownership(&self, key: &ProgressKey) -> Result<Vec<UserGameAddition>>;
}

/// Aggregate achievement counts. Treated as advisory by the engine.
pub trait AchievementProvider: Send + Sync {
    fn achievement_totals(&self, key: &ProgressKey) -> Result<AchievementTotals>;
}

pub trait ProgressStore: Send + Sync {
    fn get_game_progress(&self, key: &ProgressKey) -> Result<Option<UserGameProgress>>;

    /// Writes the row only if the stored status still equals `expected`,
    /// checked and written atomically. A missing row counts as `backlog`.
    /// Returns `false` when another writer changed the status first.
    /// An existing `started_at` is never overwritten.
    fn promote_game_progress(
        &self,
        expected: GameStatus,
        progress: &UserGameProgress,
    ) -> Result<bool>;
}

/// One row of seed data for [`Store::write_catalog`].
#[derive(Debug, Clone)]
pub enum CatalogRecord {
    User(User),
    Game(Game),
    Platform(Platform),
    Addition(GameAddition),
    Edition(UserGameEdition),
    Ownership(UserGameAddition),
    Achievements {
        user_id: String,
        game_id: String,
        totals: AchievementTotals,
    },
}

/// Store defines the full database interface: the engine's collaborators
/// plus the minimal catalog needed to resolve requests.
pub trait Store:
    CompletionLogStore + AdditionCatalog + OwnershipStore + AchievementProvider + ProgressStore
{
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;

    // Game and platform operations
    fn create_game(&self, game: &Game) -> Result<()>;
    fn get_game(&self, id: &str) -> Result<Option<Game>>;
    fn create_platform(&self, platform: &Platform) -> Result<()>;
    fn get_platform(&self, id: &str) -> Result<Option<Platform>>;

    // Catalog and ownership writes
    fn create_addition(&self, addition: &GameAddition) -> Result<()>;
    fn set_edition_selection(&self, selection: &UserGameEdition) -> Result<()>;
    fn set_addition_ownership(&self, ownership: &UserGameAddition) -> Result<()>;
    fn set_achievement_totals(
        &self,
        user_id: &str,
        game_id: &str,
        totals: AchievementTotals,
    ) -> Result<()>;

    /// Writes the records in order, all or nothing. If any write fails the
    /// store is left as it was.
    fn write_catalog(&self, records: &[CatalogRecord]) -> Result<()>;
}
