use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::schema::SCHEMA;
use super::{
    AchievementProvider, AdditionCatalog, CatalogRecord, CompletionLogStore, OwnershipStore,
    ProgressStore, Store,
};
use crate::error::{Error, Result};
use crate::types::*;

const COMPLETION_LOG_COLUMNS: &str =
    "id, user_id, game_id, platform_id, completion_type, dlc_id, percentage, logged_at, notes";

const ADDITION_COLUMNS: &str =
    "id, game_id, name, weight, required_for_full, addition_type, is_complete_edition";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

/// Fixed-width so that `ORDER BY logged_at` sorts chronologically.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_column<T>(idx: usize, value: String, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unexpected value '{value}'").into(),
        )
    })
}

fn row_to_completion_log(row: &Row<'_>) -> rusqlite::Result<CompletionLogEntry> {
    Ok(CompletionLogEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        game_id: row.get(2)?,
        platform_id: row.get(3)?,
        completion_type: parse_column(4, row.get(4)?, CompletionType::parse)?,
        dlc_id: row.get(5)?,
        percentage: row.get(6)?,
        logged_at: parse_datetime(&row.get::<_, String>(7)?),
        notes: row.get(8)?,
    })
}

fn row_to_addition(row: &Row<'_>) -> rusqlite::Result<GameAddition> {
    Ok(GameAddition {
        id: row.get(0)?,
        game_id: row.get(1)?,
        name: row.get(2)?,
        weight: row.get(3)?,
        required_for_full: row.get(4)?,
        addition_type: parse_column(5, row.get(5)?, AdditionType::parse)?,
        is_complete_edition: row.get(6)?,
    })
}

impl CompletionLogStore for SqliteStore {
    fn append_completion_log(&self, entry: &CompletionLogEntry) -> Result<()> {
        self.conn().execute(
            &format!(
                "INSERT INTO completion_logs ({COMPLETION_LOG_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                entry.id,
                entry.user_id,
                entry.game_id,
                entry.platform_id,
                entry.completion_type.as_str(),
                entry.dlc_id,
                entry.percentage,
                format_datetime(&entry.logged_at),
                entry.notes,
            ],
        )?;
        Ok(())
    }

    fn latest_completion_log(
        &self,
        key: &ProgressKey,
        completion_type: CompletionType,
        dlc_id: Option<&str>,
    ) -> Result<Option<CompletionLogEntry>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {COMPLETION_LOG_COLUMNS} FROM completion_logs
                 WHERE user_id = ?1 AND game_id = ?2 AND platform_id = ?3
                   AND completion_type = ?4 AND dlc_id IS ?5
                 ORDER BY logged_at DESC, rowid DESC LIMIT 1"
            ),
            params![
                key.user_id,
                key.game_id,
                key.platform_id,
                completion_type.as_str(),
                dlc_id,
            ],
            row_to_completion_log,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_completion_log(&self, id: &str) -> Result<Option<CompletionLogEntry>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {COMPLETION_LOG_COLUMNS} FROM completion_logs WHERE id = ?1"),
            params![id],
            row_to_completion_log,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_completion_logs(
        &self,
        key: &ProgressKey,
        completion_type: Option<CompletionType>,
        limit: i32,
    ) -> Result<Vec<CompletionLogEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMPLETION_LOG_COLUMNS} FROM completion_logs
             WHERE user_id = ?1 AND game_id = ?2 AND platform_id = ?3
               AND (?4 IS NULL OR completion_type = ?4)
             ORDER BY logged_at DESC, rowid DESC LIMIT ?5"
        ))?;

        let rows = stmt.query_map(
            params![
                key.user_id,
                key.game_id,
                key.platform_id,
                completion_type.map(CompletionType::as_str),
                limit,
            ],
            row_to_completion_log,
        )?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_completion_log(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM completion_logs WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}

impl AdditionCatalog for SqliteStore {
    fn get_addition(&self, id: &str) -> Result<Option<GameAddition>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ADDITION_COLUMNS} FROM game_additions WHERE id = ?1"),
            params![id],
            row_to_addition,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_game_additions(&self, game_id: &str) -> Result<Vec<GameAddition>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ADDITION_COLUMNS} FROM game_additions WHERE game_id = ?1 ORDER BY id"
        ))?;

        let rows = stmt.query_map(params![game_id], row_to_addition)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}

impl OwnershipStore for SqliteStore {
    fn get_edition_selection(&self, key: &ProgressKey) -> Result<Option<UserGameEdition>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT user_id, game_id, platform_id, edition_id FROM user_game_editions
             WHERE user_id = ?1 AND game_id = ?2 AND platform_id = ?3",
            params![key.user_id, key.game_id, key.platform_id],
            |row| {
                Ok(UserGameEdition {
                    user_id: row.get(0)?,
                    game_id: row.get(1)?,
                    platform_id: row.get(2)?,
                    edition_id: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_addition_ownership(&self, key: &ProgressKey) -> Result<Vec<UserGameAddition>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, game_id, platform_id, addition_id, owned FROM user_game_additions
             WHERE user_id = ?1 AND game_id = ?2 AND platform_id = ?3
             ORDER BY addition_id",
        )?;

        let rows = stmt.query_map(params![key.user_id, key.game_id, key.platform_id], |row| {
            Ok(UserGameAddition {
                user_id: row.get(0)?,
                game_id: row.get(1)?,
                platform_id: row.get(2)?,
                addition_id: row.get(3)?,
                owned: row.get(4)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}

impl AchievementProvider for SqliteStore {
    fn achievement_totals(&self, key: &ProgressKey) -> Result<AchievementTotals> {
        let conn = self.conn();
        let totals = conn
            .query_row(
                "SELECT total, completed FROM achievement_totals
                 WHERE user_id = ?1 AND game_id = ?2",
                params![key.user_id, key.game_id],
                |row| {
                    Ok(AchievementTotals {
                        total: row.get(0)?,
                        completed: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(totals.unwrap_or_default())
    }
}

impl ProgressStore for SqliteStore {
    fn get_game_progress(&self, key: &ProgressKey) -> Result<Option<UserGameProgress>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT user_id, game_id, platform_id, status, completion_percentage, started_at, updated_at
             FROM user_game_progress
             WHERE user_id = ?1 AND game_id = ?2 AND platform_id = ?3",
            params![key.user_id, key.game_id, key.platform_id],
            |row| {
                Ok(UserGameProgress {
                    user_id: row.get(0)?,
                    game_id: row.get(1)?,
                    platform_id: row.get(2)?,
                    status: parse_column(3, row.get(3)?, GameStatus::parse)?,
                    completion_percentage: row.get(4)?,
                    started_at: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
                    updated_at: parse_datetime(&row.get::<_, String>(6)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn promote_game_progress(
        &self,
        expected: GameStatus,
        progress: &UserGameProgress,
    ) -> Result<bool> {
        // Only a backlog expectation may create the row.
        let sql = if expected == GameStatus::Backlog {
            "INSERT INTO user_game_progress (user_id, game_id, platform_id, status, completion_percentage, started_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (user_id, game_id, platform_id) DO UPDATE SET
                status = excluded.status,
                completion_percentage = excluded.completion_percentage,
                started_at = COALESCE(user_game_progress.started_at, excluded.started_at),
                updated_at = excluded.updated_at
             WHERE user_game_progress.status = ?8"
        } else {
            "UPDATE user_game_progress SET
                status = ?4,
                completion_percentage = ?5,
                started_at = COALESCE(started_at, ?6),
                updated_at = ?7
             WHERE user_id = ?1 AND game_id = ?2 AND platform_id = ?3 AND status = ?8"
        };

        let rows = self.conn().execute(
            sql,
            params![
                progress.user_id,
                progress.game_id,
                progress.platform_id,
                progress.status.as_str(),
                progress.completion_percentage,
                progress.started_at.as_ref().map(format_datetime),
                format_datetime(&progress.updated_at),
                expected.as_str(),
            ],
        )?;
        Ok(rows > 0)
    }
}

// Catalog writes take a bare connection so that `write_catalog` can run
// them inside one transaction.

fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, created_at) VALUES (?1, ?2, ?3)",
        params![user.id, user.name, format_datetime(&user.created_at)],
    )?;
    Ok(())
}

fn insert_game(conn: &Connection, game: &Game) -> Result<()> {
    conn.execute(
        "INSERT INTO games (id, name, created_at) VALUES (?1, ?2, ?3)",
        params![game.id, game.name, format_datetime(&game.created_at)],
    )?;
    Ok(())
}

fn insert_platform(conn: &Connection, platform: &Platform) -> Result<()> {
    conn.execute(
        "INSERT INTO platforms (id, name, created_at) VALUES (?1, ?2, ?3)",
        params![
            platform.id,
            platform.name,
            format_datetime(&platform.created_at)
        ],
    )?;
    Ok(())
}

fn insert_addition(conn: &Connection, addition: &GameAddition) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO game_additions ({ADDITION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            addition.id,
            addition.game_id,
            addition.name,
            addition.weight,
            addition.required_for_full,
            addition.addition_type.as_str(),
            addition.is_complete_edition,
        ],
    )?;
    Ok(())
}

fn upsert_edition_selection(conn: &Connection, selection: &UserGameEdition) -> Result<()> {
    conn.execute(
        "INSERT INTO user_game_editions (user_id, game_id, platform_id, edition_id)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (user_id, game_id, platform_id) DO UPDATE SET
            edition_id = excluded.edition_id",
        params![
            selection.user_id,
            selection.game_id,
            selection.platform_id,
            selection.edition_id,
        ],
    )?;
    Ok(())
}

fn upsert_addition_ownership(conn: &Connection, ownership: &UserGameAddition) -> Result<()> {
    conn.execute(
        "INSERT INTO user_game_additions (user_id, game_id, platform_id, addition_id, owned)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (user_id, game_id, platform_id, addition_id) DO UPDATE SET
            owned = excluded.owned",
        params![
            ownership.user_id,
            ownership.game_id,
            ownership.platform_id,
            ownership.addition_id,
            ownership.owned,
        ],
    )?;
    Ok(())
}

fn upsert_achievement_totals(
    conn: &Connection,
    user_id: &str,
    game_id: &str,
    totals: AchievementTotals,
) -> Result<()> {
    conn.execute(
        "INSERT INTO achievement_totals (user_id, game_id, total, completed)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (user_id, game_id) DO UPDATE SET
            total = excluded.total,
            completed = excluded.completed",
        params![user_id, game_id, totals.total, totals.completed],
    )?;
    Ok(())
}

fn write_record(conn: &Connection, record: &CatalogRecord) -> Result<()> {
    match record {
        CatalogRecord::User(user) => insert_user(conn, user),
        CatalogRecord::Game(game) => insert_game(conn, game),
        CatalogRecord::Platform(platform) => insert_platform(conn, platform),
        CatalogRecord::Addition(addition) => insert_addition(conn, addition),
        CatalogRecord::Edition(selection) => upsert_edition_selection(conn, selection),
        CatalogRecord::Ownership(ownership) => upsert_addition_ownership(conn, ownership),
        CatalogRecord::Achievements {
            user_id,
            game_id,
            totals,
        } => upsert_achievement_totals(conn, user_id, game_id, *totals),
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        insert_user(&self.conn(), user)
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, created_at FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    // Game and platform operations

    fn create_game(&self, game: &Game) -> Result<()> {
        insert_game(&self.conn(), game)
    }

    fn get_game(&self, id: &str) -> Result<Option<Game>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, created_at FROM games WHERE id = ?1",
            params![id],
            |row| {
                Ok(Game {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn create_platform(&self, platform: &Platform) -> Result<()> {
        insert_platform(&self.conn(), platform)
    }

    fn get_platform(&self, id: &str) -> Result<Option<Platform>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, created_at FROM platforms WHERE id = ?1",
            params![id],
            |row| {
                Ok(Platform {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    // Catalog and ownership writes

    fn create_addition(&self, addition: &GameAddition) -> Result<()> {
        insert_addition(&self.conn(), addition)
    }

    fn set_edition_selection(&self, selection: &UserGameEdition) -> Result<()> {
        upsert_edition_selection(&self.conn(), selection)
    }

    fn set_addition_ownership(&self, ownership: &UserGameAddition) -> Result<()> {
        upsert_addition_ownership(&self.conn(), ownership)
    }

    fn set_achievement_totals(
        &self,
        user_id: &str,
        game_id: &str,
        totals: AchievementTotals,
    ) -> Result<()> {
        upsert_achievement_totals(&self.conn(), user_id, game_id, totals)
    }

    fn write_catalog(&self, records: &[CatalogRecord]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for record in records {
            write_record(&tx, record)?;
        }
        tx.commit()?;
        Ok(())
    }
}
