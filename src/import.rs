//! Catalog seeding from a TOML document.
//!
//! Game catalog and ownership management live in other services; this
//! loader lets a standalone deployment (and the test suite) populate the
//! rows the progress engine reads.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::{CatalogRecord, Store};
use crate::types::*;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CatalogFile {
    pub users: Vec<NamedRow>,
    pub games: Vec<NamedRow>,
    pub platforms: Vec<NamedRow>,
    pub additions: Vec<AdditionRow>,
    pub editions: Vec<UserGameEdition>,
    pub owned_additions: Vec<OwnedAdditionRow>,
    pub achievements: Vec<AchievementRow>,
}

#[derive(Debug, Deserialize)]
pub struct NamedRow {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AdditionRow {
    pub id: String,
    pub game_id: String,
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub required_for_full: bool,
    pub addition_type: AdditionType,
    #[serde(default)]
    pub is_complete_edition: bool,
}

#[derive(Debug, Deserialize)]
pub struct OwnedAdditionRow {
    pub user_id: String,
    pub game_id: String,
    pub platform_id: String,
    pub addition_id: String,
    #[serde(default = "default_owned")]
    pub owned: bool,
}

#[derive(Debug, Deserialize)]
pub struct AchievementRow {
    pub user_id: String,
    pub game_id: String,
    pub total: u32,
    pub completed: u32,
}

fn default_weight() -> f64 {
    1.0
}

fn default_owned() -> bool {
    true
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub users: usize,
    pub games: usize,
    pub platforms: usize,
    pub additions: usize,
    pub editions: usize,
    pub owned_additions: usize,
    pub achievements: usize,
}

impl CatalogFile {
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(format!("invalid catalog: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }
}

/// Checks every row, then writes the whole catalog as one all-or-nothing
/// batch. A rejected catalog leaves the store untouched, so the corrected
/// file can be imported again.
pub fn import_catalog(store: &dyn Store, catalog: CatalogFile) -> Result<ImportSummary> {
    let now = Utc::now();
    let summary = ImportSummary {
        users: catalog.users.len(),
        games: catalog.games.len(),
        platforms: catalog.platforms.len(),
        additions: catalog.additions.len(),
        editions: catalog.editions.len(),
        owned_additions: catalog.owned_additions.len(),
        achievements: catalog.achievements.len(),
    };

    let mut records = Vec::new();

    records.extend(catalog.users.into_iter().map(|row| {
        CatalogRecord::User(User {
            id: row.id,
            name: row.name,
            created_at: now,
        })
    }));
    records.extend(catalog.games.into_iter().map(|row| {
        CatalogRecord::Game(Game {
            id: row.id,
            name: row.name,
            created_at: now,
        })
    }));
    records.extend(catalog.platforms.into_iter().map(|row| {
        CatalogRecord::Platform(Platform {
            id: row.id,
            name: row.name,
            created_at: now,
        })
    }));

    let mut additions: HashMap<String, GameAddition> = HashMap::new();
    for row in catalog.additions {
        if !row.weight.is_finite() || row.weight <= 0.0 {
            return Err(Error::Validation(format!(
                "addition '{}' must have a positive weight",
                row.id
            )));
        }
        if row.is_complete_edition && row.addition_type != AdditionType::Edition {
            return Err(Error::Validation(format!(
                "addition '{}' is flagged as a complete edition but is not an edition",
                row.id
            )));
        }
        let addition = GameAddition {
            id: row.id,
            game_id: row.game_id,
            name: row.name,
            weight: row.weight,
            required_for_full: row.required_for_full,
            addition_type: row.addition_type,
            is_complete_edition: row.is_complete_edition,
        };
        records.push(CatalogRecord::Addition(addition.clone()));
        additions.insert(addition.id.clone(), addition);
    }

    for selection in catalog.editions {
        if let Some(edition_id) = selection.edition_id.as_deref() {
            let edition = find_addition(store, &additions, edition_id)?;
            if !edition.is_some_and(|a| {
                a.game_id == selection.game_id && a.addition_type == AdditionType::Edition
            }) {
                return Err(Error::Validation(format!(
                    "'{edition_id}' is not an edition of game '{}'",
                    selection.game_id
                )));
            }
        }
        records.push(CatalogRecord::Edition(selection));
    }

    for row in catalog.owned_additions {
        let addition = find_addition(store, &additions, &row.addition_id)?
            .filter(|a| a.game_id == row.game_id)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "addition '{}' does not belong to game '{}'",
                    row.addition_id, row.game_id
                ))
            })?;
        records.push(CatalogRecord::Ownership(UserGameAddition {
            user_id: row.user_id,
            game_id: row.game_id,
            platform_id: row.platform_id,
            addition_id: addition.id,
            owned: row.owned,
        }));
    }

    for row in catalog.achievements {
        if row.completed > row.total {
            return Err(Error::Validation(format!(
                "achievements for game '{}' complete {} of only {}",
                row.game_id, row.completed, row.total
            )));
        }
        records.push(CatalogRecord::Achievements {
            user_id: row.user_id,
            game_id: row.game_id,
            totals: AchievementTotals {
                total: row.total,
                completed: row.completed,
            },
        });
    }

    store.write_catalog(&records)?;

    tracing::info!(
        "Imported {} users, {} games, {} platforms, {} additions",
        summary.users,
        summary.games,
        summary.platforms,
        summary.additions
    );

    Ok(summary)
}

/// Looks in the catalog being imported first, then in the store.
fn find_addition(
    store: &dyn Store,
    pending: &HashMap<String, GameAddition>,
    id: &str,
) -> Result<Option<GameAddition>> {
    match pending.get(id) {
        Some(addition) => Ok(Some(addition.clone())),
        None => store.get_addition(id),
    }
}
