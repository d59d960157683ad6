use std::collections::BTreeSet;

use crate::error::Result;
use crate::store::OwnershipStore;
use crate::types::{GameAddition, ProgressKey};

/// Resolves the DLC ids that count as owned for a library entry.
///
/// A selected complete edition grants every DLC of the game. Otherwise only
/// explicitly owned `dlc` additions of this game are returned. Missing rows
/// resolve to an empty set.
pub fn resolve_owned_dlcs(
    ownership: &dyn OwnershipStore,
    additions: &[GameAddition],
    key: &ProgressKey,
) -> Result<BTreeSet<String>> {
    let selected_edition = ownership
        .get_edition_selection(key)?
        .and_then(|selection| selection.edition_id);

    let complete_edition = selected_edition.is_some_and(|edition_id| {
        additions
            .iter()
            .any(|a| a.id == edition_id && a.is_complete_edition)
    });

    if complete_edition {
        return Ok(additions
            .iter()
            .filter(|a| a.is_dlc())
            .map(|a| a.id.clone())
            .collect());
    }

    let owned = ownership
        .list_addition_ownership(key)?
        .into_iter()
        .filter(|row| row.owned)
        .filter(|row| {
            additions
                .iter()
                .any(|a| a.id == row.addition_id && a.is_dlc())
        })
        .map(|row| row.addition_id)
        .collect();

    Ok(owned)
}
