//! Pure score aggregation. No I/O happens here.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::types::{AchievementTotals, GameAddition};

/// Everything the calculator needs, already loaded from the stores.
#[derive(Debug, Clone, Copy)]
pub struct ProgressInputs<'a> {
    /// Latest `main` percentage, 0 when nothing was logged.
    pub main: u8,
    /// All additions of the game; non-DLC and optional entries are ignored.
    pub additions: &'a [GameAddition],
    /// Output of the ownership resolver.
    pub owned: &'a BTreeSet<String>,
    /// Latest `dlc` percentage per DLC id. Missing ids count as 0.
    pub dlc_percentages: &'a HashMap<String, u8>,
    pub achievements: AchievementTotals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub main: u8,
    pub full: u8,
    pub completionist: u8,
    pub achievement_percentage: u8,
    pub has_dlcs: bool,
}

/// Required DLCs that the user owns. Unowned required DLCs are left out
/// entirely rather than counted as zero.
pub fn owned_required_dlcs<'a>(
    additions: &'a [GameAddition],
    owned: &BTreeSet<String>,
) -> Vec<&'a GameAddition> {
    additions
        .iter()
        .filter(|a| a.is_required_dlc() && owned.contains(&a.id))
        .collect()
}

/// Combines main, DLC and achievement progress into the derived scores.
/// Every division truncates toward zero.
#[must_use]
pub fn calculate(inputs: &ProgressInputs<'_>) -> ProgressSummary {
    let owned_required = owned_required_dlcs(inputs.additions, inputs.owned);

    // Main always carries an implicit weight of 1.
    let mut weighted_sum = f64::from(inputs.main);
    let mut total_weight = 1.0_f64;

    for dlc in &owned_required {
        let pct = inputs.dlc_percentages.get(&dlc.id).copied().unwrap_or(0);
        weighted_sum += f64::from(pct) * dlc.weight;
        total_weight += dlc.weight;
    }

    let full = if total_weight == 0.0 {
        inputs.main
    } else {
        floor_percentage(weighted_sum / total_weight)
    };

    let AchievementTotals { total, completed } = inputs.achievements;
    let (achievement_percentage, completionist) = if total > 0 {
        let ratio = f64::from(completed) / f64::from(total);
        let achievement_percentage = floor_percentage(ratio * 100.0);
        let blended = (u16::from(full) + u16::from(achievement_percentage)) / 2;
        (achievement_percentage, blended as u8)
    } else {
        // No tracked achievements: that axis counts as satisfied.
        (100, full)
    };

    ProgressSummary {
        main: inputs.main,
        full,
        completionist,
        achievement_percentage,
        has_dlcs: !owned_required.is_empty(),
    }
}

fn floor_percentage(value: f64) -> u8 {
    value.floor().clamp(0.0, 100.0) as u8
}
