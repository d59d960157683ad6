use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of value a completion log entry records.
///
/// `Main` and `Dlc` are submitted by users. `Full` and `Completionist` are
/// derived and only ever written by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionType {
    Main,
    Dlc,
    Full,
    Completionist,
}

impl CompletionType {
    pub const DERIVED: [CompletionType; 2] = [Self::Full, Self::Completionist];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Dlc => "dlc",
            Self::Full => "full",
            Self::Completionist => "completionist",
        }
    }

    pub fn parse(s: &str) -> Option<CompletionType> {
        match s {
            "main" => Some(Self::Main),
            "dlc" => Some(Self::Dlc),
            "full" => Some(Self::Full),
            "completionist" => Some(Self::Completionist),
            _ => None,
        }
    }

    /// Returns true for types computed by the engine rather than submitted.
    #[must_use]
    pub const fn is_derived(self) -> bool {
        matches!(self, Self::Full | Self::Completionist)
    }
}

impl fmt::Display for CompletionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdditionType {
    Dlc,
    Edition,
    Other,
}

impl AdditionType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dlc => "dlc",
            Self::Edition => "edition",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<AdditionType> {
        match s {
            "dlc" => Some(Self::Dlc),
            "edition" => Some(Self::Edition),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for AdditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Library status of a game for one user on one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    #[default]
    Backlog,
    Playing,
    Finished,
    Completed,
    Dropped,
}

impl GameStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Playing => "playing",
            Self::Finished => "finished",
            Self::Completed => "completed",
            Self::Dropped => "dropped",
        }
    }

    pub fn parse(s: &str) -> Option<GameStatus> {
        match s {
            "backlog" => Some(Self::Backlog),
            "playing" => Some(Self::Playing),
            "finished" => Some(Self::Finished),
            "completed" => Some(Self::Completed),
            "dropped" => Some(Self::Dropped),
            _ => None,
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_type_parse() {
        assert_eq!(CompletionType::parse("main"), Some(CompletionType::Main));
        assert_eq!(
            CompletionType::parse("completionist"),
            Some(CompletionType::Completionist)
        );
        assert_eq!(CompletionType::parse("MAIN"), None);
        assert_eq!(CompletionType::parse(""), None);
    }

    #[test]
    fn test_derived_types() {
        assert!(!CompletionType::Main.is_derived());
        assert!(!CompletionType::Dlc.is_derived());
        assert!(CompletionType::Full.is_derived());
        assert!(CompletionType::Completionist.is_derived());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&GameStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        assert_eq!(GameStatus::default(), GameStatus::Backlog);
    }

    #[test]
    fn test_addition_type_round_trips_through_str() {
        for kind in [AdditionType::Dlc, AdditionType::Edition, AdditionType::Other] {
            assert_eq!(AdditionType::parse(kind.as_str()), Some(kind));
        }
    }
}
