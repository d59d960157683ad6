mod kinds;
mod models;

pub use kinds::{AdditionType, CompletionType, GameStatus};
pub use models::*;
