//! Completion progress aggregation.
//!
//! A log mutation flows through [`ProgressEngine`]: owned DLCs are resolved,
//! scores are calculated, changed derived values are appended to the log and
//! the library status is promoted when a rule matches.

mod calculator;
mod derived;
mod engine;
mod ownership;
mod status;

pub use calculator::{ProgressInputs, ProgressSummary, calculate, owned_required_dlcs};
pub use derived::{AUTO_CALCULATED_NOTE, record_derived};
pub use engine::{NewCompletion, ProgressEngine, Recalculation};
pub use ownership::resolve_owned_dlcs;
pub use status::{StatusOutcome, Transition, evaluate};
