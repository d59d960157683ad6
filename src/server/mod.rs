mod completion;
pub mod dto;
pub mod response;
mod router;
pub mod validation;

pub use completion::completion_router;
pub use router::{AppState, create_router};
