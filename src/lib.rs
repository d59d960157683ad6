//! # Questlog
//!
//! Completion progress tracking for a game library, usable both as a
//! standalone server and as a library.
//!
//! Users log `main` and `dlc` completion percentages. The progress engine
//! derives `full` and `completionist` scores from them, records changed
//! scores in the same append-only log and promotes the library status.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use questlog::server::{AppState, create_router};
//! use questlog::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/questlog.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store)));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `questlog` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod import;
pub mod progress;
pub mod server;
pub mod store;
pub mod types;
