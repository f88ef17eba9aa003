//! Filmy - client core for the Filmy Talks movie app
//!
//! This library holds the state-synchronization layer of the client:
//! a reducer-driven store, an effect coordinator bridging request actions
//! to the remote HTTP API, form validation, and snapshot persistence.

pub mod api;
pub mod app;
pub mod config;
pub mod effects;
pub mod error;
pub mod logging;
pub mod storage;
pub mod store;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use app::FilmyApp;
pub use config::{Config, ReviewFailurePolicy};
pub use effects::Coordinator;
pub use error::{ApiError, FilmyError, Result};
pub use store::{reduce, Action, RootState, Store};
pub use types::{Movie, ReleaseStatus, Review, ReviewDraft, User};
