//! Actions for the reducer pattern
//!
//! Every state transition is triggered by an action. Asynchronous
//! operations use the request / success / failure triple: the request is
//! dispatched by the caller, the outcome by the effect coordinator.

use serde::{Deserialize, Serialize};

use super::state::Snapshot;
use crate::types::{Movie, ReviewDraft, User};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Action {
    // === Auth ===
    LoginRequest {
        email: String,
        password: String,
    },

    LoginSuccess {
        user: User,
    },

    LoginFailure {
        error: String,
    },

    SignupRequest {
        full_name: String,
        email: String,
        password: String,
    },

    SignupSuccess,

    SignupFailure {
        error: String,
    },

    /// Always returns the auth slice to its initial state
    Logout,

    ClearError,

    /// Replace the user's favorite id list after a favorites mutation
    UpdateFavoriteIds(Vec<String>),

    // === Movies ===
    FetchMoviesRequest,

    FetchMoviesSuccess(Vec<Movie>),

    FetchMoviesFailure(String),

    // === Favorites ===
    FetchFavoritesRequest,

    FetchFavoritesSuccess(Vec<Movie>),

    FetchFavoritesFailure(String),

    /// Movie id to add
    AddFavoriteRequest(String),

    AddFavoriteSuccess(Vec<Movie>),

    AddFavoriteFailure(String),

    /// Movie id to remove
    RemoveFavoriteRequest(String),

    RemoveFavoriteSuccess(Vec<Movie>),

    RemoveFavoriteFailure(String),

    // === Reviews ===
    AddReviewRequest(ReviewDraft),

    AddReviewSuccess(ReviewDraft),

    AddReviewFailure {
        movie_id: String,
        local_id: String,
        error: String,
    },

    // === Persistence ===
    /// Restore a persisted snapshot; `None` when nothing was stored
    Rehydrate(Option<Snapshot>),
}

impl Action {
    /// Stable name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Action::LoginRequest { .. } => "login_request",
            Action::LoginSuccess { .. } => "login_success",
            Action::LoginFailure { .. } => "login_failure",
            Action::SignupRequest { .. } => "signup_request",
            Action::SignupSuccess => "signup_success",
            Action::SignupFailure { .. } => "signup_failure",
            Action::Logout => "logout",
            Action::ClearError => "clear_error",
            Action::UpdateFavoriteIds(_) => "update_favorite_ids",
            Action::FetchMoviesRequest => "fetch_movies_request",
            Action::FetchMoviesSuccess(_) => "fetch_movies_success",
            Action::FetchMoviesFailure(_) => "fetch_movies_failure",
            Action::FetchFavoritesRequest => "fetch_favorites_request",
            Action::FetchFavoritesSuccess(_) => "fetch_favorites_success",
            Action::FetchFavoritesFailure(_) => "fetch_favorites_failure",
            Action::AddFavoriteRequest(_) => "add_favorite_request",
            Action::AddFavoriteSuccess(_) => "add_favorite_success",
            Action::AddFavoriteFailure(_) => "add_favorite_failure",
            Action::RemoveFavoriteRequest(_) => "remove_favorite_request",
            Action::RemoveFavoriteSuccess(_) => "remove_favorite_success",
            Action::RemoveFavoriteFailure(_) => "remove_favorite_failure",
            Action::AddReviewRequest(_) => "add_review_request",
            Action::AddReviewSuccess(_) => "add_review_success",
            Action::AddReviewFailure { .. } => "add_review_failure",
            Action::Rehydrate(_) => "rehydrate",
        }
    }
}
