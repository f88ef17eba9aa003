//! Store state
//!
//! One slice per domain. All transitions happen through the reducer
//! (see `reducer.rs`); the helpers here only read.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::ReviewFailurePolicy;
use crate::types::{Movie, Review, User};

/// Root state: the single source of truth for the client
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootState {
    pub auth: AuthState,
    pub movie: MovieState,
    pub favorite: FavoriteState,
    pub review: ReviewState,

    /// Has a persisted snapshot been restored (or found absent)?
    pub rehydrated: bool,
}

impl RootState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_review_policy(policy: ReviewFailurePolicy) -> Self {
        Self {
            review: ReviewState {
                failure_policy: policy,
                ..ReviewState::default()
            },
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Anonymous,
    Authenticating,
    Authenticated,
    AuthError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub loading: bool,
    pub error: Option<String>,
}

impl AuthState {
    /// True iff a user with a non-empty token is present
    pub fn is_authenticated(&self) -> bool {
        self.user.as_ref().is_some_and(User::has_token)
    }

    pub fn token(&self) -> Option<&str> {
        self.user
            .as_ref()
            .filter(|u| u.has_token())
            .map(|u| u.token.as_str())
    }

    pub fn phase(&self) -> AuthPhase {
        if self.loading {
            AuthPhase::Authenticating
        } else if self.is_authenticated() {
            AuthPhase::Authenticated
        } else if self.error.is_some() {
            AuthPhase::AuthError
        } else {
            AuthPhase::Anonymous
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoviePhase {
    Idle,
    Loading,
    Loaded,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieState {
    pub movies: Vec<Movie>,
    pub loading: bool,
    pub error: Option<String>,
    /// At least one fetch has completed successfully
    pub fetched: bool,
}

impl MovieState {
    pub fn phase(&self) -> MoviePhase {
        if self.loading {
            MoviePhase::Loading
        } else if self.error.is_some() {
            MoviePhase::Error
        } else if self.fetched {
            MoviePhase::Loaded
        } else {
            MoviePhase::Idle
        }
    }
}

/// Status of one favorite operation family
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpStatus {
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FavoriteState {
    pub favorites: Vec<Movie>,
    pub fetch: OpStatus,
    pub add: OpStatus,
    pub remove: OpStatus,
}

impl FavoriteState {
    /// Any family in flight
    pub fn is_loading(&self) -> bool {
        self.fetch.loading || self.add.loading || self.remove.loading
    }

    /// First error across families, fetch first
    pub fn error(&self) -> Option<&str> {
        self.fetch
            .error
            .as_deref()
            .or(self.add.error.as_deref())
            .or(self.remove.error.as_deref())
    }

    pub fn ids(&self) -> Vec<String> {
        self.favorites.iter().map(|m| m.id.clone()).collect()
    }
}

/// Confirmation state of a locally held review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSync {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalReview {
    pub local_id: String,
    pub review: Review,
    pub sync: ReviewSync,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewState {
    pub reviews_by_movie: BTreeMap<String, Vec<LocalReview>>,
    /// Local ids of submissions awaiting a server answer
    pub in_flight: BTreeSet<String>,
    pub error: Option<String>,
    pub failure_policy: ReviewFailurePolicy,
}

impl ReviewState {
    /// True while any submission is unanswered
    pub fn is_loading(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn for_movie(&self, movie_id: &str) -> &[LocalReview] {
        self.reviews_by_movie
            .get(movie_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

pub const SNAPSHOT_VERSION: u32 = 1;

/// Persisted subset of the root state
///
/// Transient flags (loading, errors) are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub user: Option<User>,
    #[serde(default)]
    pub movies: Vec<Movie>,
    #[serde(default)]
    pub favorites: Vec<Movie>,
    #[serde(default)]
    pub reviews_by_movie: BTreeMap<String, Vec<LocalReview>>,
}

impl Snapshot {
    pub fn from_state(state: &RootState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            user: state.auth.user.clone(),
            movies: state.movie.movies.clone(),
            favorites: state.favorite.favorites.clone(),
            reviews_by_movie: state.review.reviews_by_movie.clone(),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.user
            .as_ref()
            .filter(|u| u.has_token())
            .map(|u| u.token.as_str())
    }
}
