//! Pure reducer for state transitions
//!
//! `(RootState, Action) -> RootState`, with no I/O and no clock reads.
//! Network calls triggered by request actions live in the effect
//! coordinator; the reducer only records that a request is in flight.

use super::actions::Action;
use super::state::{
    AuthState, FavoriteState, LocalReview, MovieState, OpStatus, ReviewState, ReviewSync,
    RootState,
};
use crate::config::ReviewFailurePolicy;
use crate::types::ReviewDraft;

fn started() -> OpStatus {
    OpStatus {
        loading: true,
        error: None,
    }
}

fn finished() -> OpStatus {
    OpStatus::default()
}

fn failed(error: String) -> OpStatus {
    OpStatus {
        loading: false,
        error: Some(error),
    }
}

pub fn reduce(state: RootState, action: Action) -> RootState {
    match action {
        // === Auth ===
        Action::LoginRequest { .. } | Action::SignupRequest { .. } => RootState {
            auth: AuthState {
                loading: true,
                error: None,
                ..state.auth
            },
            ..state
        },

        Action::LoginSuccess { user } => RootState {
            auth: AuthState {
                user: Some(user),
                loading: false,
                error: None,
            },
            ..state
        },

        Action::LoginFailure { error } => RootState {
            auth: AuthState {
                user: None,
                loading: false,
                error: Some(error),
            },
            ..state
        },

        Action::SignupSuccess => RootState {
            auth: AuthState {
                loading: false,
                error: None,
                ..state.auth
            },
            ..state
        },

        Action::SignupFailure { error } => RootState {
            auth: AuthState {
                loading: false,
                error: Some(error),
                ..state.auth
            },
            ..state
        },

        Action::Logout => RootState {
            auth: AuthState::default(),
            ..state
        },

        Action::ClearError => RootState {
            auth: AuthState {
                error: None,
                ..state.auth
            },
            ..state
        },

        Action::UpdateFavoriteIds(ids) => {
            let user = state.auth.user.map(|mut user| {
                user.favorites = ids;
                user
            });
            RootState {
                auth: AuthState { user, ..state.auth },
                ..state
            }
        }

        // === Movies ===
        Action::FetchMoviesRequest => RootState {
            movie: MovieState {
                loading: true,
                error: None,
                ..state.movie
            },
            ..state
        },

        Action::FetchMoviesSuccess(movies) => RootState {
            movie: MovieState {
                movies,
                loading: false,
                error: None,
                fetched: true,
            },
            ..state
        },

        // Movies from an earlier fetch stay visible behind the error
        Action::FetchMoviesFailure(error) => RootState {
            movie: MovieState {
                loading: false,
                error: Some(error),
                ..state.movie
            },
            ..state
        },

        // === Favorites ===
        Action::FetchFavoritesRequest => RootState {
            favorite: FavoriteState {
                fetch: started(),
                ..state.favorite
            },
            ..state
        },

        Action::FetchFavoritesSuccess(favorites) => RootState {
            favorite: FavoriteState {
                favorites,
                fetch: finished(),
                ..state.favorite
            },
            ..state
        },

        Action::FetchFavoritesFailure(error) => RootState {
            favorite: FavoriteState {
                fetch: failed(error),
                ..state.favorite
            },
            ..state
        },

        Action::AddFavoriteRequest(_) => RootState {
            favorite: FavoriteState {
                add: started(),
                ..state.favorite
            },
            ..state
        },

        Action::AddFavoriteSuccess(favorites) => RootState {
            favorite: FavoriteState {
                favorites,
                add: finished(),
                ..state.favorite
            },
            ..state
        },

        Action::AddFavoriteFailure(error) => RootState {
            favorite: FavoriteState {
                add: failed(error),
                ..state.favorite
            },
            ..state
        },

        Action::RemoveFavoriteRequest(_) => RootState {
            favorite: FavoriteState {
                remove: started(),
                ..state.favorite
            },
            ..state
        },

        Action::RemoveFavoriteSuccess(favorites) => RootState {
            favorite: FavoriteState {
                favorites,
                remove: finished(),
                ..state.favorite
            },
            ..state
        },

        Action::RemoveFavoriteFailure(error) => RootState {
            favorite: FavoriteState {
                remove: failed(error),
                ..state.favorite
            },
            ..state
        },

        // === Reviews ===
        Action::AddReviewRequest(draft) => RootState {
            review: review_submitted(state.review, &draft),
            ..state
        },

        Action::AddReviewSuccess(draft) => RootState {
            review: review_confirmed(state.review, &draft),
            ..state
        },

        Action::AddReviewFailure {
            movie_id,
            local_id,
            error,
        } => RootState {
            review: review_failed(state.review, &movie_id, &local_id, error),
            ..state
        },

        // === Persistence ===
        Action::Rehydrate(None) => RootState {
            rehydrated: true,
            ..state
        },

        Action::Rehydrate(Some(snapshot)) => RootState {
            auth: AuthState {
                user: snapshot.user,
                ..state.auth
            },
            movie: MovieState {
                fetched: state.movie.fetched || !snapshot.movies.is_empty(),
                movies: snapshot.movies,
                ..state.movie
            },
            favorite: FavoriteState {
                favorites: snapshot.favorites,
                ..state.favorite
            },
            review: ReviewState {
                reviews_by_movie: snapshot.reviews_by_movie,
                ..state.review
            },
            rehydrated: true,
        },
    }
}

/// Optimistically record a submitted review
fn review_submitted(mut review: ReviewState, draft: &ReviewDraft) -> ReviewState {
    review.in_flight.insert(draft.local_id.clone());
    review.error = None;
    upsert_local(&mut review, draft, ReviewSync::Pending);
    review
}

/// Mark the review confirmed, appending it if it was never recorded
fn review_confirmed(mut review: ReviewState, draft: &ReviewDraft) -> ReviewState {
    review.in_flight.remove(&draft.local_id);
    upsert_local(&mut review, draft, ReviewSync::Confirmed);
    review
}

fn review_failed(
    mut review: ReviewState,
    movie_id: &str,
    local_id: &str,
    error: String,
) -> ReviewState {
    review.in_flight.remove(local_id);
    review.error = Some(error);

    match review.failure_policy {
        ReviewFailurePolicy::Keep => {
            if let Some(entry) = review
                .reviews_by_movie
                .get_mut(movie_id)
                .and_then(|entries| entries.iter_mut().find(|r| r.local_id == local_id))
            {
                entry.sync = ReviewSync::Failed;
            }
        }
        ReviewFailurePolicy::Rollback => {
            if let Some(entries) = review.reviews_by_movie.get_mut(movie_id) {
                entries.retain(|r| r.local_id != local_id);
                if entries.is_empty() {
                    review.reviews_by_movie.remove(movie_id);
                }
            }
        }
    }
    review
}

fn upsert_local(review: &mut ReviewState, draft: &ReviewDraft, sync: ReviewSync) {
    let entries = review
        .reviews_by_movie
        .entry(draft.movie_id.clone())
        .or_default();

    match entries.iter_mut().find(|r| r.local_id == draft.local_id) {
        Some(existing) => existing.sync = sync,
        None => entries.push(LocalReview {
            local_id: draft.local_id.clone(),
            review: draft.to_review(),
            sync,
        }),
    }
}
