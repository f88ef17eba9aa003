//! Read-only views over the store state

use super::state::{ReviewSync, RootState};
use crate::types::{Movie, ReleaseStatus, Review, User};

pub const YOU_SUFFIX: &str = " (You)";

/// A review as shown next to a movie
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewView {
    pub review: Review,
    /// Written by the signed-in user; the author name carries " (You)"
    pub mine: bool,
    /// Local confirmation state, `None` for reviews embedded in the movie
    pub sync: Option<ReviewSync>,
}

pub fn first_name(user: &User) -> &str {
    user.first_name()
}

/// Movies with the given status whose name contains `search`, ignoring case
pub fn movies_by_status<'a>(
    movies: &'a [Movie],
    status: ReleaseStatus,
    search: &str,
) -> Vec<&'a Movie> {
    let needle = search.trim().to_lowercase();
    movies
        .iter()
        .filter(|m| m.status == status)
        .filter(|m| needle.is_empty() || m.name.to_lowercase().contains(&needle))
        .collect()
}

pub fn is_favorite(state: &RootState, movie_id: &str) -> bool {
    state.favorite.favorites.iter().any(|m| m.id == movie_id)
        || state
            .auth
            .user
            .as_ref()
            .is_some_and(|u| u.favorites.iter().any(|id| id == movie_id))
}

/// Embedded reviews followed by local ones, one entry per author
///
/// The first review found for an author wins, so a server-confirmed
/// review shadows the local copy of the same submission.
pub fn reviews_for_movie(state: &RootState, movie: &Movie) -> Vec<ReviewView> {
    let embedded = movie.reviews.iter().map(|r| (r.clone(), None));
    let local = state
        .review
        .for_movie(&movie.id)
        .iter()
        .map(|l| (l.review.clone(), Some(l.sync)));

    let mut merged: Vec<(Review, Option<ReviewSync>)> = Vec::new();
    for (review, sync) in embedded.chain(local) {
        if merged.iter().any(|(kept, _)| kept.same_author(&review)) {
            continue;
        }
        merged.push((review, sync));
    }

    let user = state.auth.user.as_ref();
    merged
        .into_iter()
        .map(|(mut review, sync)| {
            let mine = user.is_some_and(|u| review.is_by(u));
            if mine {
                review.author_name.push_str(YOU_SUFFIX);
            }
            ReviewView { review, mine, sync }
        })
        .collect()
}

/// The signed-in user's review of `movie`, if they have written one
pub fn user_review(state: &RootState, movie: &Movie) -> Option<ReviewView> {
    reviews_for_movie(state, movie).into_iter().find(|r| r.mine)
}
