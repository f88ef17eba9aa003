//! In-memory [`MovieApi`] for tests
//!
//! Simulates the server side of accounts, the catalog, favorites and
//! reviews. Latency and failures can be injected per operation, or per
//! operation and key (the email for auth calls, the movie id for movie,
//! favorite and review calls), which is enough to stage request races.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use super::{ApiResult, MovieApi};
use crate::error::ApiError;
use crate::types::{Movie, Review, User};

/// Remote operations, used to target delays and failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Login,
    Register,
    ListMovies,
    GetMovie,
    AddFavorite,
    RemoveFavorite,
    ListFavorites,
    SubmitReview,
    ValidateToken,
}

#[derive(Debug, Clone)]
struct MockAccount {
    user: User,
    password: String,
}

#[derive(Default)]
struct MockState {
    accounts: Vec<MockAccount>,
    movies: Vec<Movie>,
    favorites: HashMap<String, Vec<String>>,
    reviews: Vec<(String, Review)>,
    delays: HashMap<(MockOp, Option<String>), Duration>,
    failures: HashMap<(MockOp, Option<String>), ApiError>,
    calls: HashMap<MockOp, usize>,
}

impl MockState {
    fn lookup<T: Clone>(
        map: &HashMap<(MockOp, Option<String>), T>,
        op: MockOp,
        key: &str,
    ) -> Option<T> {
        map.get(&(op, Some(key.to_string())))
            .or_else(|| map.get(&(op, None)))
            .cloned()
    }

    fn user_for_token(&self, token: &str) -> ApiResult<&MockAccount> {
        self.accounts
            .iter()
            .find(|a| a.user.token == token)
            .ok_or(ApiError::Request {
                status: 401,
                body: r#"{"success":false,"message":"Invalid token"}"#.to_string(),
            })
    }

    fn favorite_movies(&self, token: &str) -> Vec<Movie> {
        self.favorites
            .get(token)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.movies.iter().find(|m| &m.id == id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Clone, Default)]
pub struct MockApi {
    state: Arc<Mutex<MockState>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an account; its token is `token-<email>`
    pub fn with_account(self, full_name: &str, email: &str, password: &str) -> Self {
        self.add_account(full_name, email, password);
        self
    }

    pub fn with_movies(self, movies: Vec<Movie>) -> Self {
        self.state().movies = movies;
        self
    }

    /// Delay every call of `op`
    pub fn with_delay(self, op: MockOp, delay: Duration) -> Self {
        self.state().delays.insert((op, None), delay);
        self
    }

    /// Delay calls of `op` for one email or movie id
    pub fn with_delay_for(self, op: MockOp, key: &str, delay: Duration) -> Self {
        self.state().delays.insert((op, Some(key.to_string())), delay);
        self
    }

    /// Fail every call of `op` until cleared
    pub fn with_failure(self, op: MockOp, error: ApiError) -> Self {
        self.set_failure(op, error);
        self
    }

    pub fn set_failure(&self, op: MockOp, error: ApiError) {
        self.state().failures.insert((op, None), error);
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    pub fn add_account(&self, full_name: &str, email: &str, password: &str) -> User {
        let mut state = self.state();
        let user = User {
            id: format!("user-{}", state.accounts.len() + 1),
            full_name: full_name.to_string(),
            email: email.to_string(),
            token: format!("token-{}", email),
            favorites: Vec::new(),
        };
        state.accounts.push(MockAccount {
            user: user.clone(),
            password: password.to_string(),
        });
        user
    }

    /// Server-side favorite ids for `token`
    pub fn favorite_ids(&self, token: &str) -> Vec<String> {
        self.state().favorites.get(token).cloned().unwrap_or_default()
    }

    /// Reviews the server accepted for `movie_id`
    pub fn reviews_for(&self, movie_id: &str) -> Vec<Review> {
        self.state()
            .reviews
            .iter()
            .filter(|(id, _)| id == movie_id)
            .map(|(_, review)| review.clone())
            .collect()
    }

    pub fn call_count(&self, op: MockOp) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    /// Count the call, wait out any injected delay, then surface any
    /// injected failure
    async fn enter(&self, op: MockOp, key: &str) -> ApiResult<()> {
        let delay = {
            let mut state = self.state();
            *state.calls.entry(op).or_insert(0) += 1;
            MockState::lookup(&state.delays, op, key)
        };

        if let Some(delay) = delay {
            sleep(delay).await;
        }

        match MockState::lookup(&self.state().failures, op, key) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MovieApi for MockApi {
    async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        self.enter(MockOp::Login, email).await?;

        let state = self.state();
        let account = state
            .accounts
            .iter()
            .find(|a| a.user.email == email && a.password == password)
            .ok_or_else(|| ApiError::Rejected("Invalid credentials".to_string()))?;

        let mut user = account.user.clone();
        user.favorites = state.favorites.get(&user.token).cloned().unwrap_or_default();
        Ok(user)
    }

    async fn register(&self, full_name: &str, email: &str, password: &str) -> ApiResult<()> {
        self.enter(MockOp::Register, email).await?;

        if self.state().accounts.iter().any(|a| a.user.email == email) {
            return Err(ApiError::Request {
                status: 409,
                body: r#"{"success":false,"message":"Email already registered"}"#.to_string(),
            });
        }
        self.add_account(full_name, email, password);
        Ok(())
    }

    async fn list_movies(&self) -> ApiResult<Vec<Movie>> {
        self.enter(MockOp::ListMovies, "").await?;
        let state = self.state();

        // Fold accepted reviews back into the catalog like the server does
        let movies = state
            .movies
            .iter()
            .map(|movie| {
                let mut movie = movie.clone();
                movie.reviews.extend(
                    state
                        .reviews
                        .iter()
                        .filter(|(id, _)| id == &movie.id)
                        .map(|(_, review)| review.clone()),
                );
                movie
            })
            .collect();
        Ok(movies)
    }

    async fn get_movie(&self, id: &str) -> ApiResult<Movie> {
        self.enter(MockOp::GetMovie, id).await?;

        self.state()
            .movies
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| ApiError::Request {
                status: 404,
                body: r#"{"message":"Movie not found"}"#.to_string(),
            })
    }

    async fn add_favorite(&self, token: &str, movie_id: &str) -> ApiResult<Vec<Movie>> {
        self.enter(MockOp::AddFavorite, movie_id).await?;

        let mut state = self.state();
        state.user_for_token(token)?;
        let ids = state.favorites.entry(token.to_string()).or_default();
        if !ids.iter().any(|id| id == movie_id) {
            ids.push(movie_id.to_string());
        }
        Ok(state.favorite_movies(token))
    }

    async fn remove_favorite(&self, token: &str, movie_id: &str) -> ApiResult<Vec<Movie>> {
        self.enter(MockOp::RemoveFavorite, movie_id).await?;

        let mut state = self.state();
        state.user_for_token(token)?;
        if let Some(ids) = state.favorites.get_mut(token) {
            ids.retain(|id| id != movie_id);
        }
        Ok(state.favorite_movies(token))
    }

    async fn list_favorites(&self, token: &str) -> ApiResult<Vec<Movie>> {
        self.enter(MockOp::ListFavorites, token).await?;

        let state = self.state();
        state.user_for_token(token)?;
        Ok(state.favorite_movies(token))
    }

    async fn submit_review(
        &self,
        token: &str,
        movie_id: &str,
        comment: &str,
        rating: f64,
    ) -> ApiResult<()> {
        self.enter(MockOp::SubmitReview, movie_id).await?;

        let mut state = self.state();
        let user = state.user_for_token(token)?.user.clone();
        let id = format!("review-{}", state.reviews.len() + 1);
        state.reviews.push((
            movie_id.to_string(),
            Review {
                id: Some(id),
                author_name: user.full_name,
                rating,
                comment: comment.to_string(),
                user_id: Some(user.id),
                email: Some(user.email),
                created_at: Some(chrono::Utc::now()),
            },
        ));
        Ok(())
    }

    async fn validate_token(&self, token: &str) -> ApiResult<bool> {
        self.enter(MockOp::ValidateToken, token).await?;
        Ok(self.state().user_for_token(token).is_ok())
    }
}
