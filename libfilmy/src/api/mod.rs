//! Remote API abstraction
//!
//! One trait method per remote operation. Each call issues exactly one
//! request and returns the normalized domain value, so the effect
//! coordinator never sees wire shapes.
//!
//! ```no_run
//! use libfilmy::api::{MovieApi, http::HttpApi};
//!
//! # async fn example() -> Result<(), libfilmy::ApiError> {
//! let api = HttpApi::new("http://localhost:5000/api")?;
//! let user = api.login("ada@example.com", "secret1").await?;
//! let favorites = api.list_favorites(&user.token).await?;
//! println!("{} has {} favorites", user.full_name, favorites.len());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{Movie, User};

pub mod http;
pub mod normalize;

// Available outside tests so integration tests and embedders can use it
pub mod mock;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[async_trait]
pub trait MovieApi: Send + Sync {
    /// Exchange credentials for an authenticated user
    ///
    /// # Errors
    ///
    /// `ApiError::Rejected` when the server answers `success: false` or omits
    /// the token, `ApiError::Request` for non-2xx statuses.
    async fn login(&self, email: &str, password: &str) -> ApiResult<User>;

    /// Create an account. Does not log in.
    async fn register(&self, full_name: &str, email: &str, password: &str) -> ApiResult<()>;

    /// Fetch the catalog
    ///
    /// Implementations degrade to an empty list instead of failing when the
    /// catalog cannot be fetched or decoded.
    async fn list_movies(&self) -> ApiResult<Vec<Movie>>;

    async fn get_movie(&self, id: &str) -> ApiResult<Movie>;

    /// Add a movie to the user's favorites, returning the full updated set
    async fn add_favorite(&self, token: &str, movie_id: &str) -> ApiResult<Vec<Movie>>;

    /// Remove a movie from the user's favorites, returning the full updated set
    async fn remove_favorite(&self, token: &str, movie_id: &str) -> ApiResult<Vec<Movie>>;

    async fn list_favorites(&self, token: &str) -> ApiResult<Vec<Movie>>;

    async fn submit_review(
        &self,
        token: &str,
        movie_id: &str,
        comment: &str,
        rating: f64,
    ) -> ApiResult<()>;

    /// Check whether the server still accepts `token`
    async fn validate_token(&self, token: &str) -> ApiResult<bool>;
}
