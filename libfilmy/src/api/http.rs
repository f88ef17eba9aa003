//! HTTP implementation of [`MovieApi`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::normalize::{favorite_list, movie_list, normalize_movie, user_from_login};
use super::{ApiResult, MovieApi};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::types::{Movie, User};

/// Client for the Filmy Talks REST API
#[derive(Clone)]
pub struct HttpApi {
    http: Client,
    base_url: String,
}

impl HttpApi {
    /// Client without a request timeout
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        Self::build(base_url.into(), None)
    }

    pub fn from_config(config: &ApiConfig) -> ApiResult<Self> {
        Self::build(
            config.base_url.clone(),
            config.timeout_secs.map(Duration::from_secs),
        )
    }

    fn build(base_url: String, timeout: Option<Duration>) -> ApiResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the body of a 2xx response
    async fn send(&self, request: RequestBuilder) -> ApiResult<String> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Request {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn send_json(&self, request: RequestBuilder) -> ApiResult<Value> {
        let body = self.send(request).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl MovieApi for HttpApi {
    async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        debug!("POST /auth/login for {}", email);
        let payload = self
            .send_json(
                self.http
                    .post(self.url("/auth/login"))
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;

        user_from_login(&payload)
    }

    async fn register(&self, full_name: &str, email: &str, password: &str) -> ApiResult<()> {
        debug!("POST /auth/register for {}", email);
        let payload = self
            .send_json(self.http.post(self.url("/auth/register")).json(&json!({
                "fullName": full_name,
                "email": email,
                "password": password,
            })))
            .await?;

        if payload.get("success").and_then(Value::as_bool) == Some(true) {
            Ok(())
        } else {
            let message = payload
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or("Signup failed");
            Err(ApiError::Rejected(message.to_string()))
        }
    }

    async fn list_movies(&self) -> ApiResult<Vec<Movie>> {
        debug!("GET /movies");
        let payload = match self.send_json(self.http.get(self.url("/movies"))).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Could not fetch movies, showing an empty catalog: {}", e);
                return Ok(Vec::new());
            }
        };

        match movie_list(&payload) {
            Some(movies) => {
                debug!("Fetched {} movies", movies.len());
                Ok(movies)
            }
            None => {
                warn!("Movie catalog payload is not an array, showing an empty catalog");
                Ok(Vec::new())
            }
        }
    }

    async fn get_movie(&self, id: &str) -> ApiResult<Movie> {
        debug!("GET /movies/{}", id);
        let payload = self
            .send_json(self.http.get(self.url(&format!("/movies/{}", id))))
            .await?;

        if !payload.is_object() {
            return Err(ApiError::Parse(format!(
                "expected a movie object for {}, got {}",
                id, payload
            )));
        }
        Ok(normalize_movie(&payload))
    }

    async fn add_favorite(&self, token: &str, movie_id: &str) -> ApiResult<Vec<Movie>> {
        debug!("POST /favorites {}", movie_id);
        let payload = self
            .send_json(
                self.http
                    .post(self.url("/favorites"))
                    .bearer_auth(token)
                    .json(&json!({ "movieId": movie_id })),
            )
            .await?;

        Ok(favorite_list(&payload))
    }

    async fn remove_favorite(&self, token: &str, movie_id: &str) -> ApiResult<Vec<Movie>> {
        debug!("DELETE /favorites/{}", movie_id);
        let payload = self
            .send_json(
                self.http
                    .delete(self.url(&format!("/favorites/{}", movie_id)))
                    .bearer_auth(token),
            )
            .await?;

        Ok(favorite_list(&payload))
    }

    async fn list_favorites(&self, token: &str) -> ApiResult<Vec<Movie>> {
        debug!("GET /favorites");
        let payload = self
            .send_json(self.http.get(self.url("/favorites")).bearer_auth(token))
            .await?;

        Ok(favorite_list(&payload))
    }

    async fn submit_review(
        &self,
        token: &str,
        movie_id: &str,
        comment: &str,
        rating: f64,
    ) -> ApiResult<()> {
        debug!("POST /movies/{}/reviews", movie_id);
        self.send(
            self.http
                .post(self.url(&format!("/movies/{}/reviews", movie_id)))
                .bearer_auth(token)
                .json(&json!({ "comment": comment, "rating": rating })),
        )
        .await?;

        Ok(())
    }

    async fn validate_token(&self, token: &str) -> ApiResult<bool> {
        debug!("POST /auth/validate");
        let result = self
            .send(self.http.post(self.url("/auth/validate")).bearer_auth(token))
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(ApiError::Request { status, .. })
                if status == StatusCode::UNAUTHORIZED.as_u16()
                    || status == StatusCode::FORBIDDEN.as_u16() =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
