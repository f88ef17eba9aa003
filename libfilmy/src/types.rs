//! Core domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub token: String,
    /// Identifiers of the user's favorite movies
    #[serde(default)]
    pub favorites: Vec<String>,
}

impl User {
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    /// First word of the display name, or the whole name if it has none
    pub fn first_name(&self) -> &str {
        self.full_name
            .split_whitespace()
            .next()
            .unwrap_or(&self.full_name)
    }
}

/// Lifecycle of a movie in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReleaseStatus {
    #[serde(rename = "Past")]
    Past,
    #[serde(rename = "Now Showing")]
    NowShowing,
    #[serde(rename = "Upcoming")]
    Upcoming,
}

impl ReleaseStatus {
    pub const ALL: [ReleaseStatus; 3] = [
        ReleaseStatus::Past,
        ReleaseStatus::NowShowing,
        ReleaseStatus::Upcoming,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseStatus::Past => "Past",
            ReleaseStatus::NowShowing => "Now Showing",
            ReleaseStatus::Upcoming => "Upcoming",
        }
    }
}

impl FromStr for ReleaseStatus {
    type Err = String;

    /// Case-insensitive; accepts spaces, dashes or underscores in "now showing"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect();
        match key.as_str() {
            "past" => Ok(ReleaseStatus::Past),
            "nowshowing" => Ok(ReleaseStatus::NowShowing),
            "upcoming" => Ok(ReleaseStatus::Upcoming),
            _ => Err(format!(
                "Invalid release status: '{}'. Valid options: past, now-showing, upcoming",
                s
            )),
        }
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A movie as held in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: String,
    pub name: String,
    pub release_year: i32,
    pub status: ReleaseStatus,
    pub category: String,
    pub director: Option<String>,
    pub description: Option<String>,
    pub banner_image: Option<String>,
    pub rating: Option<f64>,
    #[serde(default)]
    pub cast: Vec<String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

/// A review, either embedded in a movie or held locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Option<String>,
    pub author_name: String,
    /// 0 to 5 inclusive
    pub rating: f64,
    pub comment: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Review {
    /// Two reviews share an author when their identifiers or emails match
    ///
    /// Absent values never match each other, so anonymous reviews are not
    /// folded together.
    pub fn same_author(&self, other: &Review) -> bool {
        let same_id = matches!(
            (&self.user_id, &other.user_id),
            (Some(a), Some(b)) if !a.is_empty() && a == b
        );
        let same_email = matches!(
            (&self.email, &other.email),
            (Some(a), Some(b)) if !a.is_empty() && a == b
        );
        same_id || same_email
    }

    pub fn is_by(&self, user: &User) -> bool {
        (!user.id.is_empty() && self.user_id.as_deref() == Some(user.id.as_str()))
            || (!user.email.is_empty() && self.email.as_deref() == Some(user.email.as_str()))
    }
}

/// A review being submitted, carried by the review actions
///
/// The local id and timestamp are fixed when the draft is created so the
/// reducer stays deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub local_id: String,
    pub movie_id: String,
    pub rating: f64,
    pub comment: String,
    pub author_name: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ReviewDraft {
    pub fn new(
        movie_id: impl Into<String>,
        rating: f64,
        comment: impl Into<String>,
        author_name: impl Into<String>,
    ) -> Self {
        Self {
            local_id: uuid::Uuid::new_v4().to_string(),
            movie_id: movie_id.into(),
            rating: rating.clamp(0.0, 5.0),
            comment: comment.into(),
            author_name: author_name.into(),
            user_id: None,
            email: None,
            created_at: Utc::now(),
        }
    }

    /// Draft authored by `user`
    pub fn for_user(
        user: &User,
        movie_id: impl Into<String>,
        rating: f64,
        comment: impl Into<String>,
    ) -> Self {
        let mut draft = Self::new(movie_id, rating, comment, user.full_name.clone());
        draft.user_id = Some(user.id.clone());
        draft.email = Some(user.email.clone());
        draft
    }

    pub fn to_review(&self) -> Review {
        Review {
            id: None,
            author_name: self.author_name.clone(),
            rating: self.rating,
            comment: self.comment.clone(),
            user_id: self.user_id.clone(),
            email: self.email.clone(),
            created_at: Some(self.created_at),
        }
    }
}
