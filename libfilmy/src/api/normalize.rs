//! Mapping of untyped server records onto the strict domain types
//!
//! The movie service has served several record shapes over time. Every
//! accepted alias is listed here, in priority order:
//!
//! | field          | aliases                                   | fallback            |
//! |----------------|-------------------------------------------|---------------------|
//! | `id`           | `_id`, `id`                               | stable content hash |
//! | `name`         | `movieName`, `title`, `name`              | `"Untitled"`        |
//! | `release_year` | `releaseYear`, year of `releaseDate`      | 2024                |
//! | `status`       | `status`                                  | Now Showing         |
//! | `category`     | `category`, `genre`                       | `"General"`         |
//! | `director`     | `Director`, `director`                    | none                |
//! | `description`  | `description`, `overview`                 | none                |
//! | `banner_image` | `bannerImage`, `posterUrl`, `poster`      | none                |
//! | `rating`       | `rating`, `voteAverage`                   | none                |

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::ApiError;
use crate::types::{Movie, ReleaseStatus, Review, User};

pub const DEFAULT_RELEASE_YEAR: i32 = 2024;
pub const UNTITLED: &str = "Untitled";
pub const DEFAULT_CATEGORY: &str = "General";
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

const ID_KEYS: &[&str] = &["_id", "id"];
const NAME_KEYS: &[&str] = &["movieName", "title", "name"];
const CATEGORY_KEYS: &[&str] = &["category", "genre"];
const DIRECTOR_KEYS: &[&str] = &["Director", "director"];
const DESCRIPTION_KEYS: &[&str] = &["description", "overview"];
const BANNER_KEYS: &[&str] = &["bannerImage", "posterUrl", "poster"];
const RATING_KEYS: &[&str] = &["rating", "voteAverage"];

/// First non-empty string among `keys`; numeric ids are stringified
fn first_string(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match raw.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn first_number(raw: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match raw.get(*key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn string_list(raw: &Value, key: &str) -> Vec<String> {
    raw.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn year_from_date(date: &str) -> Option<i32> {
    let date = date.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
        return Some(parsed.year());
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Some(parsed.year());
    }
    date.get(..4).and_then(|prefix| prefix.parse().ok())
}

fn release_year(raw: &Value) -> i32 {
    // zero counts as missing, like an absent field
    let explicit = first_number(raw, &["releaseYear"])
        .map(|y| y as i32)
        .filter(|y| *y != 0);

    explicit
        .or_else(|| {
            raw.get("releaseDate")
                .and_then(Value::as_str)
                .and_then(year_from_date)
        })
        .unwrap_or(DEFAULT_RELEASE_YEAR)
}

fn release_status(raw: &Value) -> ReleaseStatus {
    match raw.get("status").and_then(Value::as_str) {
        Some(status) => status.parse().unwrap_or_else(|_| {
            debug!("Unknown release status '{}', treating as Now Showing", status);
            ReleaseStatus::NowShowing
        }),
        None => ReleaseStatus::NowShowing,
    }
}

/// Identifier for a record the server sent without one
///
/// Derived from content so the same record gets the same id on every
/// fetch.
pub fn placeholder_id(name: &str, release_year: i32, category: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(release_year.to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(category.as_bytes());
    let digest = hasher.finalize();

    let hex: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
    format!("local-{}", hex)
}

pub fn normalize_review(raw: &Value) -> Option<Review> {
    if !raw.is_object() {
        return None;
    }

    let email = first_string(raw, &["email"]);
    let author_name = first_string(raw, &["fullName", "userName"])
        .or_else(|| {
            email
                .as_deref()
                .and_then(|e| e.split('@').next())
                .filter(|local| !local.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string());

    let created_at = raw
        .get("createdAt")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Some(Review {
        id: first_string(raw, ID_KEYS),
        author_name,
        rating: first_number(raw, &["rating"]).unwrap_or(0.0).clamp(0.0, 5.0),
        comment: raw
            .get("comment")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        user_id: first_string(raw, &["_userId", "userId"]),
        email,
        created_at,
    })
}

pub fn normalize_movie(raw: &Value) -> Movie {
    let name = first_string(raw, NAME_KEYS).unwrap_or_else(|| UNTITLED.to_string());
    let release_year = release_year(raw);
    let category = first_string(raw, CATEGORY_KEYS).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    let id = first_string(raw, ID_KEYS).unwrap_or_else(|| {
        let id = placeholder_id(&name, release_year, &category);
        debug!("Movie '{}' has no identifier, using {}", name, id);
        id
    });

    let reviews = raw
        .get("reviews")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(normalize_review).collect())
        .unwrap_or_default();

    Movie {
        id,
        status: release_status(raw),
        director: first_string(raw, DIRECTOR_KEYS),
        description: first_string(raw, DESCRIPTION_KEYS),
        banner_image: first_string(raw, BANNER_KEYS),
        rating: first_number(raw, RATING_KEYS),
        cast: string_list(raw, "cast"),
        reviews,
        name,
        release_year,
        category,
    }
}

/// Normalize a catalog payload; `None` when it is not an array
pub fn movie_list(payload: &Value) -> Option<Vec<Movie>> {
    payload
        .as_array()
        .map(|items| items.iter().map(normalize_movie).collect())
}

/// Normalize a favorites payload: a bare array or `{"favorites": [...]}`
pub fn favorite_list(payload: &Value) -> Vec<Movie> {
    movie_list(payload)
        .or_else(|| payload.get("favorites").and_then(movie_list))
        .unwrap_or_default()
}

/// Favorite ids embedded in a user record, given either as ids or as movies
fn favorite_ids(raw: &Value) -> Vec<String> {
    raw.get("favorites")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(id) => Some(id.clone()),
                    Value::Object(_) => first_string(item, ID_KEYS),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Build a user from a login response body
///
/// # Errors
///
/// `ApiError::Rejected` unless the body reports success and carries a
/// non-empty token.
pub fn user_from_login(payload: &Value) -> Result<User, ApiError> {
    let success = payload.get("success").and_then(Value::as_bool).unwrap_or(false);
    let token = first_string(payload, &["token"]);

    let token = match token {
        Some(token) if success => token,
        _ => {
            let message = first_string(payload, &["message"])
                .unwrap_or_else(|| "Invalid credentials".to_string());
            return Err(ApiError::Rejected(message));
        }
    };

    let user = payload.get("user").cloned().unwrap_or(Value::Null);
    Ok(User {
        id: first_string(&user, ID_KEYS).unwrap_or_default(),
        full_name: first_string(&user, &["fullName", "name"]).unwrap_or_default(),
        email: first_string(&user, &["email"]).unwrap_or_default(),
        token,
        favorites: favorite_ids(&user),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_record() {
        let movie = normalize_movie(&json!({
            "_id": "m1",
            "movieName": "Dune",
            "releaseYear": 2021,
            "status": "Past",
            "category": "Sci-Fi",
            "Director": "Denis Villeneuve",
            "description": "Spice",
            "bannerImage": "https://img/dune.jpg",
            "rating": 4.5,
            "cast": ["Timothée Chalamet", "Zendaya"],
            "reviews": []
        }));

        assert_eq!(movie.id, "m1");
        assert_eq!(movie.name, "Dune");
        assert_eq!(movie.release_year, 2021);
        assert_eq!(movie.status, ReleaseStatus::Past);
        assert_eq!(movie.category, "Sci-Fi");
        assert_eq!(movie.director.as_deref(), Some("Denis Villeneuve"));
        assert_eq!(movie.banner_image.as_deref(), Some("https://img/dune.jpg"));
        assert_eq!(movie.rating, Some(4.5));
        assert_eq!(movie.cast.len(), 2);
    }

    #[test]
    fn test_alias_fields() {
        let movie = normalize_movie(&json!({
            "id": 42,
            "title": "Arrival",
            "releaseDate": "2016-11-11",
            "genre": "Drama",
            "director": "Villeneuve",
            "overview": "Heptapods",
            "posterUrl": "https://img/arrival.jpg",
            "voteAverage": 3.9
        }));

        assert_eq!(movie.id, "42");
        assert_eq!(movie.name, "Arrival");
        assert_eq!(movie.release_year, 2016);
        assert_eq!(movie.category, "Drama");
        assert_eq!(movie.director.as_deref(), Some("Villeneuve"));
        assert_eq!(movie.description.as_deref(), Some("Heptapods"));
        assert_eq!(movie.banner_image.as_deref(), Some("https://img/arrival.jpg"));
        assert_eq!(movie.rating, Some(3.9));
    }

    #[test]
    fn test_defaults_for_empty_record() {
        let movie = normalize_movie(&json!({}));

        assert_eq!(movie.name, UNTITLED);
        assert_eq!(movie.release_year, DEFAULT_RELEASE_YEAR);
        assert_eq!(movie.status, ReleaseStatus::NowShowing);
        assert_eq!(movie.category, DEFAULT_CATEGORY);
        assert_eq!(movie.rating, None);
        assert!(movie.cast.is_empty());
        assert!(movie.reviews.is_empty());
        assert!(movie.id.starts_with("local-"));
    }

    #[test]
    fn test_release_date_with_time() {
        let movie = normalize_movie(&json!({ "releaseDate": "1999-03-31T00:00:00Z" }));
        assert_eq!(movie.release_year, 1999);
    }

    #[test]
    fn test_placeholder_id_is_stable() {
        let raw = json!({ "title": "Heat", "releaseYear": 1995, "genre": "Crime" });
        let first = normalize_movie(&raw);
        let second = normalize_movie(&raw);
        assert_eq!(first.id, second.id);
        assert_eq!(first.id.len(), "local-".len() + 16);

        let other = normalize_movie(&json!({ "title": "Heat", "releaseYear": 1996, "genre": "Crime" }));
        assert_ne!(first.id, other.id);
    }

    #[test]
    fn test_embedded_reviews() {
        let movie = normalize_movie(&json!({
            "_id": "m1",
            "reviews": [
                { "_id": "r1", "fullName": "  Ada ", "rating": 5, "comment": "Loved it",
                  "_userId": "u1", "email": "ada@example.com", "createdAt": "2024-05-01T10:00:00Z" },
                { "rating": 9, "email": "grace@example.com" },
                { "comment": "??" },
                "not-a-review"
            ]
        }));

        assert_eq!(movie.reviews.len(), 3);
        assert_eq!(movie.reviews[0].author_name, "Ada");
        assert_eq!(movie.reviews[0].user_id.as_deref(), Some("u1"));
        assert!(movie.reviews[0].created_at.is_some());
        assert_eq!(movie.reviews[1].author_name, "grace");
        assert_eq!(movie.reviews[1].rating, 5.0);
        assert_eq!(movie.reviews[2].author_name, ANONYMOUS_AUTHOR);
        assert_eq!(movie.reviews[2].rating, 0.0);
    }

    #[test]
    fn test_movie_list_rejects_non_array() {
        assert!(movie_list(&json!({ "movies": [] })).is_none());
        assert!(movie_list(&json!("nope")).is_none());
        assert_eq!(movie_list(&json!([{ "_id": "a" }])).unwrap().len(), 1);
    }

    #[test]
    fn test_favorite_list_shapes() {
        assert_eq!(favorite_list(&json!([{ "_id": "a" }])).len(), 1);
        assert_eq!(favorite_list(&json!({ "favorites": [{ "_id": "a" }, { "_id": "b" }] })).len(), 2);
        assert!(favorite_list(&json!({ "success": true })).is_empty());
    }

    #[test]
    fn test_user_from_login() {
        let user = user_from_login(&json!({
            "success": true,
            "token": "jwt",
            "user": {
                "_id": "u1",
                "fullName": "Ada Lovelace",
                "email": "ada@example.com",
                "favorites": ["m1", { "_id": "m2" }]
            }
        }))
        .unwrap();

        assert_eq!(user.id, "u1");
        assert_eq!(user.token, "jwt");
        assert_eq!(user.favorites, vec!["m1", "m2"]);
    }

    #[test]
    fn test_login_rejections() {
        let err = user_from_login(&json!({ "success": false, "message": "Wrong password" })).unwrap_err();
        assert_eq!(err, ApiError::Rejected("Wrong password".to_string()));

        let err = user_from_login(&json!({ "success": true, "user": {} })).unwrap_err();
        assert_eq!(err, ApiError::Rejected("Invalid credentials".to_string()));

        let err = user_from_login(&json!({ "success": true, "token": "" })).unwrap_err();
        assert_eq!(err, ApiError::Rejected("Invalid credentials".to_string()));
    }
}
