//! Coordinator scenarios against the in-memory API

use std::sync::Arc;
use std::time::Duration;

use libfilmy::api::mock::{MockApi, MockOp};
use libfilmy::api::MovieApi;
use libfilmy::store::selectors::{is_favorite, reviews_for_movie};
use libfilmy::store::{AuthPhase, MoviePhase, ReviewSync};
use libfilmy::{
    Action, ApiError, Coordinator, Movie, ReleaseStatus, ReviewDraft, ReviewFailurePolicy, Store,
};

fn movie(id: &str, name: &str) -> Movie {
    Movie {
        id: id.to_string(),
        name: name.to_string(),
        release_year: 2024,
        status: ReleaseStatus::NowShowing,
        category: "General".to_string(),
        director: None,
        description: None,
        banner_image: None,
        rating: None,
        cast: vec![],
        reviews: vec![],
    }
}

fn catalog() -> Vec<Movie> {
    vec![movie("m1", "Dune"), movie("m2", "Arrival"), movie("m3", "Sicario")]
}

fn coordinator_with(api: &MockApi, policy: ReviewFailurePolicy) -> Coordinator {
    let store = Arc::new(Store::with_review_policy(policy));
    store.apply(Action::Rehydrate(None));
    Coordinator::new(store, Arc::new(api.clone()), None)
}

fn coordinator(api: &MockApi) -> Coordinator {
    coordinator_with(api, ReviewFailurePolicy::Keep)
}

fn login(email: &str, password: &str) -> Action {
    Action::LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    }
}

async fn signed_in(api: &MockApi, policy: ReviewFailurePolicy) -> Coordinator {
    let coordinator = coordinator_with(api, policy);
    coordinator.dispatch(login("ada@example.com", "secret1"));
    coordinator.settle().await;
    assert!(coordinator.store().select(|s| s.auth.is_authenticated()));
    coordinator
}

fn ada() -> MockApi {
    MockApi::new()
        .with_account("Ada Lovelace", "ada@example.com", "secret1")
        .with_movies(catalog())
}

#[tokio::test]
async fn later_login_wins_even_when_earlier_answers_last() {
    let api = MockApi::new()
        .with_account("Ada Lovelace", "ada@example.com", "secret1")
        .with_account("Grace Hopper", "grace@example.com", "secret2")
        .with_delay_for(MockOp::Login, "ada@example.com", Duration::from_millis(200));
    let coordinator = coordinator(&api);

    coordinator.dispatch(login("ada@example.com", "secret1"));
    coordinator.dispatch(login("grace@example.com", "secret2"));
    coordinator.settle().await;

    let state = coordinator.store().state();
    assert_eq!(state.auth.phase(), AuthPhase::Authenticated);
    assert_eq!(state.auth.user.unwrap().email, "grace@example.com");
}

#[tokio::test]
async fn superseded_login_failure_is_discarded() {
    let api = MockApi::new()
        .with_account("Grace Hopper", "grace@example.com", "secret2")
        .with_delay_for(MockOp::Login, "nobody@example.com", Duration::from_millis(100));
    let coordinator = coordinator(&api);

    coordinator.dispatch(login("nobody@example.com", "whatever"));
    coordinator.dispatch(login("grace@example.com", "secret2"));
    // Give the slow request time to finish if it was not aborted
    tokio::time::sleep(Duration::from_millis(150)).await;
    coordinator.settle().await;

    let state = coordinator.store().state();
    assert!(state.auth.error.is_none());
    assert!(state.auth.is_authenticated());
}

#[tokio::test]
async fn wrong_password_sets_auth_error() {
    let api = ada();
    let coordinator = coordinator(&api);

    coordinator.dispatch(login("ada@example.com", "nope"));
    coordinator.settle().await;

    let state = coordinator.store().state();
    assert_eq!(state.auth.phase(), AuthPhase::AuthError);
    assert_eq!(state.auth.error.as_deref(), Some("Invalid credentials"));
    assert_eq!(api.call_count(MockOp::ListFavorites), 0);
}

#[tokio::test]
async fn signup_chains_login_and_favorites() {
    let api = ada();
    let coordinator = coordinator(&api);

    coordinator.dispatch(Action::SignupRequest {
        full_name: "Grace Hopper".to_string(),
        email: "grace@example.com".to_string(),
        password: "secret2".to_string(),
    });
    coordinator.settle().await;

    let state = coordinator.store().state();
    assert!(state.auth.is_authenticated());
    assert_eq!(state.auth.user.unwrap().full_name, "Grace Hopper");
    assert_eq!(api.call_count(MockOp::Register), 1);
    assert_eq!(api.call_count(MockOp::Login), 1);
    assert_eq!(api.call_count(MockOp::ListFavorites), 1);
}

#[tokio::test]
async fn signup_with_taken_email_surfaces_server_message() {
    let api = ada();
    let coordinator = coordinator(&api);

    coordinator.dispatch(Action::SignupRequest {
        full_name: "Ada Again".to_string(),
        email: "ada@example.com".to_string(),
        password: "secret1".to_string(),
    });
    coordinator.settle().await;

    let state = coordinator.store().state();
    assert!(!state.auth.is_authenticated());
    assert_eq!(state.auth.error.as_deref(), Some("Email already registered"));
    assert_eq!(api.call_count(MockOp::Login), 0);
}

#[tokio::test]
async fn favorite_toggle_updates_both_slices() {
    let api = ada();
    let coordinator = signed_in(&api, ReviewFailurePolicy::Keep).await;
    assert!(coordinator.store().select(|s| s.favorite.favorites.is_empty()));

    coordinator.dispatch(Action::AddFavoriteRequest("m1".to_string()));
    coordinator.settle().await;

    let state = coordinator.store().state();
    assert_eq!(state.favorite.ids(), vec!["m1"]);
    assert_eq!(state.auth.user.as_ref().unwrap().favorites, vec!["m1"]);
    assert!(is_favorite(&state, "m1"));
    assert!(!state.favorite.is_loading());

    coordinator.dispatch(Action::RemoveFavoriteRequest("m1".to_string()));
    coordinator.settle().await;

    let state = coordinator.store().state();
    assert!(state.favorite.favorites.is_empty());
    assert!(state.auth.user.unwrap().favorites.is_empty());
}

#[tokio::test]
async fn concurrent_favorite_taps_are_all_sent() {
    let api = ada().with_delay(MockOp::AddFavorite, Duration::from_millis(20));
    let coordinator = signed_in(&api, ReviewFailurePolicy::Keep).await;

    for _ in 0..3 {
        coordinator.dispatch(Action::AddFavoriteRequest("m2".to_string()));
    }
    coordinator.dispatch(Action::AddFavoriteRequest("m3".to_string()));
    coordinator.settle().await;

    assert_eq!(api.call_count(MockOp::AddFavorite), 4);
    let mut ids = coordinator.store().select(|s| s.favorite.ids());
    ids.sort();
    assert_eq!(ids, vec!["m2", "m3"]);
}

#[tokio::test]
async fn favorite_failure_keeps_other_families_untouched() {
    let api = ada();
    let coordinator = signed_in(&api, ReviewFailurePolicy::Keep).await;
    api.set_failure(
        MockOp::RemoveFavorite,
        ApiError::Transport("connection reset".to_string()),
    );

    coordinator.dispatch(Action::AddFavoriteRequest("m1".to_string()));
    coordinator.dispatch(Action::RemoveFavoriteRequest("m2".to_string()));
    coordinator.settle().await;

    let state = coordinator.store().state();
    assert!(state.favorite.add.error.is_none());
    assert_eq!(
        state.favorite.remove.error.as_deref(),
        Some("Network error: connection reset")
    );
    assert_eq!(state.favorite.ids(), vec!["m1"]);
}

#[tokio::test]
async fn fetch_movies_round_trip() {
    let api = ada();
    let coordinator = coordinator(&api);

    coordinator.dispatch(Action::FetchMoviesRequest);
    assert_eq!(
        coordinator.store().select(|s| s.movie.phase()),
        MoviePhase::Loading
    );
    coordinator.settle().await;

    let state = coordinator.store().state();
    assert_eq!(state.movie.phase(), MoviePhase::Loaded);
    assert_eq!(state.movie.movies, catalog());
}

#[tokio::test]
async fn fetch_movies_failure_sets_error() {
    let api = ada().with_failure(
        MockOp::ListMovies,
        ApiError::Parse("unexpected end of input".to_string()),
    );
    let coordinator = coordinator(&api);

    coordinator.dispatch(Action::FetchMoviesRequest);
    coordinator.settle().await;

    assert_eq!(
        coordinator.store().select(|s| s.movie.phase()),
        MoviePhase::Error
    );
}

#[tokio::test]
async fn accepted_review_is_confirmed_and_catalog_refetched() {
    let api = ada();
    let coordinator = signed_in(&api, ReviewFailurePolicy::Keep).await;
    let user = coordinator.store().select(|s| s.auth.user.clone()).unwrap();

    coordinator.dispatch(Action::AddReviewRequest(ReviewDraft::for_user(
        &user, "m1", 4.0, "Spice must flow",
    )));
    coordinator.settle().await;

    let state = coordinator.store().state();
    assert_eq!(state.review.for_movie("m1")[0].sync, ReviewSync::Confirmed);
    assert_eq!(api.reviews_for("m1").len(), 1);
    assert_eq!(api.call_count(MockOp::ListMovies), 1);

    // The refetched movie embeds the same review: still one entry
    let dune = state.movie.movies.iter().find(|m| m.id == "m1").unwrap();
    assert_eq!(dune.reviews.len(), 1);
    let reviews = reviews_for_movie(&state, dune);
    assert_eq!(reviews.len(), 1);
    assert!(reviews[0].mine);
    assert_eq!(reviews[0].review.author_name, "Ada Lovelace (You)");
}

#[tokio::test]
async fn failed_review_is_kept_and_marked() {
    let api = ada();
    let coordinator = signed_in(&api, ReviewFailurePolicy::Keep).await;
    api.set_failure(
        MockOp::SubmitReview,
        ApiError::Request {
            status: 500,
            body: r#"{"message":"Review service down"}"#.to_string(),
        },
    );
    let user = coordinator.store().select(|s| s.auth.user.clone()).unwrap();

    coordinator.dispatch(Action::AddReviewRequest(ReviewDraft::for_user(
        &user, "m1", 2.0, "Meh",
    )));
    coordinator.settle().await;

    let state = coordinator.store().state();
    let local = state.review.for_movie("m1");
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].sync, ReviewSync::Failed);
    assert_eq!(state.review.error.as_deref(), Some("Review service down"));
    assert_eq!(api.call_count(MockOp::ListMovies), 0);
}

#[tokio::test]
async fn failed_review_is_rolled_back() {
    let api = ada();
    let coordinator = signed_in(&api, ReviewFailurePolicy::Rollback).await;
    api.set_failure(
        MockOp::SubmitReview,
        ApiError::Transport("timed out".to_string()),
    );
    let user = coordinator.store().select(|s| s.auth.user.clone()).unwrap();

    coordinator.dispatch(Action::AddReviewRequest(ReviewDraft::for_user(
        &user, "m1", 2.0, "Meh",
    )));
    coordinator.settle().await;

    let state = coordinator.store().state();
    assert!(state.review.for_movie("m1").is_empty());
    assert!(state.review.error.is_some());
}

#[tokio::test]
async fn logout_then_favorites_fail_locally() {
    let api = ada();
    let coordinator = signed_in(&api, ReviewFailurePolicy::Keep).await;

    coordinator.dispatch(Action::Logout);
    coordinator.dispatch(Action::FetchFavoritesRequest);
    coordinator.settle().await;

    let state = coordinator.store().state();
    assert_eq!(state.auth.phase(), AuthPhase::Anonymous);
    assert_eq!(state.favorite.fetch.error.as_deref(), Some("Not authenticated"));
    // Only the refresh triggered by the login reached the server
    assert_eq!(api.call_count(MockOp::ListFavorites), 1);
}

#[tokio::test]
async fn subscribers_observe_derived_actions() {
    let api = ada();
    let coordinator = coordinator(&api);
    let mut changes = coordinator.store().subscribe();

    coordinator.dispatch(login("ada@example.com", "secret1"));
    coordinator.settle().await;

    let mut names = Vec::new();
    while let Ok(event) = changes.try_recv() {
        names.push(event.action.name());
    }
    assert_eq!(
        names,
        vec![
            "login_request",
            "login_success",
            "fetch_favorites_request",
            "fetch_favorites_success",
        ]
    );
}

#[tokio::test]
async fn later_signup_wins_and_earlier_never_logs_in() {
    let api = ada().with_delay_for(MockOp::Register, "a@example.com", Duration::from_millis(200));
    let coordinator = coordinator(&api);

    coordinator.dispatch(Action::SignupRequest {
        full_name: "First Account".to_string(),
        email: "a@example.com".to_string(),
        password: "secret1".to_string(),
    });
    coordinator.dispatch(Action::SignupRequest {
        full_name: "Second Account".to_string(),
        email: "b@example.com".to_string(),
        password: "secret2".to_string(),
    });
    // Outlast the slow registration in case it was not aborted
    tokio::time::sleep(Duration::from_millis(250)).await;
    coordinator.settle().await;

    let state = coordinator.store().state();
    assert!(state.auth.error.is_none());
    assert_eq!(state.auth.user.unwrap().email, "b@example.com");
    assert_eq!(api.call_count(MockOp::Login), 1);
    assert!(api.login("a@example.com", "secret1").await.is_err());
}

#[tokio::test]
async fn review_loading_lasts_until_every_submission_answers() {
    let api = ada().with_delay_for(MockOp::SubmitReview, "m2", Duration::from_millis(300));
    let coordinator = signed_in(&api, ReviewFailurePolicy::Keep).await;
    let user = coordinator.store().select(|s| s.auth.user.clone()).unwrap();

    coordinator.dispatch(Action::AddReviewRequest(ReviewDraft::for_user(
        &user, "m1", 4.0, "Quick",
    )));
    coordinator.dispatch(Action::AddReviewRequest(ReviewDraft::for_user(
        &user, "m2", 3.0, "Slow",
    )));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let state = coordinator.store().state();
    assert_eq!(state.review.for_movie("m1")[0].sync, ReviewSync::Confirmed);
    assert_eq!(state.review.for_movie("m2")[0].sync, ReviewSync::Pending);
    assert!(state.review.is_loading());

    coordinator.settle().await;
    assert!(!coordinator.store().select(|s| s.review.is_loading()));
}
