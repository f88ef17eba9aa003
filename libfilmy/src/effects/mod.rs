//! Effect coordinator
//!
//! Bridges request actions to the [`MovieApi`] and feeds the outcome back
//! into the [`Store`] as success or failure actions. Every effect runs on
//! its own tokio task.
//!
//! # Concurrency
//!
//! Login and signup are take-latest: a new request aborts the pending
//! handler of the same kind, and a handler whose generation is no longer
//! current never applies its outcome. Everything else runs concurrently
//! without de-duplication; the last response to arrive wins.
//!
//! # Derived effects
//!
//! - signup success chains a login with the same credentials
//! - login success refreshes favorites
//! - favorite add/remove success also updates the user's favorite ids
//! - review success refetches the movie catalog

pub mod token;

pub use token::TokenResolver;

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::api::MovieApi;
use crate::error::ApiError;
use crate::storage::SnapshotStore;
use crate::store::{Action, Store};
use crate::types::{Movie, ReviewDraft};

const LOGIN_FALLBACK: &str = "Invalid credentials";
const SIGNUP_FALLBACK: &str = "Signup failed";

/// Request kinds handled with take-latest semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LatestKind {
    Login,
    Signup,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    handle: Option<AbortHandle>,
}

struct Inner {
    store: Arc<Store>,
    api: Arc<dyn MovieApi>,
    tokens: TokenResolver,
    latest: Mutex<HashMap<LatestKind, Slot>>,
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Decrements the in-flight count when a task finishes or is aborted
struct InFlight(Arc<Inner>);

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    pub fn new(
        store: Arc<Store>,
        api: Arc<dyn MovieApi>,
        snapshots: Option<Arc<dyn SnapshotStore>>,
    ) -> Self {
        let tokens = TokenResolver::new(Arc::clone(&store), snapshots);
        Self {
            inner: Arc::new(Inner {
                store,
                api,
                tokens,
                latest: Mutex::new(HashMap::new()),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.inner.store
    }

    pub fn tokens(&self) -> &TokenResolver {
        &self.inner.tokens
    }

    /// Apply `action` to the store and start any effect it triggers
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, action: Action) {
        self.inner.store.apply(action.clone());
        self.run_effects(action);
    }

    /// Wait until no effect task is running
    ///
    /// Chained effects count as running, so after `settle` returns every
    /// derived action of earlier dispatches has been applied.
    pub async fn settle(&self) {
        loop {
            // Registered before the check so a wakeup in between is not lost
            let idle = self.inner.idle.notified();
            if self.inner.in_flight.load(Ordering::Acquire) == 0 {
                return;
            }
            idle.await;
        }
    }

    /// Number of effect tasks currently running
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    fn run_effects(&self, action: Action) {
        match action {
            Action::LoginRequest { email, password } => self.login(email, password),
            Action::SignupRequest {
                full_name,
                email,
                password,
            } => self.signup(full_name, email, password),
            Action::LoginSuccess { .. } => self.dispatch(Action::FetchFavoritesRequest),
            Action::FetchMoviesRequest => self.fetch_movies(),
            Action::FetchFavoritesRequest => self.fetch_favorites(),
            Action::AddFavoriteRequest(movie_id) => self.add_favorite(movie_id),
            Action::RemoveFavoriteRequest(movie_id) => self.remove_favorite(movie_id),
            Action::AddReviewRequest(draft) => self.submit_review(draft),
            _ => {}
        }
    }

    fn spawn<F>(&self, task: F) -> AbortHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.in_flight.fetch_add(1, Ordering::AcqRel);
        let guard = InFlight(Arc::clone(&self.inner));
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        })
        .abort_handle()
    }

    fn latest(&self) -> MutexGuard<'_, HashMap<LatestKind, Slot>> {
        self.inner
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `task` as the only live handler of `kind`
    fn spawn_latest<F, Fut>(&self, kind: LatestKind, task: F)
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = {
            let mut latest = self.latest();
            let slot = latest.entry(kind).or_default();
            slot.generation += 1;
            if let Some(previous) = slot.handle.take() {
                debug!("Superseding pending {:?} request", kind);
                previous.abort();
            }
            slot.generation
        };

        let handle = self.spawn(task(generation));

        let mut latest = self.latest();
        if let Some(slot) = latest.get_mut(&kind) {
            if slot.generation == generation {
                slot.handle = Some(handle);
            }
        }
    }

    /// Apply `action` only if `generation` is still the latest for `kind`
    fn dispatch_if_current(&self, kind: LatestKind, generation: u64, action: Action) -> bool {
        {
            let latest = self.latest();
            let current = latest.get(&kind).map(|s| s.generation);
            if current != Some(generation) {
                debug!("Discarding stale {:?} outcome: {}", kind, action.name());
                return false;
            }
            self.inner.store.apply(action.clone());
        }
        self.run_effects(action);
        true
    }

    fn login(&self, email: String, password: String) {
        let this = self.clone();
        self.spawn_latest(LatestKind::Login, move |generation| async move {
            let action = match this.inner.api.login(&email, &password).await {
                Ok(user) => {
                    info!("Signed in as {}", user.email);
                    Action::LoginSuccess { user }
                }
                Err(e) => {
                    warn!("Login failed for {}: {}", email, e);
                    Action::LoginFailure {
                        error: failure_message(&e, LOGIN_FALLBACK),
                    }
                }
            };
            this.dispatch_if_current(LatestKind::Login, generation, action);
        });
    }

    fn signup(&self, full_name: String, email: String, password: String) {
        let this = self.clone();
        self.spawn_latest(LatestKind::Signup, move |generation| async move {
            let result = this.inner.api.register(&full_name, &email, &password).await;
            match result {
                Ok(()) => {
                    info!("Registered {}", email);
                    if this.dispatch_if_current(LatestKind::Signup, generation, Action::SignupSuccess)
                    {
                        this.dispatch(Action::LoginRequest { email, password });
                    }
                }
                Err(e) => {
                    warn!("Signup failed for {}: {}", email, e);
                    this.dispatch_if_current(
                        LatestKind::Signup,
                        generation,
                        Action::SignupFailure {
                            error: failure_message(&e, SIGNUP_FALLBACK),
                        },
                    );
                }
            }
        });
    }

    fn fetch_movies(&self) {
        let this = self.clone();
        self.spawn(async move {
            match this.inner.api.list_movies().await {
                Ok(movies) => this.dispatch(Action::FetchMoviesSuccess(movies)),
                Err(e) => {
                    warn!("Fetching movies failed: {}", e);
                    this.dispatch(Action::FetchMoviesFailure(e.user_message()));
                }
            }
        });
    }

    fn fetch_favorites(&self) {
        let this = self.clone();
        self.spawn(async move {
            let result = match this.inner.tokens.resolve().await {
                Ok(token) => this.inner.api.list_favorites(&token).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(favorites) => this.dispatch(Action::FetchFavoritesSuccess(favorites)),
                Err(e) => {
                    warn!("Fetching favorites failed: {}", e);
                    this.dispatch(Action::FetchFavoritesFailure(e.user_message()));
                }
            }
        });
    }

    fn add_favorite(&self, movie_id: String) {
        let this = self.clone();
        self.spawn(async move {
            let result = match this.inner.tokens.resolve().await {
                Ok(token) => this.inner.api.add_favorite(&token, &movie_id).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(favorites) => {
                    let ids = favorite_ids(&favorites);
                    this.dispatch(Action::AddFavoriteSuccess(favorites));
                    this.dispatch(Action::UpdateFavoriteIds(ids));
                }
                Err(e) => {
                    warn!("Adding favorite {} failed: {}", movie_id, e);
                    this.dispatch(Action::AddFavoriteFailure(e.user_message()));
                }
            }
        });
    }

    fn remove_favorite(&self, movie_id: String) {
        let this = self.clone();
        self.spawn(async move {
            let result = match this.inner.tokens.resolve().await {
                Ok(token) => this.inner.api.remove_favorite(&token, &movie_id).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(favorites) => {
                    let ids = favorite_ids(&favorites);
                    this.dispatch(Action::RemoveFavoriteSuccess(favorites));
                    this.dispatch(Action::UpdateFavoriteIds(ids));
                }
                Err(e) => {
                    warn!("Removing favorite {} failed: {}", movie_id, e);
                    this.dispatch(Action::RemoveFavoriteFailure(e.user_message()));
                }
            }
        });
    }

    fn submit_review(&self, draft: ReviewDraft) {
        let this = self.clone();
        self.spawn(async move {
            let result = match this.inner.tokens.resolve().await {
                Ok(token) => {
                    this.inner
                        .api
                        .submit_review(&token, &draft.movie_id, &draft.comment, draft.rating)
                        .await
                }
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => {
                    info!("Review for {} accepted", draft.movie_id);
                    this.dispatch(Action::AddReviewSuccess(draft));
                    this.dispatch(Action::FetchMoviesRequest);
                }
                Err(e) => {
                    warn!("Review for {} failed: {}", draft.movie_id, e);
                    this.dispatch(Action::AddReviewFailure {
                        movie_id: draft.movie_id,
                        local_id: draft.local_id,
                        error: e.user_message(),
                    });
                }
            }
        });
    }
}

fn favorite_ids(favorites: &[Movie]) -> Vec<String> {
    favorites.iter().map(|m| m.id.clone()).collect()
}

/// Server message if there is one, else `fallback` for HTTP rejections
fn failure_message(error: &ApiError, fallback: &str) -> String {
    match error {
        ApiError::Request { .. } => error
            .server_message()
            .unwrap_or_else(|| fallback.to_string()),
        ApiError::Rejected(message) if message.trim().is_empty() => fallback.to_string(),
        _ => error.user_message(),
    }
}
