//! Application context
//!
//! `FilmyApp` wires the store, the effect coordinator, the API client and
//! snapshot persistence together. It is built once at start and handed to
//! whatever drives it (the CLI, a view layer, tests).
//!
//! # Example
//!
//! ```no_run
//! use libfilmy::{Action, FilmyApp};
//!
//! # async fn example() -> libfilmy::Result<()> {
//! let app = FilmyApp::new().await?;
//!
//! app.dispatch(Action::FetchMoviesRequest);
//! app.settle().await;
//!
//! println!("{} movies", app.state().movie.movies.len());
//! app.persist().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::http::HttpApi;
use crate::api::MovieApi;
use crate::config::{Config, ReviewFailurePolicy};
use crate::effects::Coordinator;
use crate::error::Result;
use crate::storage::{SnapshotStore, SqliteSnapshotStore};
use crate::store::state::SNAPSHOT_VERSION;
use crate::store::{Action, RootState, Snapshot, Store, StoreReceiver};
use crate::types::Movie;

pub struct FilmyApp {
    store: Arc<Store>,
    api: Arc<dyn MovieApi>,
    snapshots: Arc<dyn SnapshotStore>,
    coordinator: Coordinator,
}

impl FilmyApp {
    /// Build from the configuration at the default location
    pub async fn new() -> Result<Self> {
        let config = Config::load_or_default()?;
        Self::from_config(config).await
    }

    /// Build the HTTP client and open the snapshot database from `config`
    pub async fn from_config(config: Config) -> Result<Self> {
        let api = HttpApi::from_config(&config.api)?;
        let snapshots = SqliteSnapshotStore::open(&config.storage.path).await?;
        debug!(
            "Using API at {} with state in {}",
            api.base_url(),
            config.storage.path
        );

        Ok(Self::with_parts(
            Arc::new(api),
            Arc::new(snapshots),
            config.reviews.failure_policy,
        )
        .await)
    }

    /// Assemble from explicit collaborators and rehydrate
    ///
    /// A snapshot that cannot be read is logged and treated as absent.
    pub async fn with_parts(
        api: Arc<dyn MovieApi>,
        snapshots: Arc<dyn SnapshotStore>,
        policy: ReviewFailurePolicy,
    ) -> Self {
        let store = Arc::new(Store::with_review_policy(policy));
        let coordinator = Coordinator::new(
            Arc::clone(&store),
            Arc::clone(&api),
            Some(Arc::clone(&snapshots)),
        );

        let app = Self {
            store,
            api,
            snapshots,
            coordinator,
        };
        app.rehydrate().await;
        app
    }

    async fn rehydrate(&self) {
        let snapshot = match self.snapshots.load_snapshot().await {
            Ok(Some(snapshot)) if snapshot.version != SNAPSHOT_VERSION => {
                warn!(
                    "Ignoring persisted state with version {} (expected {})",
                    snapshot.version, SNAPSHOT_VERSION
                );
                None
            }
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Ignoring unreadable persisted state: {}", e);
                None
            }
        };
        debug!("Rehydrating (snapshot present: {})", snapshot.is_some());
        self.store.apply(Action::Rehydrate(snapshot));
    }

    pub fn dispatch(&self, action: Action) {
        self.coordinator.dispatch(action);
    }

    /// Wait for every running effect, including chained ones
    pub async fn settle(&self) {
        self.coordinator.settle().await;
    }

    pub fn state(&self) -> RootState {
        self.store.state()
    }

    pub fn subscribe(&self) -> StoreReceiver {
        self.store.subscribe()
    }

    /// Write the current state to the snapshot store
    pub async fn persist(&self) -> Result<()> {
        let snapshot = self.store.select(Snapshot::from_state);
        self.snapshots.save_snapshot(&snapshot).await?;
        Ok(())
    }

    /// Fetch one movie directly; the store is not touched
    pub async fn get_movie(&self, id: &str) -> Result<Movie> {
        Ok(self.api.get_movie(id).await?)
    }

    /// Ask the server whether the current token is still accepted
    ///
    /// `Ok(false)` when there is no token at all.
    pub async fn validate_token(&self) -> Result<bool> {
        let token = match self.coordinator.tokens().resolve().await {
            Ok(token) => token,
            Err(_) => return Ok(false),
        };
        Ok(self.api.validate_token(&token).await?)
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }
}
