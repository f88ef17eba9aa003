//! Bearer token resolution

use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::ApiResult;
use crate::error::ApiError;
use crate::storage::SnapshotStore;
use crate::store::Store;

/// Resolves the token for authenticated calls
///
/// Precedence: the in-memory auth slice, then the persisted snapshot while
/// the store has not been rehydrated yet. Once rehydrated, the store is
/// authoritative and an absent token means the user is signed out.
#[derive(Clone)]
pub struct TokenResolver {
    store: Arc<Store>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
}

impl TokenResolver {
    pub fn new(store: Arc<Store>, snapshots: Option<Arc<dyn SnapshotStore>>) -> Self {
        Self { store, snapshots }
    }

    pub async fn resolve(&self) -> ApiResult<String> {
        let (token, rehydrated) = self.store.select(|s| {
            (s.auth.token().map(str::to_string), s.rehydrated)
        });

        if let Some(token) = token {
            return Ok(token);
        }
        if rehydrated {
            return Err(ApiError::Unauthenticated);
        }

        let Some(snapshots) = &self.snapshots else {
            return Err(ApiError::Unauthenticated);
        };

        match snapshots.load_snapshot().await {
            Ok(Some(snapshot)) => match snapshot.token() {
                Some(token) => {
                    debug!("Using token from persisted snapshot");
                    Ok(token.to_string())
                }
                None => Err(ApiError::Unauthenticated),
            },
            Ok(None) => Err(ApiError::Unauthenticated),
            Err(e) => {
                warn!("Could not read persisted snapshot for token: {}", e);
                Err(ApiError::Unauthenticated)
            }
        }
    }
}
