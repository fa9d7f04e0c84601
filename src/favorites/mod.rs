//! Per-user favorites with optimistic updates
//!
//! Every toggle changes the local set immediately and is then persisted to a
//! [`FavoritesRemote`]. Writes for one resort are serialized through a fair
//! async lock. Once no write is pending for a resort, its local membership is
//! set to the last membership the remote confirmed, which rolls back failures
//! and keeps rapid double toggles from leaving the two sides diverged.

pub mod remote;

pub use remote::{FavoritesRemote, InMemoryFavoritesRemote, JsonFileFavoritesRemote};

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{Instrument, debug, info, instrument, warn};

use crate::SlopeFinderError;

pub const UPDATE_FAILED: &str = "Failed to update favorite";
pub const LOAD_FAILED: &str = "Failed to load favorites";
pub const NOT_AUTHENTICATED: &str = "User not authenticated";

/// Result of a persisted toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub resort_id: String,
    pub favorited: bool,
}

#[derive(Default)]
struct StoreState {
    user: Option<String>,
    /// Bumped on every sign-in and sign-out; late results of older sessions are dropped
    session: u64,
    local: BTreeSet<String>,
    confirmed: BTreeSet<String>,
    pending: HashMap<String, usize>,
    error: Option<String>,
    loading: bool,
}

struct Shared {
    remote: Arc<dyn FavoritesRemote>,
    state: Mutex<StoreState>,
    snapshot_tx: watch::Sender<Arc<BTreeSet<String>>>,
    write_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Cheaply cloneable handle to the favorites of the signed-in user
#[derive(Clone)]
pub struct FavoritesStore {
    inner: Arc<Shared>,
}

impl FavoritesStore {
    pub fn new(remote: Arc<dyn FavoritesRemote>) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(BTreeSet::new()));
        Self {
            inner: Arc::new(Shared {
                remote,
                state: Mutex::new(StoreState::default()),
                snapshot_tx,
                write_locks: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes a new snapshot when the local set differs from the last one
    fn publish(&self, local: &BTreeSet<String>) {
        self.inner.snapshot_tx.send_if_modified(|current| {
            if **current == *local {
                return false;
            }
            *current = Arc::new(local.clone());
            true
        });
    }

    fn write_lock(&self, resort_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .inner
            .write_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(resort_id.to_string()).or_default())
    }

    fn release_write_lock(&self, resort_id: &str) {
        let mut locks = self
            .inner
            .write_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(resort_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(resort_id);
        }
    }

    /// Signs `user_id` in and hydrates the set from the remote.
    ///
    /// A failed load leaves an empty set and the "Failed to load favorites" error.
    #[instrument(skip(self))]
    pub async fn sign_in(&self, user_id: &str) -> Result<(), SlopeFinderError> {
        let session = {
            let mut state = self.lock_state();
            state.session += 1;
            state.user = Some(user_id.to_string());
            state.local.clear();
            state.confirmed.clear();
            state.pending.clear();
            state.error = None;
            state.loading = true;
            self.publish(&state.local);
            state.session
        };

        let loaded = self.inner.remote.load(user_id).await;

        let mut state = self.lock_state();
        if state.session != session {
            debug!("Discarding favorites loaded for a finished session");
            return Ok(());
        }
        state.loading = false;
        match loaded {
            Ok(ids) => {
                info!("Loaded {} favorites", ids.len());
                state.confirmed = ids.into_iter().collect();
                state.local = state.confirmed.clone();
                self.publish(&state.local);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load favorites: {e:#}");
                state.error = Some(LOAD_FAILED.to_string());
                Err(SlopeFinderError::remote_read(format!("{e:#}")))
            }
        }
    }

    /// Clears the set and any error
    pub fn sign_out(&self) {
        let mut state = self.lock_state();
        let session = state.session + 1;
        *state = StoreState {
            session,
            ..StoreState::default()
        };
        self.publish(&state.local);
    }

    /// Flips membership of `resort_id` locally, then persists it.
    ///
    /// The local change is visible once the future is first polled. From then
    /// on the remote write runs on its own task, so dropping the future still
    /// settles the resort to whatever the remote confirmed.
    #[instrument(skip(self))]
    pub async fn toggle(&self, resort_id: &str) -> Result<ToggleOutcome, SlopeFinderError> {
        self.begin_toggle(resort_id)?.persist().await
    }

    /// Flips membership of `resort_id` locally without writing it yet.
    ///
    /// Dropping the returned write unpersisted settles the resort back to its
    /// confirmed membership.
    pub fn begin_toggle(&self, resort_id: &str) -> Result<PendingToggle, SlopeFinderError> {
        let mut state = self.lock_state();
        let Some(user_id) = state.user.clone() else {
            state.error = Some(NOT_AUTHENTICATED.to_string());
            return Err(SlopeFinderError::NotAuthenticated);
        };
        let favorited = !state.local.contains(resort_id);
        if favorited {
            state.local.insert(resort_id.to_string());
        } else {
            state.local.remove(resort_id);
        }
        *state.pending.entry(resort_id.to_string()).or_insert(0) += 1;
        self.publish(&state.local);

        Ok(PendingToggle {
            store: self.clone(),
            resort_id: resort_id.to_string(),
            user_id,
            session: state.session,
            favorited,
            settled: false,
        })
    }

    /// Current set; a new `Arc` is published on every change
    #[must_use]
    pub fn snapshot(&self) -> Arc<BTreeSet<String>> {
        Arc::clone(&self.inner.snapshot_tx.borrow())
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<BTreeSet<String>>> {
        self.inner.snapshot_tx.subscribe()
    }

    #[must_use]
    pub fn is_favorite(&self, resort_id: &str) -> bool {
        self.lock_state().local.contains(resort_id)
    }

    #[must_use]
    pub fn user(&self) -> Option<String> {
        self.lock_state().user.clone()
    }

    /// User-visible error of the last failed operation
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.lock_state().error.clone()
    }

    pub fn clear_error(&self) {
        self.lock_state().error = None;
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.lock_state().loading
    }

    /// Whether writes for `resort_id` are still in flight
    #[must_use]
    pub fn has_pending(&self, resort_id: &str) -> bool {
        self.lock_state().pending.contains_key(resort_id)
    }
}

/// Local flip that still has to reach the remote
#[must_use = "an unpersisted toggle is rolled back when dropped"]
pub struct PendingToggle {
    store: FavoritesStore,
    resort_id: String,
    user_id: String,
    session: u64,
    favorited: bool,
    settled: bool,
}

impl PendingToggle {
    #[must_use]
    pub fn resort_id(&self) -> &str {
        &self.resort_id
    }

    /// Membership the flip asks the remote for
    #[must_use]
    pub fn favorited(&self) -> bool {
        self.favorited
    }

    /// Writes the flip on a spawned task and waits for the outcome
    pub async fn persist(self) -> Result<ToggleOutcome, SlopeFinderError> {
        match tokio::spawn(self.write().in_current_span()).await {
            Ok(outcome) => outcome,
            Err(e) => Err(SlopeFinderError::remote_write(e.to_string())),
        }
    }

    async fn write(mut self) -> Result<ToggleOutcome, SlopeFinderError> {
        let store = self.store.clone();
        let lock = store.write_lock(&self.resort_id);
        let result = {
            let _guard = lock.lock().await;
            if self.favorited {
                store.inner.remote.add(&self.user_id, &self.resort_id).await
            } else {
                store.inner.remote.remove(&self.user_id, &self.resort_id).await
            }
        };
        drop(lock);
        store.release_write_lock(&self.resort_id);
        self.settle(Some(&result));

        result
            .map(|()| ToggleOutcome {
                resort_id: self.resort_id.clone(),
                favorited: self.favorited,
            })
            .map_err(|e| SlopeFinderError::remote_write(format!("{e:#}")))
    }

    /// Records the write result, `None` when the write never happened.
    ///
    /// When it was the last pending write for the resort, local membership is
    /// reset to the confirmed one.
    fn settle(&mut self, result: Option<&anyhow::Result<()>>) {
        if self.settled {
            return;
        }
        self.settled = true;

        let mut state = self.store.lock_state();
        if state.session != self.session {
            debug!("Discarding favorite write for a finished session");
            return;
        }

        match result {
            Some(Ok(())) => {
                if self.favorited {
                    state.confirmed.insert(self.resort_id.clone());
                } else {
                    state.confirmed.remove(&self.resort_id);
                }
                state.error = None;
            }
            Some(Err(e)) => {
                warn!("Failed to update favorite: {e:#}");
                state.error = Some(UPDATE_FAILED.to_string());
            }
            None => debug!(resort_id = %self.resort_id, "Favorite write abandoned"),
        }

        let remaining = match state.pending.get_mut(&self.resort_id) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => 0,
        };
        if remaining == 0 {
            state.pending.remove(&self.resort_id);
            if state.confirmed.contains(&self.resort_id) {
                state.local.insert(self.resort_id.clone());
            } else {
                state.local.remove(&self.resort_id);
            }
            self.store.publish(&state.local);
        }
    }
}

impl Drop for PendingToggle {
    fn drop(&mut self) {
        self.settle(None);
    }
}
