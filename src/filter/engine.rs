//! Filter engine: owns the filter state and the memoized filtered list
//!
//! The filtered list is a pure function of three inputs: the resort collection,
//! the filter criteria and the favorites snapshot. Collections and snapshots are
//! compared by `Arc` identity, criteria by value, and the list is recomputed
//! only when that tuple changes.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::predicates::{self, DEFAULT_DIFFICULTY_THRESHOLD, FilterCriteria};
use super::state::{FilterDefaults, FilterState};
use crate::config::FilterConfig;
use crate::models::Resort;

struct MemoKey {
    resorts: Arc<[Resort]>,
    criteria: FilterCriteria,
    favorites: Arc<BTreeSet<String>>,
}

impl MemoKey {
    fn matches(
        &self,
        resorts: &Arc<[Resort]>,
        criteria: &FilterCriteria,
        favorites: &Arc<BTreeSet<String>>,
    ) -> bool {
        Arc::ptr_eq(&self.resorts, resorts)
            && Arc::ptr_eq(&self.favorites, favorites)
            && &self.criteria == criteria
    }
}

pub struct FilterEngine {
    state: FilterState,
    state_tx: watch::Sender<FilterState>,
    difficulty_threshold: f64,
    resorts: Arc<[Resort]>,
    favorites: Arc<BTreeSet<String>>,
    memo: Option<MemoKey>,
    filtered: Arc<[Resort]>,
    recomputations: u64,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new(FilterState::default(), DEFAULT_DIFFICULTY_THRESHOLD)
    }
}

impl FilterEngine {
    #[must_use]
    pub fn new(state: FilterState, difficulty_threshold: f64) -> Self {
        let (state_tx, _) = watch::channel(state.clone());
        let mut engine = Self {
            state,
            state_tx,
            difficulty_threshold,
            resorts: Arc::from(Vec::new()),
            favorites: Arc::new(BTreeSet::new()),
            memo: None,
            filtered: Arc::from(Vec::new()),
            recomputations: 0,
        };
        engine.refresh();
        engine
    }

    #[must_use]
    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(
            FilterState::with_defaults(FilterDefaults::from(config)),
            config.difficulty_threshold,
        )
    }

    #[must_use]
    pub fn state(&self) -> &FilterState {
        &self.state
    }

    /// Receives every published filter state
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FilterState> {
        self.state_tx.subscribe()
    }

    /// Applies `change` to the filter state, recomputing and publishing if it changed
    pub fn update<F>(&mut self, change: F)
    where
        F: FnOnce(&mut FilterState),
    {
        let mut next = self.state.clone();
        change(&mut next);
        if next == self.state {
            return;
        }
        self.state = next;
        self.refresh();
        self.state_tx.send_replace(self.state.clone());
    }

    /// Replaces the whole filter state
    pub fn set_state(&mut self, state: FilterState) {
        self.update(|current| *current = state);
    }

    /// Installs a new resort collection pushed by the store
    pub fn set_resorts(&mut self, resorts: Arc<[Resort]>) {
        self.resorts = resorts;
        self.refresh();
    }

    /// Installs a new favorites snapshot
    pub fn set_favorites(&mut self, favorites: Arc<BTreeSet<String>>) {
        self.favorites = favorites;
        self.refresh();
    }

    #[must_use]
    pub fn resorts(&self) -> &Arc<[Resort]> {
        &self.resorts
    }

    #[must_use]
    pub fn favorites(&self) -> &Arc<BTreeSet<String>> {
        &self.favorites
    }

    /// Current filtered list
    #[must_use]
    pub fn filtered(&self) -> Arc<[Resort]> {
        Arc::clone(&self.filtered)
    }

    /// Number of times the filtered list has been rebuilt
    #[must_use]
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    /// Favorites filter is on while the user has nothing favorited
    #[must_use]
    pub fn shows_no_favorites_notice(&self) -> bool {
        self.state.favorites_active
            && predicates::favorites_count(&self.resorts, &self.favorites) == 0
    }

    fn refresh(&mut self) {
        let criteria = FilterCriteria::from_state(&self.state, self.difficulty_threshold);
        if let Some(memo) = &self.memo {
            if memo.matches(&self.resorts, &criteria, &self.favorites) {
                return;
            }
        }

        let predicates = criteria.predicates();
        let filtered = predicates::apply(&self.resorts, &predicates, &self.favorites);
        debug!(
            total = self.resorts.len(),
            kept = filtered.len(),
            predicates = predicates.len(),
            "Recomputed filtered resorts"
        );

        self.filtered = Arc::from(filtered);
        self.recomputations += 1;
        self.memo = Some(MemoKey {
            resorts: Arc::clone(&self.resorts),
            criteria,
            favorites: Arc::clone(&self.favorites),
        });
    }
}
