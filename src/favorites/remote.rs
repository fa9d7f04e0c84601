//! Remote favorites persistence
//!
//! The store keeps one array of resort identifiers per user and offers
//! idempotent add-element / remove-element updates.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, instrument};

#[async_trait]
pub trait FavoritesRemote: Send + Sync {
    /// Favorited resort identifiers of a user, empty when the user has none
    async fn load(&self, user_id: &str) -> Result<Vec<String>>;
    /// Adds `resort_id` if absent
    async fn add(&self, user_id: &str, resort_id: &str) -> Result<()>;
    /// Removes `resort_id` if present
    async fn remove(&self, user_id: &str, resort_id: &str) -> Result<()>;
}

/// Process-local store, mainly for tests and demos
#[derive(Debug, Default)]
pub struct InMemoryFavoritesRemote {
    users: Mutex<HashMap<String, BTreeSet<String>>>,
}

impl InMemoryFavoritesRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user's favorites
    #[must_use]
    pub fn with_user<I, S>(self, user_id: &str, resort_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                user_id.to_string(),
                resort_ids.into_iter().map(Into::into).collect(),
            );
        self
    }

    /// Current remote view of a user's favorites
    #[must_use]
    pub fn favorites_of(&self, user_id: &str) -> BTreeSet<String> {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl FavoritesRemote for InMemoryFavoritesRemote {
    async fn load(&self, user_id: &str) -> Result<Vec<String>> {
        Ok(self.favorites_of(user_id).into_iter().collect())
    }

    async fn add(&self, user_id: &str, resort_id: &str) -> Result<()> {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user_id.to_string())
            .or_default()
            .insert(resort_id.to_string());
        Ok(())
    }

    async fn remove(&self, user_id: &str, resort_id: &str) -> Result<()> {
        if let Some(ids) = self
            .users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(user_id)
        {
            ids.remove(resort_id);
        }
        Ok(())
    }
}

/// Favorites kept in a JSON document of the form `{"user": ["resort", ...]}`
pub struct JsonFileFavoritesRemote {
    path: PathBuf,
    write_lock: AsyncMutex<()>,
}

type FavoritesDocument = BTreeMap<String, BTreeSet<String>>;

impl JsonFileFavoritesRemote {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: AsyncMutex::new(()),
        }
    }

    async fn read_document(&self) -> Result<FavoritesDocument> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(FavoritesDocument::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).with_context(|| {
                format!("Malformed favorites file: {}", self.path.display())
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FavoritesDocument::new()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read favorites file: {}", self.path.display())),
        }
    }

    async fn write_document(&self, document: &FavoritesDocument) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(document)?;
        tokio::fs::write(&self.path, bytes)
            .await
            .with_context(|| format!("Failed to write favorites file: {}", self.path.display()))
    }

    async fn modify<F>(&self, user_id: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeSet<String>) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        change(document.entry(user_id.to_string()).or_default());
        self.write_document(&document).await
    }
}

#[async_trait]
impl FavoritesRemote for JsonFileFavoritesRemote {
    #[instrument(name = "load_favorites", level = "debug", skip(self))]
    async fn load(&self, user_id: &str) -> Result<Vec<String>> {
        let document = self.read_document().await?;
        let ids: Vec<String> = document
            .get(user_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();
        debug!("Loaded {} favorites", ids.len());
        Ok(ids)
    }

    #[instrument(name = "add_favorite", level = "debug", skip(self))]
    async fn add(&self, user_id: &str, resort_id: &str) -> Result<()> {
        let resort_id = resort_id.to_string();
        self.modify(user_id, move |ids| {
            ids.insert(resort_id);
        })
        .await
    }

    #[instrument(name = "remove_favorite", level = "debug", skip(self))]
    async fn remove(&self, user_id: &str, resort_id: &str) -> Result<()> {
        let resort_id = resort_id.to_string();
        self.modify(user_id, move |ids| {
            ids.remove(&resort_id);
        })
        .await
    }
}
