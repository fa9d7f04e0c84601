//! Resort Source Module
//!
//! The live resort collection is pushed through a [`ResortFeed`]; every
//! publish hands subscribers a new `Arc`, which is what the filter engine
//! keys its memoization on. Collections can be read from JSON exports either
//! as an array of records or as an object keyed by resort id.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::models::Resort;

/// Publish side of the live resort collection
#[derive(Clone)]
pub struct ResortFeed {
    tx: watch::Sender<Arc<[Resort]>>,
}

impl Default for ResortFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ResortFeed {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Arc::from(Vec::new()));
        Self { tx }
    }

    /// Replaces the collection and notifies every subscriber
    pub fn publish(&self, resorts: Vec<Resort>) -> Arc<[Resort]> {
        let collection: Arc<[Resort]> = Arc::from(resorts);
        debug!("Publishing {} resorts", collection.len());
        self.tx.send_replace(Arc::clone(&collection));
        collection
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<[Resort]>> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> Arc<[Resort]> {
        Arc::clone(&self.tx.borrow())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ResortDocument {
    List(Vec<Value>),
    Keyed(BTreeMap<String, Value>),
}

/// Parses a resort export; records that do not deserialize are skipped
pub fn parse_resorts(json: &str) -> Result<Vec<Resort>> {
    let document: ResortDocument =
        serde_json::from_str(json).with_context(|| "Resort data is neither a list nor an object")?;

    let records: Vec<(Option<String>, Value)> = match document {
        ResortDocument::List(values) => values.into_iter().map(|v| (None, v)).collect(),
        ResortDocument::Keyed(entries) => entries.into_iter().map(|(k, v)| (Some(k), v)).collect(),
    };

    let mut resorts = Vec::with_capacity(records.len());
    for (key, mut value) in records {
        if let (Some(key), Some(object)) = (key, value.as_object_mut()) {
            object
                .entry("id")
                .or_insert_with(|| Value::String(key.clone()));
        }
        match serde_json::from_value::<Resort>(value) {
            Ok(resort) => resorts.push(resort),
            Err(e) => warn!("Skipping malformed resort record: {}", e),
        }
    }
    Ok(resorts)
}

pub async fn load_resorts_from_json(path: impl AsRef<Path>) -> Result<Vec<Resort>> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read resort file: {}", path.display()))?;
    let resorts = parse_resorts(&json)?;
    info!("Loaded {} resorts from {}", resorts.len(), path.display());
    Ok(resorts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_list_and_keyed_documents() {
        let list = r#"[{"id":"vail","name":"Vail","region":"Rocky"},{"id":"stowe","name":"Stowe"}]"#;
        assert_eq!(parse_resorts(list).unwrap().len(), 2);

        let keyed = r#"{"alta":{"name":"Alta","fullDayTicket":"$149"}}"#;
        let resorts = parse_resorts(keyed).unwrap();
        assert_eq!(resorts[0].id, "alta");
        assert_eq!(resorts[0].full_day_price(), Some(149.0));
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let json = r#"[{"id":"ok","name":"Ok"}, 42, {"id":"also-ok","name":"Also"}]"#;
        assert_eq!(parse_resorts(json).unwrap().len(), 2);
        assert!(parse_resorts("\"nope\"").is_err());
    }

    #[test]
    fn test_mistyped_fields_keep_the_record() {
        let json = r#"[
            {"id":"loveland","name":"Loveland","fullDayTicket":89,"latitude":39.68,"longitude":-105.9},
            {"id":"monarch","name":"Monarch","fullDayTicket":"$99","latitude":true,"longitude":-106.3}
        ]"#;
        let resorts = parse_resorts(json).unwrap();
        assert_eq!(resorts.len(), 2);
        assert_eq!(resorts[0].full_day_price(), Some(89.0));
        assert_eq!(resorts[1].coordinate(), None);
        assert_eq!(resorts[1].full_day_price(), Some(99.0));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resorts.json");
        std::fs::write(&path, r#"[{"id":"taos","name":"Taos"}]"#).unwrap();
        let resorts = load_resorts_from_json(&path).await.unwrap();
        assert_eq!(resorts[0].name, "Taos");

        assert!(load_resorts_from_json(dir.path().join("missing.json")).await.is_err());
    }

    #[test]
    fn test_feed_publishes_new_collection() {
        let feed = ResortFeed::new();
        let mut rx = feed.subscribe();
        let published = feed.publish(vec![Resort::new("a", "A")]);
        assert!(rx.has_changed().unwrap());
        assert!(Arc::ptr_eq(&rx.borrow_and_update(), &published));
        assert!(Arc::ptr_eq(&feed.current(), &published));
    }
}
