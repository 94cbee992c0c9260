//! Tests for projection testing utilities

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use composable_es_core::projection::{Projection, ProjectionError, ProjectionStore};
use composable_es_testing::{InMemoryProjectionStore, ProjectionTestHarness};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const PREFIX: &str = "notes:";

// Keeps one row per note; deleting a note that never existed is an error
#[derive(Clone, Debug)]
struct NoteProjection {
    store: Arc<InMemoryProjectionStore>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum NoteEvent {
    Written { id: String, text: String },
    Edited { id: String, text: String },
    Discarded { id: String },
}

impl Projection for NoteProjection {
    type Event = NoteEvent;

    fn name(&self) -> &'static str {
        "notes"
    }

    async fn apply_event(&self, event: &Self::Event) -> composable_es_core::projection::Result<()> {
        match event {
            NoteEvent::Written { id, text } => {
                self.store.save(&format!("{PREFIX}{id}"), text.as_bytes()).await?;
            }
            NoteEvent::Edited { id, text } => {
                let key = format!("{PREFIX}{id}");
                if !self.store.exists(&key).await? {
                    return Err(ProjectionError::MissingReadModel {
                        projection: self.name().to_string(),
                        key,
                    });
                }
                self.store.save(&key, text.as_bytes()).await?;
            }
            NoteEvent::Discarded { id } => {
                self.store.delete(&format!("{PREFIX}{id}")).await?;
            }
        }
        Ok(())
    }

    async fn rebuild(&self) -> composable_es_core::projection::Result<()> {
        self.store.clear_prefix(PREFIX).await?;
        Ok(())
    }
}

fn written(id: &str, text: &str) -> NoteEvent {
    NoteEvent::Written {
        id: id.to_string(),
        text: text.to_string(),
    }
}

#[tokio::test]
async fn test_inmemory_projection_store_save_get_delete() {
    let store = InMemoryProjectionStore::new();
    assert!(store.is_empty());

    store.save("key1", b"value1").await.unwrap();
    store.save("key1", b"value2").await.unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("key1").await.unwrap(), Some(b"value2".to_vec()));
    assert_eq!(store.get("missing").await.unwrap(), None);

    store.delete("key1").await.unwrap();
    assert!(!store.exists("key1").await.unwrap());

    // Deleting a missing key is fine
    store.delete("key1").await.unwrap();
}

#[tokio::test]
async fn test_clear_prefix_only_touches_matching_rows() {
    let store = InMemoryProjectionStore::new();
    store.save("a:1", b"x").await.unwrap();
    store.save("a:2", b"x").await.unwrap();
    store.save("b:1", b"x").await.unwrap();

    let removed = store.clear_prefix("a:").await.unwrap();

    assert_eq!(removed, 2);
    assert_eq!(store.keys(), vec!["b:1"]);
    assert_eq!(store.clear_prefix("a:").await.unwrap(), 0);
}

#[tokio::test]
async fn test_snapshots_compare_whole_stores() {
    let first = InMemoryProjectionStore::new();
    let second = InMemoryProjectionStore::new();

    first.save("k2", b"2").await.unwrap();
    first.save("k1", b"1").await.unwrap();
    second.save("k1", b"1").await.unwrap();
    second.save("k2", b"2").await.unwrap();

    assert_eq!(first.snapshot(), second.snapshot());

    second.save("k2", b"other").await.unwrap();
    assert_ne!(first.snapshot(), second.snapshot());
}

#[tokio::test]
async fn test_projection_harness_workflow() {
    let store = Arc::new(InMemoryProjectionStore::new());
    let projection = NoteProjection {
        store: store.clone(),
    };
    let mut harness = ProjectionTestHarness::new(projection, store);

    harness
        .given_events(vec![
            written("n1", "first"),
            written("n2", "second"),
            NoteEvent::Edited {
                id: "n1".to_string(),
                text: "edited".to_string(),
            },
            NoteEvent::Discarded {
                id: "n2".to_string(),
            },
        ])
        .await
        .unwrap();

    harness.then_contains("notes:n1").await.unwrap();
    harness.then_not_contains("notes:n2").await.unwrap();
    assert_eq!(harness.len(), 1);
    assert_eq!(
        harness.get_data("notes:n1").await.unwrap(),
        Some(b"edited".to_vec())
    );
}

#[tokio::test]
async fn test_projection_reports_missing_rows() {
    let store = Arc::new(InMemoryProjectionStore::new());
    let mut harness = ProjectionTestHarness::new(
        NoteProjection {
            store: store.clone(),
        },
        store,
    );

    let result = harness
        .given_event(NoteEvent::Edited {
            id: "ghost".to_string(),
            text: "boo".to_string(),
        })
        .await;

    let error = result.err().expect("editing a missing note must fail");
    assert!(error.is_inconsistency());
}

#[tokio::test]
async fn test_projection_rebuild_clears_only_its_rows() {
    let store = Arc::new(InMemoryProjectionStore::new());
    store.save("other:1", b"keep").await.unwrap();

    let mut harness = ProjectionTestHarness::new(
        NoteProjection {
            store: store.clone(),
        },
        store.clone(),
    );
    harness.given_event(written("n1", "x")).await.unwrap();

    harness.projection().rebuild().await.unwrap();

    harness.then_not_contains("notes:n1").await.unwrap();
    harness.then_contains("other:1").await.unwrap();
}
