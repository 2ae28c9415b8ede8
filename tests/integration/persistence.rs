//! Integration tests for write-through persistence and load-time migration.
//!
//! Uses a temporary directory with `FileStore` to check that a board
//! survives a restart, that older layouts are upgraded on load and
//! rewritten in the current shape, and that storage failures never block
//! a mutation.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::json;
use taskboard::board::{BoardEngine, ColumnPatch, EngineConfig, TaskDraft};
use taskboard::store::{FileStore, KeyValueStore, MemoryStore, StoreError};
use taskboard_proto::{BoardState, SortOption, codec};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

struct ReadOnlyStore(MemoryStore);

impl KeyValueStore for ReadOnlyStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.0.read(key)
    }

    fn write(&self, _key: &str, _bytes: &[u8]) -> Result<(), StoreError> {
        Err(StoreError::WriteFailed("read-only".to_string()))
    }
}

fn legacy_bytes() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "columns": [
            {"id": "todo", "name": "To Do", "order": 0},
            {"id": "done", "name": "Done", "order": 1}
        ],
        "tasks": [
            {"id": "1", "title": "Old task", "columnId": "todo", "favorite": true},
            {"id": "2", "title": "Finished", "columnId": "done"}
        ]
    }))
    .unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn board_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::default();

    let (column, task) = {
        let mut engine = BoardEngine::load(FileStore::new(dir.path()), config.clone());
        let column = engine.create_column("Review");
        engine.update_column(&column, ColumnPatch::sort(SortOption::Descending));
        let task = engine.create_task(TaskDraft::new("Persist me", column.clone()));
        (column, task)
    };

    let engine = BoardEngine::load(FileStore::new(dir.path()), config);
    assert_eq!(engine.column(&column).unwrap().sort_option, SortOption::Descending);
    assert_eq!(engine.find_task(&task).unwrap().name, "Persist me");
    assert_eq!(engine.sorted_columns().len(), 4);
}

#[test]
fn legacy_board_is_migrated_on_load() {
    let store = Arc::new(MemoryStore::with_entry("taskboard", legacy_bytes()));
    let engine = BoardEngine::load(Arc::clone(&store), EngineConfig::default());

    let old = engine.find_task(&"1".into()).unwrap();
    assert_eq!(old.name, "Old task");
    assert!(old.is_favorite);
    assert_eq!(engine.column_tasks(&"done".into())[0].name, "Finished");
    assert_eq!(engine.sorted_columns().len(), 2);
}

#[test]
fn first_write_after_migration_uses_current_shape() {
    let store = Arc::new(MemoryStore::with_entry("taskboard", legacy_bytes()));
    let mut engine = BoardEngine::load(Arc::clone(&store), EngineConfig::default());
    engine.create_task(TaskDraft::new("New", "todo".into()));

    let stored = codec::decode(&store.get("taskboard").unwrap()).unwrap();
    assert_eq!(&stored, engine.state());
    let raw: serde_json::Value = serde_json::from_slice(&store.get("taskboard").unwrap()).unwrap();
    assert!(raw["tasks"]["todo"][0]["isFavorite"].as_bool().unwrap());
    assert!(raw["tasks"]["todo"][0].get("title").is_none());
}

#[test]
fn reloading_current_board_changes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let mut engine = BoardEngine::load(Arc::clone(&store), EngineConfig::default());
    engine.create_task(TaskDraft::new("a", "todo".into()));
    engine.create_task(TaskDraft::new("b", "done".into()));
    let state = engine.state().clone();

    let reloaded = BoardEngine::load(Arc::clone(&store), EngineConfig::default());
    assert_eq!(reloaded.state(), &state);
}

#[test]
fn corrupt_file_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("taskboard.json"), b"{\"tasks\": oops").unwrap();
    let engine = BoardEngine::load(FileStore::new(dir.path()), EngineConfig::default());
    assert_eq!(engine.state(), &BoardState::default());
}

#[test]
fn failed_writes_are_counted_not_raised() {
    let store = ReadOnlyStore(MemoryStore::with_entry("taskboard", legacy_bytes()));
    let mut engine = BoardEngine::load(store, EngineConfig::default());

    let id = engine.create_task(TaskDraft::new("kept in memory", "todo".into()));
    engine.delete_column(&"done".into());

    assert!(engine.find_task(&id).is_some());
    assert!(engine.column(&"done".into()).is_none());
    assert_eq!(engine.persist_failures(), 2);
}

#[test]
fn separate_keys_hold_separate_boards() {
    let dir = tempfile::tempdir().unwrap();
    let work = EngineConfig {
        storage_key: "work".to_string(),
        ..EngineConfig::default()
    };
    let home = EngineConfig {
        storage_key: "home".to_string(),
        ..EngineConfig::default()
    };

    let mut engine = BoardEngine::load(FileStore::new(dir.path()), work.clone());
    engine.create_column("Only at work");

    assert_eq!(
        BoardEngine::load(FileStore::new(dir.path()), home).state(),
        &BoardState::default()
    );
    assert_eq!(BoardEngine::load(FileStore::new(dir.path()), work).sorted_columns().len(), 4);
}
