//! Integration tests for attachment ingestion.
//!
//! Covers task creation with files, the hinted lookup in
//! `add_attachment`, batch atomicity when one file fails, size limits,
//! and attachment removal.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;

use taskboard::board::{BoardEngine, BoardError, EngineConfig, FilePayload, TaskDraft, TaskPatch};
use taskboard::store::MemoryStore;
use taskboard_proto::{AttachmentId, ColumnId};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn make_engine() -> BoardEngine<Arc<MemoryStore>> {
    BoardEngine::load(Arc::new(MemoryStore::new()), EngineConfig::default())
}

fn write_file(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn text(name: &str, body: &str) -> FilePayload {
    FilePayload::from_bytes(name, "text/plain", body.as_bytes().to_vec())
}

// ---------------------------------------------------------------------------
// Creation with attachments
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_task_with_files_lands_in_one_step() {
    let dir = tempfile::tempdir().unwrap();
    let png = write_file(&dir, "shot.png", &[0x89, b'P', b'N', b'G']);
    let notes = write_file(&dir, "notes.md", b"# hi");

    let mut engine = make_engine();
    let id = engine
        .create_task_with_attachments(
            TaskDraft::new("Design review", "todo".into()),
            vec![FilePayload::from_path(png), FilePayload::from_path(notes)],
        )
        .await
        .unwrap();

    let task = engine.find_task(&id).unwrap();
    assert_eq!(task.attachments.len(), 2);
    assert_eq!(task.attachments[0].name, "shot.png");
    assert_eq!(task.attachments[0].media_type, "image/png");
    assert_eq!(task.attachments[0].data, "data:image/png;base64,iVBORw==");
    assert_eq!(task.attachments[1].name, "notes.md");
    assert_eq!(task.attachments[1].data, "data:text/markdown;base64,IyBoaQ==");
    assert_ne!(task.attachments[0].id, task.attachments[1].id);
}

#[tokio::test]
async fn one_failed_read_rejects_whole_batch() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_file(&dir, "good.txt", b"ok");
    let missing = dir.path().join("missing.txt");

    let mut engine = make_engine();
    let before = engine.state().clone();
    let err = engine
        .create_task_with_attachments(
            TaskDraft::new("never", "todo".into()),
            vec![FilePayload::from_path(good), FilePayload::from_path(missing)],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BoardError::AttachmentRead { ref name, .. } if name == "missing.txt"));
    assert_eq!(engine.state(), &before);
}

#[tokio::test]
async fn oversized_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let big = write_file(&dir, "big.bin", &[0_u8; 64]);

    let config = EngineConfig {
        max_attachment_bytes: 16,
        ..EngineConfig::default()
    };
    let mut engine = BoardEngine::load(Arc::new(MemoryStore::new()), config);
    let task = engine.create_task(TaskDraft::new("t", "todo".into()));

    let err = engine
        .add_attachment(&task, FilePayload::from_path(big), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BoardError::AttachmentTooLarge {
            size: 64,
            limit: 16,
            ..
        }
    ));
    assert!(engine.find_task(&task).unwrap().attachments.is_empty());
}

// ---------------------------------------------------------------------------
// Adding and removing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_attachment_appends_in_order() {
    let mut engine = make_engine();
    let task = engine.create_task(TaskDraft::new("t", "todo".into()));

    let first = engine.add_attachment(&task, text("a.txt", "a"), None).await.unwrap();
    let second = engine
        .add_attachment(&task, text("b.txt", "b"), Some(&ColumnId::from("todo")))
        .await
        .unwrap();

    let stored = &engine.find_task(&task).unwrap().attachments;
    assert_eq!(stored, &vec![first, second]);
}

#[tokio::test]
async fn wrong_hint_falls_back_to_full_scan() {
    let mut engine = make_engine();
    let task = engine.create_task(TaskDraft::new("t", "done".into()));
    engine
        .add_attachment(&task, text("a.txt", "a"), Some(&ColumnId::from("todo")))
        .await
        .unwrap();
    assert_eq!(engine.find_task(&task).unwrap().attachments.len(), 1);
}

#[tokio::test]
async fn add_attachment_to_unknown_task_fails() {
    let mut engine = make_engine();
    engine.create_task(TaskDraft::new("t", "todo".into()));
    let before = engine.state().clone();
    let err = engine
        .add_attachment(&"ghost".into(), text("a.txt", "a"), Some(&"todo".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::TaskNotFound(ref id) if id.as_str() == "ghost"));
    assert_eq!(engine.state(), &before);
}

#[tokio::test]
async fn remove_attachment_by_id() {
    let mut engine = make_engine();
    let task = engine.create_task(TaskDraft::new("t", "todo".into()));
    let a = engine.add_attachment(&task, text("a.txt", "a"), None).await.unwrap();
    let b = engine.add_attachment(&task, text("b.txt", "b"), None).await.unwrap();

    engine.remove_attachment(&task, &a.id);
    assert_eq!(engine.find_task(&task).unwrap().attachments, vec![b]);

    let before = engine.state().clone();
    engine.remove_attachment(&task, &AttachmentId::from("ghost"));
    engine.remove_attachment(&"ghost".into(), &a.id);
    assert_eq!(engine.state(), &before);
}

#[tokio::test]
async fn deleting_task_discards_attachments() {
    let mut engine = make_engine();
    let task = engine.create_task(TaskDraft::new("t", "todo".into()));
    engine.add_attachment(&task, text("a.txt", "a"), None).await.unwrap();
    engine.delete_task(&task);
    assert!(engine.all_tasks().is_empty());
}

// ---------------------------------------------------------------------------
// Edit form
// ---------------------------------------------------------------------------

#[tokio::test]
async fn edit_applies_fields_removals_and_additions_together() {
    let mut engine = make_engine();
    let task = engine.create_task(TaskDraft::new("t", "todo".into()));
    let old = engine.add_attachment(&task, text("old.txt", "o"), None).await.unwrap();
    let kept = engine.add_attachment(&task, text("kept.txt", "k"), None).await.unwrap();

    engine
        .update_task_with_attachments(
            &task,
            TaskPatch {
                name: Some("edited".to_string()),
                column_id: Some("done".into()),
                ..TaskPatch::default()
            },
            vec![text("new.txt", "n")],
            &[old.id],
        )
        .await
        .unwrap();

    let stored = engine.find_task(&task).unwrap();
    assert_eq!(stored.name, "edited");
    assert_eq!(stored.column_id.as_str(), "done");
    let names: Vec<&str> = stored.attachments.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["kept.txt", "new.txt"]);
    assert_eq!(stored.attachments[0], kept);
}

#[tokio::test]
async fn failed_edit_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = make_engine();
    let task = engine.create_task(TaskDraft::new("t", "todo".into()));
    let before = engine.state().clone();

    let result = engine
        .update_task_with_attachments(
            &task,
            TaskPatch::favorite(true),
            vec![FilePayload::from_path(dir.path().join("absent.png"))],
            &[],
        )
        .await;

    assert!(result.is_err());
    assert_eq!(engine.state(), &before);
}

#[tokio::test]
async fn edit_into_unknown_column_changes_nothing() {
    let mut engine = make_engine();
    let task = engine.create_task(TaskDraft::new("a", "todo".into()));
    let old = engine.add_attachment(&task, text("old.txt", "o"), None).await.unwrap();
    let before = engine.state().clone();

    engine
        .update_task_with_attachments(
            &task,
            TaskPatch {
                name: Some("renamed".to_string()),
                column_id: Some("void".into()),
                ..TaskPatch::default()
            },
            vec![text("new.txt", "n")],
            &[old.id],
        )
        .await
        .unwrap();

    assert_eq!(engine.state(), &before);
    let stored = engine.find_task(&task).unwrap();
    assert_eq!(stored.name, "a");
    assert_eq!(stored.attachments.len(), 1);
}

#[tokio::test]
async fn create_with_files_in_unknown_column_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(&dir, "a.txt", b"a");
    let mut engine = make_engine();
    let before = engine.state().clone();

    let err = engine
        .create_task_with_attachments(
            TaskDraft::new("lost", "archived".into()),
            vec![FilePayload::from_path(file)],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BoardError::ColumnNotFound(ref id) if id.as_str() == "archived"));
    assert_eq!(engine.state(), &before);
}
