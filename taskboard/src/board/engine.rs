//! The board engine: canonical state plus write-through persistence.
//!
//! `BoardEngine` is the single writer of the board. Each operation builds
//! the next state with a pure transition, swaps it in, then hands the
//! encoded state to the store. A failed write is logged and counted but
//! never reported to the caller of the mutation.

use chrono::Utc;
use taskboard_proto::codec;
use taskboard_proto::migrate;
use taskboard_proto::{Attachment, AttachmentId, BoardState, Column, ColumnId, Task, TaskId};

use super::attachment::{self, FilePayload};
use super::sort::sorted_tasks;
use super::transitions::{self, ColumnPatch, TaskDraft, TaskPatch};
use super::BoardError;
use crate::drag::DragCommand;
use crate::store::{DEFAULT_STORAGE_KEY, KeyValueStore};

/// Default per-attachment size limit (5 MiB).
pub const DEFAULT_MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Store key the whole board lives under.
    pub storage_key: String,
    /// Largest accepted attachment payload, in bytes.
    pub max_attachment_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        }
    }
}

/// Owns the canonical [`BoardState`] and writes it through to `S`.
pub struct BoardEngine<S: KeyValueStore> {
    state: BoardState,
    store: S,
    config: EngineConfig,
    persist_failures: usize,
}

impl<S: KeyValueStore> BoardEngine<S> {
    /// Loads the board from `store`, migrating whatever was stored.
    ///
    /// A failed read is logged and treated as an empty store.
    pub fn load(store: S, config: EngineConfig) -> Self {
        let raw = match store.read(&config.storage_key) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, key = %config.storage_key, "could not read stored board");
                None
            }
        };
        let state = migrate::migrate(raw.as_deref());
        tracing::info!(
            columns = state.columns.len(),
            tasks = state.task_count(),
            "board loaded"
        );
        Self {
            state,
            store,
            config,
            persist_failures: 0,
        }
    }

    /// Wraps an existing state without reading or writing the store.
    pub fn with_state(store: S, config: EngineConfig, state: BoardState) -> Self {
        Self {
            state,
            store,
            config,
            persist_failures: 0,
        }
    }

    /// The current board.
    #[must_use]
    pub const fn state(&self) -> &BoardState {
        &self.state
    }

    /// The engine's settings.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Number of write-throughs that failed since the engine was created.
    #[must_use]
    pub const fn persist_failures(&self) -> usize {
        self.persist_failures
    }

    fn commit(&mut self, next: BoardState) {
        self.state = next;
        let result = codec::encode(&self.state)
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                self.store
                    .write(&self.config.storage_key, &bytes)
                    .map_err(|e| e.to_string())
            });
        if let Err(error) = result {
            self.persist_failures += 1;
            tracing::warn!(%error, key = %self.config.storage_key, "board changed but could not be persisted");
        }
    }

    // --- reads ---

    /// Columns in display order.
    #[must_use]
    pub fn sorted_columns(&self) -> Vec<&Column> {
        self.state.sorted_columns()
    }

    #[must_use]
    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.state.column(id)
    }

    /// A column's tasks in stored (manual) order.
    #[must_use]
    pub fn column_tasks(&self, id: &ColumnId) -> &[Task] {
        self.state.tasks_in(id)
    }

    /// Every task, column by column in display order.
    #[must_use]
    pub fn all_tasks(&self) -> Vec<&Task> {
        self.state.all_tasks()
    }

    #[must_use]
    pub fn find_task(&self, id: &TaskId) -> Option<&Task> {
        self.state.task(id)
    }

    /// A column's tasks in display order. Empty for an unknown column.
    #[must_use]
    pub fn sorted_tasks(&self, column_id: &ColumnId) -> Vec<&Task> {
        let Some(column) = self.state.column(column_id) else {
            return Vec::new();
        };
        sorted_tasks(self.state.tasks_in(column_id), column.sort_option)
    }

    // --- columns ---

    /// Appends a new column and returns its id.
    pub fn create_column(&mut self, name: &str) -> ColumnId {
        let id = ColumnId::generate();
        tracing::debug!(column_id = %id, name, "create column");
        let next = transitions::create_column(self.state.clone(), id.clone(), name);
        self.commit(next);
        id
    }

    /// Updates a column, merging it into a same-named column on rename.
    pub fn update_column(&mut self, id: &ColumnId, patch: ColumnPatch) {
        tracing::debug!(column_id = %id, ?patch, "update column");
        let next = transitions::update_column(self.state.clone(), id, patch, Utc::now());
        self.commit(next);
    }

    /// Deletes a column and all of its tasks.
    pub fn delete_column(&mut self, id: &ColumnId) {
        tracing::debug!(column_id = %id, "delete column");
        let next = transitions::delete_column(self.state.clone(), id);
        self.commit(next);
    }

    /// Reassigns column order from a full permutation of column ids.
    pub fn reorder_columns(&mut self, ordered: &[ColumnId]) {
        tracing::debug!(count = ordered.len(), "reorder columns");
        let next = transitions::reorder_columns(self.state.clone(), ordered);
        self.commit(next);
    }

    // --- tasks ---

    /// Creates a task at the end of its column and returns its id.
    ///
    /// If the draft names a column that does not exist, nothing is added.
    pub fn create_task(&mut self, draft: TaskDraft) -> TaskId {
        let id = TaskId::generate();
        tracing::debug!(task_id = %id, column_id = %draft.column_id, "create task");
        let task = draft.into_task(id.clone(), Utc::now());
        let next = transitions::create_task(self.state.clone(), task);
        self.commit(next);
        id
    }

    /// Creates a task together with its attachments in one transition.
    ///
    /// All files are read first; if any read fails the board is left as it
    /// was. Nothing is read when the draft's column does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::ColumnNotFound`] for an unknown column, or
    /// [`BoardError::AttachmentRead`] / [`BoardError::AttachmentTooLarge`]
    /// for the first failing file.
    pub async fn create_task_with_attachments(
        &mut self,
        draft: TaskDraft,
        files: Vec<FilePayload>,
    ) -> Result<TaskId, BoardError> {
        if self.state.column(&draft.column_id).is_none() {
            return Err(BoardError::ColumnNotFound(draft.column_id));
        }
        let attachments = attachment::encode_all(files, self.config.max_attachment_bytes).await?;
        let id = TaskId::generate();
        tracing::debug!(task_id = %id, attachments = attachments.len(), "create task with attachments");
        let mut task = draft.into_task(id.clone(), Utc::now());
        task.attachments = attachments;
        let next = transitions::create_task(self.state.clone(), task);
        self.commit(next);
        Ok(id)
    }

    /// Applies a partial update to a task.
    pub fn update_task(&mut self, id: &TaskId, patch: TaskPatch) {
        tracing::debug!(task_id = %id, ?patch, "update task");
        let next = transitions::update_task(self.state.clone(), id, patch, Utc::now());
        self.commit(next);
    }

    /// Applies an edit form: field patch, attachment removals, and new
    /// files, landing as one transition once every file has been read.
    ///
    /// # Errors
    ///
    /// Returns an attachment error if any new file cannot be ingested; the
    /// board is then unchanged.
    pub async fn update_task_with_attachments(
        &mut self,
        id: &TaskId,
        patch: TaskPatch,
        files: Vec<FilePayload>,
        remove: &[AttachmentId],
    ) -> Result<(), BoardError> {
        let added = attachment::encode_all(files, self.config.max_attachment_bytes).await?;
        tracing::debug!(task_id = %id, added = added.len(), removed = remove.len(), "edit task");
        let next = transitions::edit_task(self.state.clone(), id, patch, remove, added, Utc::now());
        self.commit(next);
        Ok(())
    }

    /// Deletes a task and its attachments.
    pub fn delete_task(&mut self, id: &TaskId) {
        tracing::debug!(task_id = %id, "delete task");
        let next = transitions::delete_task(self.state.clone(), id);
        self.commit(next);
    }

    /// Moves a task to `index` within `column_id` (clamped).
    ///
    /// Always permissive: whether a drop is allowed under the target
    /// column's sort mode is decided by [`crate::drag`], not here.
    pub fn move_task(&mut self, id: &TaskId, column_id: &ColumnId, index: usize) {
        tracing::debug!(task_id = %id, column_id = %column_id, index, "move task");
        let next = transitions::move_task(self.state.clone(), id, column_id, index, Utc::now());
        self.commit(next);
    }

    /// Rewrites a column's manual order. Omitted tasks are dropped.
    pub fn reorder_tasks(&mut self, column_id: &ColumnId, ordered: &[TaskId]) {
        tracing::debug!(column_id = %column_id, count = ordered.len(), "reorder tasks");
        let next = transitions::reorder_tasks(self.state.clone(), column_id, ordered, Utc::now());
        self.commit(next);
    }

    /// Applies the result of a translated drag.
    pub fn apply_drag(&mut self, command: DragCommand) {
        match command {
            DragCommand::ReorderColumns(ordered) => self.reorder_columns(&ordered),
            DragCommand::MoveTask {
                task_id,
                column_id,
                index,
            } => self.move_task(&task_id, &column_id, index),
        }
    }

    // --- attachments ---

    /// Reads `file` and appends it to a task's attachments.
    ///
    /// `hint` names the column the caller believes holds the task; it is
    /// checked first, then every column.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::TaskNotFound`] if the task is not on the
    /// board once the file has been read, or an attachment error if the
    /// file cannot be ingested. The board is unchanged on error.
    pub async fn add_attachment(
        &mut self,
        task_id: &TaskId,
        file: FilePayload,
        hint: Option<&ColumnId>,
    ) -> Result<Attachment, BoardError> {
        let attachment = attachment::encode(file, self.config.max_attachment_bytes).await?;
        let next = transitions::add_attachments(
            self.state.clone(),
            task_id,
            vec![attachment.clone()],
            hint,
            Utc::now(),
        )
        .inspect_err(|e| tracing::warn!(error = %e, "attachment not added"))?;
        tracing::debug!(task_id = %task_id, attachment_id = %attachment.id, "attachment added");
        self.commit(next);
        Ok(attachment)
    }

    /// Removes an attachment from a task. Unknown ids change nothing.
    pub fn remove_attachment(&mut self, task_id: &TaskId, attachment_id: &AttachmentId) {
        tracing::debug!(task_id = %task_id, attachment_id = %attachment_id, "remove attachment");
        let next =
            transitions::remove_attachment(self.state.clone(), task_id, attachment_id, Utc::now());
        self.commit(next);
    }
}
