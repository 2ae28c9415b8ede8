//! Pure board transitions.
//!
//! Every function here takes the current [`BoardState`] by value and
//! returns the next one. Ids and timestamps are supplied by the caller, so
//! a transition is fully determined by its arguments.
//!
//! Unknown task or column ids leave the state untouched. A transition
//! that would leave a task pointing at a column that does not exist is
//! also a no-op.

use chrono::{DateTime, NaiveDate, Utc};
use taskboard_proto::{
    Attachment, AttachmentId, BoardState, Column, ColumnId, SortOption, Task, TaskId,
};

use super::BoardError;

/// Field values for a new task, as delivered by a creation form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub name: String,
    pub description: String,
    pub deadline: Option<NaiveDate>,
    pub column_id: ColumnId,
    pub image_url: Option<String>,
    pub is_favorite: bool,
}

impl TaskDraft {
    /// A plain draft: no description, deadline, image, or favorite flag.
    #[must_use]
    pub fn new(name: impl Into<String>, column_id: ColumnId) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            deadline: None,
            column_id,
            image_url: None,
            is_favorite: false,
        }
    }

    /// Builds the stored task with the given generated id and timestamp.
    #[must_use]
    pub fn into_task(self, id: TaskId, now: DateTime<Utc>) -> Task {
        Task {
            id,
            name: self.name,
            description: self.description,
            deadline: self.deadline,
            column_id: self.column_id,
            image_url: self.image_url,
            is_favorite: self.is_favorite,
            created_at: now,
            updated_at: now,
            attachments: Vec::new(),
        }
    }
}

/// Partial column update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnPatch {
    pub name: Option<String>,
    pub order: Option<i64>,
    pub sort_option: Option<SortOption>,
}

impl ColumnPatch {
    #[must_use]
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn sort(sort_option: SortOption) -> Self {
        Self {
            sort_option: Some(sort_option),
            ..Self::default()
        }
    }
}

/// Partial task update. `None` leaves a field unchanged; the nested
/// options on `deadline` and `image_url` allow clearing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<Option<NaiveDate>>,
    pub column_id: Option<ColumnId>,
    pub image_url: Option<Option<String>>,
    pub is_favorite: Option<bool>,
}

impl TaskPatch {
    #[must_use]
    pub fn favorite(is_favorite: bool) -> Self {
        Self {
            is_favorite: Some(is_favorite),
            ..Self::default()
        }
    }

    fn apply(self, task: &mut Task) {
        if let Some(name) = self.name {
            task.name = name;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
        if let Some(image_url) = self.image_url {
            task.image_url = image_url;
        }
        if let Some(is_favorite) = self.is_favorite {
            task.is_favorite = is_favorite;
        }
    }
}

fn has_column(state: &BoardState, id: &ColumnId) -> bool {
    state.columns.iter().any(|c| &c.id == id)
}

/// Appends a column named `name`, placed last.
#[must_use]
pub fn create_column(mut state: BoardState, id: ColumnId, name: &str) -> BoardState {
    let order = i64::try_from(state.columns.len()).unwrap_or(i64::MAX);
    state.tasks.entry(id.clone()).or_default();
    state.columns.push(Column::new(id, name, order));
    state
}

/// Updates a column in place, or merges it into a same-named column.
///
/// When `patch.name` matches the name of another column, every task of
/// `id` is appended to that column (with `column_id` rewritten and
/// `updated_at` set to `now`) and column `id` is removed. The target
/// column keeps all of its own fields.
#[must_use]
pub fn update_column(
    mut state: BoardState,
    id: &ColumnId,
    patch: ColumnPatch,
    now: DateTime<Utc>,
) -> BoardState {
    let Some(index) = state.columns.iter().position(|c| &c.id == id) else {
        return state;
    };

    let merge_target = patch.name.as_ref().and_then(|name| {
        state
            .columns
            .iter()
            .find(|c| &c.id != id && &c.name == name)
            .map(|c| c.id.clone())
    });

    if let Some(target) = merge_target {
        let moved = state.tasks.remove(id).unwrap_or_default();
        tracing::debug!(from = %id, into = %target, tasks = moved.len(), "merging columns");
        let list = state.tasks.entry(target.clone()).or_default();
        list.extend(moved.into_iter().map(|mut task| {
            task.column_id = target.clone();
            task.updated_at = now;
            task
        }));
        state.columns.remove(index);
        return state;
    }

    let column = &mut state.columns[index];
    if let Some(name) = patch.name {
        column.name = name;
    }
    if let Some(order) = patch.order {
        column.order = order;
    }
    if let Some(sort_option) = patch.sort_option {
        column.sort_option = sort_option;
    }
    state
}

/// Removes a column together with all of its tasks.
#[must_use]
pub fn delete_column(mut state: BoardState, id: &ColumnId) -> BoardState {
    let before = state.columns.len();
    state.columns.retain(|c| &c.id != id);
    if state.columns.len() != before {
        state.tasks.remove(id);
    }
    state
}

/// Appends `task` to the end of its column's list.
#[must_use]
pub fn create_task(mut state: BoardState, task: Task) -> BoardState {
    if !has_column(&state, &task.column_id) {
        tracing::debug!(column_id = %task.column_id, "create_task for unknown column ignored");
        return state;
    }
    state.tasks.entry(task.column_id.clone()).or_default().push(task);
    state
}

/// Applies a partial update to a task.
///
/// A `column_id` naming a different column moves the task to the end of
/// that column's list; otherwise the task keeps its position.
#[must_use]
pub fn update_task(
    mut state: BoardState,
    id: &TaskId,
    patch: TaskPatch,
    now: DateTime<Utc>,
) -> BoardState {
    let Some((source, index)) = state.locate_task(id).map(|(c, i)| (c.clone(), i)) else {
        return state;
    };
    let destination = patch.column_id.clone().filter(|dest| dest != &source);
    if let Some(dest) = &destination {
        if !has_column(&state, dest) {
            tracing::debug!(task_id = %id, column_id = %dest, "update_task to unknown column ignored");
            return state;
        }
    }

    let Some(list) = state.tasks.get_mut(&source) else {
        return state;
    };
    match destination {
        Some(dest) => {
            let mut task = list.remove(index);
            patch.apply(&mut task);
            task.column_id = dest.clone();
            task.updated_at = now;
            state.tasks.entry(dest).or_default().push(task);
        }
        None => {
            let task = &mut list[index];
            patch.apply(task);
            task.updated_at = now;
        }
    }
    state
}

/// Removes a task (and with it, its attachments).
#[must_use]
pub fn delete_task(mut state: BoardState, id: &TaskId) -> BoardState {
    for list in state.tasks.values_mut() {
        if let Some(index) = list.iter().position(|t| &t.id == id) {
            list.remove(index);
            break;
        }
    }
    state
}

/// Moves a task to `index` in `target`, clamped to the list bounds.
///
/// The index refers to the target list after the task has been taken out
/// of its source list. Sort mode is not consulted.
#[must_use]
pub fn move_task(
    mut state: BoardState,
    id: &TaskId,
    target: &ColumnId,
    index: usize,
    now: DateTime<Utc>,
) -> BoardState {
    if !has_column(&state, target) {
        return state;
    }
    let Some((source, from)) = state.locate_task(id).map(|(c, i)| (c.clone(), i)) else {
        return state;
    };
    let Some(mut task) = state.tasks.get_mut(&source).map(|list| list.remove(from)) else {
        return state;
    };
    task.column_id = target.clone();
    task.updated_at = now;

    let list = state.tasks.entry(target.clone()).or_default();
    let at = index.min(list.len());
    list.insert(at, task);
    state
}

/// Sets each column's `order` to its position in `ordered`.
///
/// Columns missing from `ordered` are dropped along with their tasks;
/// unknown and repeated ids are ignored.
#[must_use]
pub fn reorder_columns(mut state: BoardState, ordered: &[ColumnId]) -> BoardState {
    let mut remaining = std::mem::take(&mut state.columns);
    let mut columns = Vec::with_capacity(remaining.len());
    for (order, id) in (0_i64..).zip(ordered) {
        if let Some(pos) = remaining.iter().position(|c| &c.id == id) {
            let mut column = remaining.swap_remove(pos);
            column.order = order;
            columns.push(column);
        }
    }
    for dropped in remaining {
        tracing::warn!(column_id = %dropped.id, "column missing from reorder, dropping it");
        state.tasks.remove(&dropped.id);
    }
    state.columns = columns;
    state
}

/// Rewrites a column's manual order to follow `ordered`.
///
/// Tasks of the column that `ordered` does not mention are dropped;
/// ids that are not in the column, and repeats, are ignored.
#[must_use]
pub fn reorder_tasks(
    mut state: BoardState,
    column_id: &ColumnId,
    ordered: &[TaskId],
    now: DateTime<Utc>,
) -> BoardState {
    let Some(list) = state.tasks.get_mut(column_id) else {
        return state;
    };
    let mut remaining = std::mem::take(list);
    for id in ordered {
        if let Some(pos) = remaining.iter().position(|t| &t.id == id) {
            let mut task = remaining.remove(pos);
            task.updated_at = now;
            list.push(task);
        }
    }
    if !remaining.is_empty() {
        tracing::warn!(column_id = %column_id, dropped = remaining.len(), "tasks missing from reorder");
    }
    state
}

/// Locates a task, checking `hint`'s list before scanning every column.
fn find_task_mut<'a>(
    state: &'a mut BoardState,
    id: &TaskId,
    hint: Option<&ColumnId>,
) -> Option<&'a mut Task> {
    let in_hint = hint.is_some_and(|column_id| {
        state
            .tasks
            .get(column_id)
            .is_some_and(|list| list.iter().any(|t| &t.id == id))
    });
    if in_hint {
        return hint
            .and_then(|column_id| state.tasks.get_mut(column_id))
            .and_then(|list| list.iter_mut().find(|t| &t.id == id));
    }
    state
        .tasks
        .values_mut()
        .flat_map(|list| list.iter_mut())
        .find(|t| &t.id == id)
}

/// Appends attachments to a task.
///
/// # Errors
///
/// Returns [`BoardError::TaskNotFound`] if the task is on no column.
pub fn add_attachments(
    mut state: BoardState,
    task_id: &TaskId,
    attachments: Vec<Attachment>,
    hint: Option<&ColumnId>,
    now: DateTime<Utc>,
) -> Result<BoardState, BoardError> {
    let task = find_task_mut(&mut state, task_id, hint)
        .ok_or_else(|| BoardError::TaskNotFound(task_id.clone()))?;
    task.attachments.extend(attachments);
    task.updated_at = now;
    Ok(state)
}

/// Removes one attachment from a task. Unknown ids change nothing.
#[must_use]
pub fn remove_attachment(
    mut state: BoardState,
    task_id: &TaskId,
    attachment_id: &AttachmentId,
    now: DateTime<Utc>,
) -> BoardState {
    if let Some(task) = find_task_mut(&mut state, task_id, None) {
        let before = task.attachments.len();
        task.attachments.retain(|a| &a.id != attachment_id);
        if task.attachments.len() != before {
            task.updated_at = now;
        }
    }
    state
}

/// Applies an edit form in one step: field patch, attachment removals,
/// then new attachments.
#[must_use]
pub fn edit_task(
    state: BoardState,
    id: &TaskId,
    patch: TaskPatch,
    remove: &[AttachmentId],
    add: Vec<Attachment>,
    now: DateTime<Utc>,
) -> BoardState {
    if state.task(id).is_none() {
        return state;
    }
    if let Some(dest) = &patch.column_id {
        if !has_column(&state, dest) {
            tracing::debug!(task_id = %id, column_id = %dest, "edit to unknown column ignored");
            return state;
        }
    }
    let mut state = update_task(state, id, patch, now);
    if let Some(task) = find_task_mut(&mut state, id, None) {
        task.attachments.retain(|a| !remove.contains(&a.id));
        task.attachments.extend(add);
        task.updated_at = now;
    }
    state
}
