//! Translation of completed drags into engine commands.
//!
//! A drag ends with an active item and the item or column it was dropped
//! over. [`translate`] turns that into one of two engine calls: a full
//! column permutation, or "move task T to index I of column C". Indexes
//! are read from the target column's display order (see
//! [`crate::board::sort`]).
//!
//! Sort-mode policy lives here and only here. Reordering a task inside a
//! column that is sorted `A-Z` or `Z-A` would be invisible, so such drops
//! are rejected. Moving into a sorted column from elsewhere is allowed.
//! [`BoardEngine::move_task`](crate::board::BoardEngine::move_task) itself
//! accepts any move; do not add this check there.

use taskboard_proto::{BoardState, ColumnId, SortOption, TaskId};

use crate::board::sort::sorted_tasks;

/// What a task was dropped on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// The column body, i.e. "put it at the end".
    Column(ColumnId),
    /// Another task card.
    Task(TaskId),
}

/// The raw result of a drag gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// A column header was dragged over another column.
    Column { active: ColumnId, over: ColumnId },
    /// A task card was dropped.
    Task { active: TaskId, over: DropTarget },
}

/// An engine call produced by a drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragCommand {
    /// Complete column permutation, in new display order.
    ReorderColumns(Vec<ColumnId>),
    /// Move a task to an index within a column.
    MoveTask {
        task_id: TaskId,
        column_id: ColumnId,
        index: usize,
    },
}

/// Translates a drag result against the current board.
///
/// Returns `None` when the drop does nothing (dropped on itself, on
/// something that no longer exists) or is not permitted by the target
/// column's sort mode.
#[must_use]
pub fn translate(state: &BoardState, outcome: &DragOutcome) -> Option<DragCommand> {
    match outcome {
        DragOutcome::Column { active, over } => translate_column(state, active, over),
        DragOutcome::Task { active, over } => translate_task(state, active, over),
    }
}

fn translate_column(state: &BoardState, active: &ColumnId, over: &ColumnId) -> Option<DragCommand> {
    if active == over {
        return None;
    }
    let mut ids: Vec<ColumnId> = state.sorted_columns().iter().map(|c| c.id.clone()).collect();
    let from = ids.iter().position(|id| id == active)?;
    let to = ids.iter().position(|id| id == over)?;
    let moved = ids.remove(from);
    ids.insert(to, moved);
    Some(DragCommand::ReorderColumns(ids))
}

fn translate_task(state: &BoardState, active: &TaskId, over: &DropTarget) -> Option<DragCommand> {
    let source = state.task(active)?.column_id.clone();

    let (column_id, index) = match over {
        DropTarget::Column(column_id) => {
            let column = state.column(column_id)?;
            let len = sorted_tasks(state.tasks_in(column_id), column.sort_option).len();
            (column_id.clone(), len)
        }
        DropTarget::Task(over_id) => {
            if over_id == active {
                return None;
            }
            let column_id = state.task(over_id)?.column_id.clone();
            let column = state.column(&column_id)?;
            let index = sorted_tasks(state.tasks_in(&column_id), column.sort_option)
                .iter()
                .position(|t| &t.id == over_id)?;
            (column_id, index)
        }
    };

    let sort_option = state.column(&column_id)?.sort_option;
    if column_id == source && sort_option != SortOption::Normal {
        tracing::debug!(task_id = %active, column_id = %column_id, %sort_option, "reorder blocked by sort mode");
        return None;
    }

    Some(DragCommand::MoveTask {
        task_id: active.clone(),
        column_id,
        index,
    })
}
