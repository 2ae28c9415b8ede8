//! Schema migration for persisted boards.
//!
//! Whatever was last written under the board key (nothing, an older
//! layout, or the current one) is turned into a valid current-schema
//! [`BoardState`]. Decoding is attempted as the current schema first; on a
//! structural mismatch the legacy decoder takes over, renaming old fields
//! and backfilling missing ones. Both paths finish with [`reconcile`].
//!
//! Migration never fails. Input it cannot make sense of yields the default
//! board.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::board::{Attachment, BoardState, Column, ColumnId, Task, TaskId};

/// Migrates previously persisted bytes into a current-schema board.
///
/// Backfilled timestamps use the current wall clock.
#[must_use]
pub fn migrate(raw: Option<&[u8]>) -> BoardState {
    migrate_at(raw, Utc::now())
}

/// Same as [`migrate`], with the backfill timestamp supplied by the caller.
#[must_use]
pub fn migrate_at(raw: Option<&[u8]>, now: DateTime<Utc>) -> BoardState {
    let Some(bytes) = raw else {
        return BoardState::default();
    };
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => migrate_value(value, now),
        Err(e) => {
            tracing::warn!(error = %e, "stored board is not valid JSON, starting fresh");
            BoardState::default()
        }
    }
}

/// Migrates an already-parsed JSON value into a current-schema board.
#[must_use]
pub fn migrate_value(value: Value, now: DateTime<Utc>) -> BoardState {
    let state = match Persisted::decode(value) {
        Persisted::Current(state) => state,
        Persisted::Legacy(legacy) => {
            tracing::info!("migrating legacy board layout");
            legacy.normalize(now)
        }
        Persisted::Unrecognized => {
            tracing::warn!("stored board has an unrecognized shape, starting fresh");
            return BoardState::default();
        }
    };
    reconcile(state)
}

/// Re-derives column membership from each task's own `column_id`.
///
/// Tasks already sitting in the list their `column_id` names keep their
/// stored order; misplaced tasks are appended to the list they claim.
/// Duplicate column ids and duplicate task ids keep their first
/// occurrence. Every column ends up with a list; empty lists that belong
/// to no column are dropped. Each repair is logged.
///
/// Running this on its own output changes nothing.
#[must_use]
pub fn reconcile(mut state: BoardState) -> BoardState {
    let mut seen_columns = HashSet::new();
    state.columns.retain(|c| {
        let first = seen_columns.insert(c.id.clone());
        if !first {
            tracing::warn!(column_id = %c.id, "dropping duplicate column");
        }
        first
    });

    let mut buckets: BTreeMap<ColumnId, Vec<Task>> = state
        .columns
        .iter()
        .map(|c| (c.id.clone(), Vec::new()))
        .collect();
    let mut misplaced = Vec::new();
    let mut seen_tasks: HashSet<TaskId> = HashSet::new();

    for (list_id, list) in std::mem::take(&mut state.tasks) {
        for task in list {
            if !seen_tasks.insert(task.id.clone()) {
                tracing::warn!(task_id = %task.id, "dropping duplicate task");
                continue;
            }
            if task.column_id == list_id {
                buckets.entry(list_id.clone()).or_default().push(task);
            } else {
                tracing::warn!(
                    task_id = %task.id,
                    found_in = %list_id,
                    column_id = %task.column_id,
                    "task stored under the wrong column, moving it"
                );
                misplaced.push(task);
            }
        }
    }
    for task in misplaced {
        buckets.entry(task.column_id.clone()).or_default().push(task);
    }

    buckets.retain(|id, list| {
        if seen_columns.contains(id) {
            return true;
        }
        if !list.is_empty() {
            tracing::warn!(column_id = %id, tasks = list.len(), "tasks reference a missing column");
        }
        !list.is_empty()
    });

    state.tasks = buckets;
    state
}

/// The shapes a stored board can take.
enum Persisted {
    Current(BoardState),
    Legacy(LegacyBoard),
    Unrecognized,
}

impl Persisted {
    fn decode(value: Value) -> Self {
        if value.get("tasks").is_some_and(Value::is_object) {
            match serde_json::from_value::<BoardState>(value.clone()) {
                Ok(state) => return Self::Current(state),
                Err(e) => tracing::debug!(error = %e, "not a current-schema board"),
            }
        }
        serde_json::from_value::<LegacyBoard>(value).map_or(Self::Unrecognized, Self::Legacy)
    }
}

/// Older board layouts: tasks as one flat list, or grouped but with old
/// field names.
#[derive(Deserialize)]
struct LegacyBoard {
    #[serde(default)]
    columns: Option<Vec<Column>>,
    tasks: LegacyTasks,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LegacyTasks {
    Flat(Vec<Value>),
    Grouped(BTreeMap<String, Vec<Value>>),
}

impl LegacyBoard {
    fn normalize(self, now: DateTime<Utc>) -> BoardState {
        let columns = self
            .columns
            .unwrap_or_else(|| BoardState::default().columns);
        let raw_tasks: Vec<Value> = match self.tasks {
            LegacyTasks::Flat(list) => list,
            LegacyTasks::Grouped(map) => map.into_values().flatten().collect(),
        };

        let mut tasks: BTreeMap<ColumnId, Vec<Task>> = BTreeMap::new();
        for raw in raw_tasks {
            let Some(task) = LegacyTask::from_value(raw).and_then(|t| t.into_task(now)) else {
                continue;
            };
            tasks.entry(task.column_id.clone()).or_default().push(task);
        }
        BoardState { columns, tasks }
    }
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct LegacyTask {
    id: Option<String>,
    title: Option<String>,
    name: Option<String>,
    description: Option<String>,
    deadline: Option<Value>,
    column_id: Option<String>,
    image_url: Option<String>,
    favorite: Option<bool>,
    is_favorite: Option<bool>,
    created_at: Option<Value>,
    updated_at: Option<Value>,
    attachments: Option<Vec<Value>>,
}

impl LegacyTask {
    fn from_value(value: Value) -> Option<Self> {
        match serde_json::from_value(value) {
            Ok(task) => Some(task),
            Err(e) => {
                tracing::warn!(error = %e, "dropping unreadable legacy task");
                None
            }
        }
    }

    fn into_task(self, now: DateTime<Utc>) -> Option<Task> {
        let (Some(id), Some(column_id)) = (self.id, self.column_id) else {
            tracing::warn!("dropping legacy task without an id or column");
            return None;
        };
        let name = self
            .title
            .filter(|t| !t.is_empty())
            .or(self.name)
            .unwrap_or_default();
        let attachments = self
            .attachments
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| serde_json::from_value::<Attachment>(a).ok())
            .collect();

        Some(Task {
            id: TaskId::from(id),
            name,
            description: self.description.unwrap_or_default(),
            deadline: self.deadline.as_ref().and_then(parse_deadline),
            column_id: ColumnId::from(column_id),
            image_url: self.image_url.filter(|u| !u.is_empty()),
            is_favorite: self.favorite.or(self.is_favorite).unwrap_or(false),
            created_at: self.created_at.as_ref().and_then(parse_timestamp).unwrap_or(now),
            updated_at: self.updated_at.as_ref().and_then(parse_timestamp).unwrap_or(now),
            attachments,
        })
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (date part kept).
fn parse_deadline(value: &Value) -> Option<NaiveDate> {
    let raw = value.as_str()?.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
