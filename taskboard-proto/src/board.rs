//! Board data model: columns, tasks, attachments, and the root aggregate.
//!
//! The [`BoardState`] maps each column id to that column's ordered task
//! list. This mapping is the only place task membership and manual order
//! are stored; flattened views are derived on demand.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ids of the columns every fresh board starts with, in display order.
pub const DEFAULT_COLUMNS: [(&str, &str); 3] = [
    ("todo", "To Do"),
    ("in-progress", "In Progress"),
    ("done", "Done"),
];

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generates a fresh, time-ordered identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(format!(concat!($prefix, "-{}"), Uuid::now_v7()))
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Opaque, stable identifier of a column.
    ColumnId,
    "column"
);
string_id!(
    /// Opaque identifier of a task, unique across the whole board.
    TaskId,
    "task"
);
string_id!(
    /// Identifier of an attachment, unique within its owning task.
    AttachmentId,
    "attachment"
);

/// Per-column display sort mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOption {
    /// Manual (stored) order.
    #[default]
    #[serde(rename = "normal")]
    Normal,
    /// Ascending by task name.
    #[serde(rename = "A-Z")]
    Ascending,
    /// Descending by task name.
    #[serde(rename = "Z-A")]
    Descending,
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Ascending => write!(f, "A-Z"),
            Self::Descending => write!(f, "Z-A"),
        }
    }
}

/// Error returned when a sort option string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort option: {0} (expected normal, A-Z, or Z-A)")]
pub struct ParseSortOptionError(String);

impl FromStr for SortOption {
    type Err = ParseSortOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "a-z" | "asc" => Ok(Self::Ascending),
            "z-a" | "desc" => Ok(Self::Descending),
            _ => Err(ParseSortOptionError(s.to_string())),
        }
    }
}

/// A named bucket of tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    /// Display position. Need not be contiguous; compared as integers.
    pub order: i64,
    #[serde(default)]
    pub sort_option: SortOption,
}

impl Column {
    /// Creates a column with the default (`normal`) sort mode.
    #[must_use]
    pub fn new(id: ColumnId, name: impl Into<String>, order: i64) -> Self {
        Self {
            id,
            name: name.into(),
            order,
            sort_option: SortOption::Normal,
        }
    }
}

/// An inline binary payload owned by exactly one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub name: String,
    /// Media type of the payload, e.g. `image/png`.
    #[serde(rename = "type")]
    pub media_type: String,
    /// Encoded payload, normally a base64 `data:` URI.
    pub data: String,
}

/// A single card on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    /// Column this task claims to live in. Must match the list holding it.
    pub column_id: ColumnId,
    /// Legacy image link, carried through for older boards.
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Insertion order is display order.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// The root aggregate: columns plus each column's ordered task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardState {
    pub columns: Vec<Column>,
    pub tasks: BTreeMap<ColumnId, Vec<Task>>,
}

impl Default for BoardState {
    /// The fresh board: To Do, In Progress, Done, all empty.
    fn default() -> Self {
        let mut columns = Vec::with_capacity(DEFAULT_COLUMNS.len());
        let mut tasks = BTreeMap::new();
        for (order, (id, name)) in (0_i64..).zip(DEFAULT_COLUMNS) {
            let id = ColumnId::from(id);
            tasks.insert(id.clone(), Vec::new());
            columns.push(Column::new(id, name, order));
        }
        Self { columns, tasks }
    }
}

impl BoardState {
    /// A board with no columns and no tasks.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            columns: Vec::new(),
            tasks: BTreeMap::new(),
        }
    }

    /// Looks up a column by id.
    #[must_use]
    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| &c.id == id)
    }

    /// Returns a column's stored (manual) task order; empty if unknown.
    #[must_use]
    pub fn tasks_in(&self, column_id: &ColumnId) -> &[Task] {
        self.tasks.get(column_id).map_or(&[], Vec::as_slice)
    }

    /// Finds the list holding a task and the task's index within it.
    #[must_use]
    pub fn locate_task(&self, task_id: &TaskId) -> Option<(&ColumnId, usize)> {
        self.tasks.iter().find_map(|(column_id, list)| {
            list.iter()
                .position(|t| &t.id == task_id)
                .map(|index| (column_id, index))
        })
    }

    /// Looks up a task by id across all columns.
    #[must_use]
    pub fn task(&self, task_id: &TaskId) -> Option<&Task> {
        self.tasks
            .values()
            .flat_map(|list| list.iter())
            .find(|t| &t.id == task_id)
    }

    /// Columns in display order. Ties on `order` keep stored position.
    #[must_use]
    pub fn sorted_columns(&self) -> Vec<&Column> {
        let mut columns: Vec<&Column> = self.columns.iter().collect();
        columns.sort_by_key(|c| c.order);
        columns
    }

    /// Every task on the board, grouped by column in display order.
    #[must_use]
    pub fn all_tasks(&self) -> Vec<&Task> {
        self.sorted_columns()
            .into_iter()
            .flat_map(|c| self.tasks_in(&c.id))
            .collect()
    }

    /// Total number of tasks across all lists.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.values().map(Vec::len).sum()
    }
}
