//! Board state engine for `Taskboard`.
//!
//! State changes are pure transitions in [`transitions`]: each takes the
//! old [`BoardState`](taskboard_proto::BoardState) by value and returns
//! the next one. [`BoardEngine`] owns the canonical state, feeds the
//! transitions their generated ids and timestamps, and writes every new
//! state through to a [`KeyValueStore`](crate::store::KeyValueStore).
//!
//! Mutations that reference an unknown task or column are silent no-ops.
//! Only the operations that ingest attachments can fail.

pub mod attachment;
pub mod engine;
pub mod sort;
pub mod transitions;

pub use attachment::{FilePayload, PayloadSource};
pub use engine::{BoardEngine, EngineConfig};
pub use sort::sorted_tasks;
pub use transitions::{ColumnPatch, TaskDraft, TaskPatch};

use taskboard_proto::{ColumnId, TaskId};
use thiserror::Error;

/// Errors that can occur during board operations.
#[derive(Debug, Error)]
pub enum BoardError {
    /// The task an attachment was meant for is not on the board.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    /// A task with attachments was drafted into a column that does not exist.
    #[error("column not found: {0}")]
    ColumnNotFound(ColumnId),
    /// An attachment payload could not be read.
    #[error("failed to read attachment {name}: {source}")]
    AttachmentRead {
        /// Display name of the attachment.
        name: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// An attachment payload exceeds the configured size limit.
    #[error("attachment {name} is {size} bytes (limit {limit})")]
    AttachmentTooLarge {
        /// Display name of the attachment.
        name: String,
        /// Payload size in bytes.
        size: usize,
        /// Configured limit in bytes.
        limit: usize,
    },
}
