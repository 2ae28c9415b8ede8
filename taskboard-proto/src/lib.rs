//! Shared data model definitions for the `Taskboard` persisted format.

pub mod board;
pub mod codec;
pub mod migrate;

pub use board::{
    Attachment, AttachmentId, BoardState, Column, ColumnId, SortOption, Task, TaskId,
};
