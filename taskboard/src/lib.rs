//! `Taskboard`: single-user kanban board library.

pub mod board;
pub mod cli;
pub mod config;
pub mod drag;
pub mod store;
