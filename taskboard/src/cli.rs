//! Command-line subcommands and their dispatch onto the engine.
//!
//! Each subcommand maps to one engine operation. Output goes to the
//! writer passed to [`run`] so the commands can be exercised in tests.

use std::io::Write;
use std::path::PathBuf;

use chrono::NaiveDate;
use taskboard_proto::{AttachmentId, ColumnId, SortOption, TaskId};

use crate::board::{BoardEngine, BoardError, ColumnPatch, FilePayload, TaskDraft, TaskPatch};
use crate::store::KeyValueStore;

/// Errors surfaced by a CLI command.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The engine rejected the operation.
    #[error(transparent)]
    Board(#[from] BoardError),
    /// Writing output failed.
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
    /// Rendering the board as JSON failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// A task was aimed at a column that is not on the board.
    #[error("no column with id {0}")]
    UnknownColumn(ColumnId),
}

/// Top-level subcommands.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the board, columns in order and tasks in display order.
    Show {
        /// Print the raw stored board as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Manage columns.
    #[command(subcommand)]
    Column(ColumnCommand),
    /// Manage tasks.
    #[command(subcommand)]
    Task(TaskCommand),
    /// Manage task attachments.
    #[command(subcommand)]
    Attach(AttachCommand),
}

#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ColumnCommand {
    /// Add a column at the end.
    Add { name: String },
    /// Rename a column. Renaming to an existing column's name merges the two.
    Rename { id: String, name: String },
    /// Delete a column and every task in it.
    Delete { id: String },
    /// Set a column's sort mode (normal, A-Z, Z-A).
    Sort { id: String, mode: SortOption },
    /// Reorder columns; list every column id in the new order.
    Reorder { ids: Vec<String> },
}

#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum TaskCommand {
    /// Add a task at the end of a column.
    Add {
        name: String,
        #[arg(short, long)]
        column: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Deadline as YYYY-MM-DD.
        #[arg(long)]
        deadline: Option<NaiveDate>,
        #[arg(long)]
        favorite: bool,
        /// Files to attach.
        #[arg(long = "attach")]
        attach: Vec<PathBuf>,
    },
    /// Edit a task's fields and attachments.
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, conflicts_with = "clear_deadline")]
        deadline: Option<NaiveDate>,
        #[arg(long)]
        clear_deadline: bool,
        /// Move to the end of this column.
        #[arg(long)]
        column: Option<String>,
        #[arg(long = "attach")]
        attach: Vec<PathBuf>,
        #[arg(long = "remove-attachment")]
        remove_attachment: Vec<String>,
    },
    /// Move a task to a position in a column (end by default).
    Move {
        id: String,
        column: String,
        #[arg(long)]
        index: Option<usize>,
    },
    /// Rewrite a column's manual order; list every task id.
    Reorder { column: String, ids: Vec<String> },
    /// Delete a task.
    Delete { id: String },
    /// Toggle a task's favorite flag.
    Favorite { id: String },
}

#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum AttachCommand {
    /// Attach a file to a task.
    Add {
        task: String,
        path: PathBuf,
        /// Column expected to hold the task.
        #[arg(long)]
        column: Option<String>,
    },
    /// Remove an attachment from a task.
    Remove { task: String, attachment: String },
}

/// Runs one command against the engine.
///
/// # Errors
///
/// Returns [`CliError`] if attachment ingestion fails or output cannot
/// be written.
pub async fn run<S: KeyValueStore, W: Write>(
    engine: &mut BoardEngine<S>,
    command: Command,
    out: &mut W,
) -> Result<(), CliError> {
    match command {
        Command::Show { json } => show(engine, json, out)?,
        Command::Column(cmd) => run_column(engine, cmd, out)?,
        Command::Task(cmd) => run_task(engine, cmd, out).await?,
        Command::Attach(cmd) => run_attach(engine, cmd, out).await?,
    }
    Ok(())
}

fn show<S: KeyValueStore, W: Write>(
    engine: &BoardEngine<S>,
    json: bool,
    out: &mut W,
) -> Result<(), CliError> {
    if json {
        serde_json::to_writer_pretty(&mut *out, engine.state())?;
        writeln!(out)?;
        return Ok(());
    }
    for column in engine.sorted_columns() {
        writeln!(out, "{} [{}] ({})", column.name, column.id, column.sort_option)?;
        for task in engine.sorted_tasks(&column.id) {
            let star = if task.is_favorite { '*' } else { '-' };
            write!(out, "  {star} {} [{}]", task.name, task.id)?;
            if let Some(deadline) = task.deadline {
                write!(out, " due {deadline}")?;
            }
            if !task.attachments.is_empty() {
                write!(out, " ({} attachments)", task.attachments.len())?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

fn run_column<S: KeyValueStore, W: Write>(
    engine: &mut BoardEngine<S>,
    command: ColumnCommand,
    out: &mut W,
) -> Result<(), CliError> {
    match command {
        ColumnCommand::Add { name } => {
            let id = engine.create_column(&name);
            writeln!(out, "created column {id}")?;
        }
        ColumnCommand::Rename { id, name } => {
            engine.update_column(&ColumnId::from(id), ColumnPatch::rename(name));
        }
        ColumnCommand::Delete { id } => engine.delete_column(&ColumnId::from(id)),
        ColumnCommand::Sort { id, mode } => {
            engine.update_column(&ColumnId::from(id), ColumnPatch::sort(mode));
        }
        ColumnCommand::Reorder { ids } => {
            let ids: Vec<ColumnId> = ids.into_iter().map(ColumnId::from).collect();
            engine.reorder_columns(&ids);
        }
    }
    Ok(())
}

async fn run_task<S: KeyValueStore, W: Write>(
    engine: &mut BoardEngine<S>,
    command: TaskCommand,
    out: &mut W,
) -> Result<(), CliError> {
    match command {
        TaskCommand::Add {
            name,
            column,
            description,
            deadline,
            favorite,
            attach,
        } => {
            let column = ColumnId::from(column);
            if engine.column(&column).is_none() {
                return Err(CliError::UnknownColumn(column));
            }
            let draft = TaskDraft {
                description,
                deadline,
                is_favorite: favorite,
                ..TaskDraft::new(name, column)
            };
            let id = if attach.is_empty() {
                engine.create_task(draft)
            } else {
                let files = attach.into_iter().map(FilePayload::from_path).collect();
                engine.create_task_with_attachments(draft, files).await?
            };
            writeln!(out, "created task {id}")?;
        }
        TaskCommand::Edit {
            id,
            name,
            description,
            deadline,
            clear_deadline,
            column,
            attach,
            remove_attachment,
        } => {
            let patch = TaskPatch {
                name,
                description,
                deadline: if clear_deadline { Some(None) } else { deadline.map(Some) },
                column_id: column.map(ColumnId::from),
                ..TaskPatch::default()
            };
            let files = attach.into_iter().map(FilePayload::from_path).collect();
            let remove: Vec<AttachmentId> =
                remove_attachment.into_iter().map(AttachmentId::from).collect();
            engine
                .update_task_with_attachments(&TaskId::from(id), patch, files, &remove)
                .await?;
        }
        TaskCommand::Move { id, column, index } => {
            engine.move_task(
                &TaskId::from(id),
                &ColumnId::from(column),
                index.unwrap_or(usize::MAX),
            );
        }
        TaskCommand::Reorder { column, ids } => {
            let ids: Vec<TaskId> = ids.into_iter().map(TaskId::from).collect();
            engine.reorder_tasks(&ColumnId::from(column), &ids);
        }
        TaskCommand::Delete { id } => engine.delete_task(&TaskId::from(id)),
        TaskCommand::Favorite { id } => {
            let id = TaskId::from(id);
            if let Some(current) = engine.find_task(&id).map(|t| t.is_favorite) {
                engine.update_task(&id, TaskPatch::favorite(!current));
            }
        }
    }
    Ok(())
}

async fn run_attach<S: KeyValueStore, W: Write>(
    engine: &mut BoardEngine<S>,
    command: AttachCommand,
    out: &mut W,
) -> Result<(), CliError> {
    match command {
        AttachCommand::Add { task, path, column } => {
            let hint = column.map(ColumnId::from);
            let attachment = engine
                .add_attachment(&TaskId::from(task), FilePayload::from_path(path), hint.as_ref())
                .await?;
            writeln!(out, "attached {} as {}", attachment.name, attachment.id)?;
        }
        AttachCommand::Remove { task, attachment } => {
            engine.remove_attachment(&TaskId::from(task), &AttachmentId::from(attachment));
        }
    }
    Ok(())
}
