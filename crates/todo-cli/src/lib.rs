//! Todo の CLI
//!
//! 1 回の起動で 1 コマンドを実行し、結果をラベル付きの行で出力する。
//! 入力ミスや未検出は終了コード 0 のままメッセージで知らせ、
//! ストア障害だけを呼び出し元へ返す。

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use domain::{parse_flag, require_text, DomainError, DueDate, NewTodo, Todo, TodoChanges, TodoField};
use infrastructure::TodoRepository;
use std::io::Write;
use tracing::debug;

const RULE_WIDTH: usize = 40;

#[derive(Debug, Parser)]
#[command(name = "todo", about = "Todo CLI", disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List all todos
    List,
    /// Show a todo
    Get { id: String },
    /// Create a todo
    Create {
        #[arg(allow_hyphen_values = true)]
        title: String,
        #[arg(allow_hyphen_values = true)]
        description: String,
        due_date: String,
        completed: Option<String>,
    },
    /// Update one field of a todo
    Update {
        id: String,
        field: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Mark a todo as completed
    Complete { id: String },
    /// Delete a todo
    Delete { id: String },
    /// Show help
    Help,
    /// Exit the application
    Exit,
}

/// 引数解析の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Help,
    Invalid,
    Exit,
    Run(Command),
}

/// 引数を解析する（先頭はプログラム名）
///
/// コマンド名は大文字小文字を区別しない。
/// コマンドが受け取る位置引数より後ろの余分な引数は無視する。
pub fn parse_args<I, T>(args: I) -> Invocation
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let mut args: Vec<String> = args.into_iter().map(Into::into).collect();
    if let Some(command) = args.get_mut(1) {
        *command = command.to_lowercase();
    }
    if let Some(positionals) = args.get(1).and_then(|name| positional_count(name)) {
        args.truncate(2 + positionals);
    }

    match Cli::try_parse_from(args) {
        Ok(Cli { command: None }) | Ok(Cli { command: Some(Command::Help) }) => Invocation::Help,
        Ok(Cli { command: Some(Command::Exit) }) => Invocation::Exit,
        Ok(Cli { command: Some(command) }) => Invocation::Run(command),
        Err(e) if e.kind() == ErrorKind::DisplayHelp => Invocation::Help,
        Err(e) => {
            debug!(kind = ?e.kind(), "引数の解析に失敗しました");
            Invocation::Invalid
        }
    }
}

fn positional_count(name: &str) -> Option<usize> {
    Cli::command()
        .find_subcommand(name)
        .map(|subcommand| subcommand.get_positionals().count())
}

/// データコマンドを実行する
///
/// 入力ミスと未検出はメッセージを出して `Ok(())`。ストア障害のみ `Err`。
pub async fn execute<W: Write>(command: Command, repo: &TodoRepository, out: &mut W) -> Result<()> {
    match command {
        Command::List => {
            let todos = repo.get_all().await?;
            writeln!(out)?;
            writeln!(out, "Found {} todos:", todos.len())?;
            for todo in &todos {
                write_todo(out, todo)?;
            }
        }
        Command::Get { id } => match repo.get_by_id(&id).await? {
            Some(todo) => write_todo(out, &todo)?,
            None => writeln!(out, "Todo with ID {id} not found.")?,
        },
        Command::Create {
            title,
            description,
            due_date,
            completed,
        } => {
            let new = match new_todo(&title, &description, &due_date, completed.as_deref()) {
                Ok(new) => new,
                Err(e) => return write_validation_error(out, &e),
            };
            let todo = repo.create(new).await?;
            writeln!(out, "Todo created successfully:")?;
            write_todo(out, &todo)?;
        }
        Command::Update { id, field, value } => {
            let changes = match field
                .parse::<TodoField>()
                .and_then(|field| TodoChanges::from_raw(field, &value))
            {
                Ok(changes) => changes,
                Err(e) => return write_validation_error(out, &e),
            };
            match repo.update(&id, changes).await? {
                Some(todo) => {
                    writeln!(out, "Todo updated successfully:")?;
                    write_todo(out, &todo)?;
                }
                None => writeln!(out, "Todo with ID {id} not found or update failed.")?,
            }
        }
        Command::Complete { id } => match repo.update(&id, TodoChanges::completion(true)).await? {
            Some(todo) => {
                writeln!(out, "Todo marked as completed:")?;
                write_todo(out, &todo)?;
            }
            None => writeln!(out, "Todo with ID {id} not found or update failed.")?,
        },
        Command::Delete { id } => {
            if repo.delete(&id).await? {
                writeln!(out, "Todo with ID {id} deleted successfully.")?;
            } else {
                writeln!(out, "Todo with ID {id} not found or delete failed.")?;
            }
        }
        Command::Help => write_help(out)?,
        Command::Exit => writeln!(out, "Exiting Todo application.")?,
    }
    Ok(())
}

fn new_todo(
    title: &str,
    description: &str,
    due_date: &str,
    completed: Option<&str>,
) -> Result<NewTodo, DomainError> {
    let due_date = DueDate::parse(due_date)?;
    let title = require_text(TodoField::Title, title)?;
    let description = require_text(TodoField::Description, description)?;
    let is_completed = completed.map(parse_flag).unwrap_or(false);
    Ok(NewTodo::new(title, description, due_date).completed(is_completed))
}

fn write_validation_error<W: Write>(out: &mut W, err: &DomainError) -> Result<()> {
    match err {
        DomainError::InvalidDueDate(_) => {
            writeln!(out, "Error: Invalid date format. Use YYYY-MM-DD.")?
        }
        DomainError::UnknownField(_) => writeln!(
            out,
            "Error: Invalid field. Valid fields are: {}",
            TodoField::allowed_names()
        )?,
        other => writeln!(out, "Error: {other}")?,
    }
    Ok(())
}

/// 1 件分をラベル付きの行で出力する
pub fn write_todo<W: Write>(out: &mut W, todo: &Todo) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "ID: {}", todo.id)?;
    writeln!(out, "Title: {}", todo.title)?;
    writeln!(out, "Description: {}", todo.description)?;
    writeln!(out, "Due Date: {}", todo.due_date)?;
    writeln!(
        out,
        "Completed: {}",
        if todo.is_completed { "True" } else { "False" }
    )?;
    writeln!(out, "Created: {}", format_timestamp(&todo.created_at))?;
    writeln!(out, "Updated: {}", format_timestamp(&todo.updated_at))?;
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn write_help<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "Todo CLI")?;
    writeln!(out)?;
    writeln!(out, "Usage: todo <command> [arguments]")?;
    writeln!(out)?;
    writeln!(out, "Commands:")?;
    writeln!(out, "  list                                   List all todos")?;
    writeln!(out, "  get <id>                               Show a todo")?;
    writeln!(out, "  create <title> <description> <due_date> [completed]")?;
    writeln!(out, "                                         Create a todo")?;
    writeln!(out, "  update <id> <field> <value>            Update one field")?;
    writeln!(out, "                                         ({})", TodoField::allowed_names())?;
    writeln!(out, "  complete <id>                          Mark a todo as completed")?;
    writeln!(out, "  delete <id>                            Delete a todo")?;
    writeln!(out, "  help                                   Show this help")?;
    writeln!(out, "  exit                                   Exit the application")?;
    writeln!(out)?;
    writeln!(out, "Examples:")?;
    writeln!(out, "  todo create \"Buy milk\" \"2%, whole\" 2024-01-15")?;
    writeln!(out, "  todo update <id> title \"Buy oat milk\"")?;
    writeln!(out, "  todo complete <id>")
}
