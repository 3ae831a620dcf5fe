//! Command-line transport over the Taskdeck core API.
//!
//! # Responsibility
//! - Resolve configuration, open storage and authenticate the acting user.
//! - Print canonical task state as JSON.
//! - Report core errors as `code` plus user-facing message.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use taskdeck_core::logging::init_from_config;
use taskdeck_core::{
    authenticate_owner, open_db, CoreConfig, CoreError, DecompositionOutcome, EmailCredentials,
    NewTask, SqliteTaskRepository, SqliteUserRepository, TaskApi, TaskId, TaskPatch,
    TaskService,
};

/// Multi-user ordered task list with AI-assisted decomposition.
#[derive(Parser, Debug)]
#[command(name = "taskdeck")]
#[command(version)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "TASKDECK_DB_PATH", value_name = "PATH")]
    db: Option<PathBuf>,

    /// Absolute directory for rolling log files
    #[arg(long, global = true, env = "TASKDECK_LOG_DIR", value_name = "DIR")]
    log_dir: Option<String>,

    /// Email of the acting user
    #[arg(long, short = 'u', global = true, env = "TASKDECK_USER", value_name = "EMAIL")]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a user
    Register {
        email: String,
        /// Opaque hash produced by the external credential service
        #[arg(long, value_name = "HASH")]
        credential_hash: String,
    },
    #[command(flatten)]
    Task(TaskCommand),
}

/// Commands acting on the authenticated user's tasks.
#[derive(Subcommand, Debug)]
enum TaskCommand {
    /// Append a task to the end of the list
    Add {
        title: String,
        #[arg(long, short = 'd')]
        description: Option<String>,
    },
    /// List tasks in display order
    List,
    /// Show one task
    Show { id: TaskId },
    /// Edit title or description
    Edit {
        id: TaskId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
    },
    /// Mark a task completed
    Done { id: TaskId },
    /// Mark a task not completed
    Undone { id: TaskId },
    /// Delete a task
    Rm { id: TaskId },
    /// Reorder the whole list; ids must be an exact permutation
    Reorder {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<TaskId>,
    },
    /// Move one task to a zero-based index
    Move { id: TaskId, index: usize },
    /// Split a title (or an existing task) into appended subtasks
    Decompose {
        #[arg(long, conflicts_with = "id", required_unless_present = "id")]
        title: Option<String>,
        #[arg(long)]
        id: Option<TaskId>,
    },
    /// Renumber positions when they have drifted
    Repair,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<CoreError>() {
                Some(core) => eprintln!("error[{}]: {}", core.code(), core.user_message()),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = CoreConfig::from_env().context("invalid configuration")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(log_dir) = cli.log_dir {
        config.log_dir = Some(log_dir);
    }
    init_from_config(&config).map_err(|message| anyhow!(message))?;

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open `{}`", config.db_path.display()))?;
    let credentials = EmailCredentials::new(SqliteUserRepository::try_new(&conn)?);

    let command = match cli.command {
        Command::Register {
            email,
            credential_hash,
        } => {
            let user = credentials.register(&email, &credential_hash)?;
            return print_json(&user);
        }
        Command::Task(command) => command,
    };

    let credential = cli
        .user
        .as_deref()
        .ok_or_else(|| anyhow!("--user or TASKDECK_USER is required"))?;
    let owner = authenticate_owner(&credentials, credential)?;

    let service = TaskService::new(SqliteTaskRepository::try_new(&conn)?);
    let api = TaskApi::from_config(service, &config.decomposition)?;
    info!(
        "event=cli_command module=cli status=start owner={} mode={}",
        owner,
        api.decomposition_mode().as_str()
    );

    match command {
        TaskCommand::Add { title, description } => {
            let mut task = NewTask::new(title);
            task.description = description;
            print_json(&api.create_task(owner, task)?)
        }
        TaskCommand::List => print_json(&api.list_tasks(owner)?),
        TaskCommand::Show { id } => print_json(&api.get_task(owner, id)?),
        TaskCommand::Edit {
            id,
            title,
            description,
            clear_description,
        } => {
            let patch = TaskPatch {
                title,
                description: if clear_description {
                    Some(None)
                } else {
                    description.map(Some)
                },
                completed: None,
            };
            print_json(&api.update_task(owner, id, patch)?)
        }
        TaskCommand::Done { id } => {
            print_json(&api.update_task(owner, id, TaskPatch::completed(true))?)
        }
        TaskCommand::Undone { id } => {
            print_json(&api.update_task(owner, id, TaskPatch::completed(false))?)
        }
        TaskCommand::Rm { id } => {
            api.delete_task(owner, id)?;
            print_json(&json!({ "deleted": id }))
        }
        TaskCommand::Reorder { ids } => print_json(&api.reorder_tasks(owner, &ids)?),
        TaskCommand::Move { id, index } => print_json(&api.move_task(owner, id, index)?),
        TaskCommand::Decompose { title, id } => {
            let outcome = match (title, id) {
                (_, Some(id)) => api.decompose_task_by_id(owner, id)?,
                (Some(title), None) => api.decompose_task(owner, &title)?,
                (None, None) => return Err(anyhow!("either --title or --id is required")),
            };
            print_json(&outcome_json(&outcome))
        }
        TaskCommand::Repair => {
            let renumbered = api.repair_order(owner)?;
            print_json(&json!({ "renumbered": renumbered }))
        }
    }
}

fn outcome_json(outcome: &DecompositionOutcome) -> serde_json::Value {
    json!({
        "source_title": outcome.source_title,
        "requested": outcome.requested,
        "created": outcome.created,
        "failures": outcome
            .failures
            .iter()
            .map(|failure| json!({
                "index": failure.index,
                "title": failure.title,
                "code": failure.error.code(),
                "message": failure.error.user_message(),
            }))
            .collect::<Vec<_>>(),
    })
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
