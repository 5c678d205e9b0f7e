//! Command-line shell over the Tasklane core.
//!
//! # Responsibility
//! - Map subcommands onto store commands and views.
//! - Keep output plain and line-oriented for scripting.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::collections::HashMap;
use std::path::PathBuf;
use tasklane_core::{
    default_log_level, init_logging_from_config, CoreConfig, Mutation, Session, SkipReason,
    StorageLocation, Task, DB_PATH_ENV, LOG_DIR_ENV, LOG_LEVEL_ENV, UNCATEGORIZED_LABEL,
};

/// Local-first task and category manager
#[derive(Parser)]
#[command(name = "tasklane")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database file, or `:memory:` for a throwaway store
    #[arg(long, global = true, env = DB_PATH_ENV)]
    db: Option<String>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true, env = LOG_LEVEL_ENV)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off when unset
    #[arg(long, global = true, env = LOG_DIR_ENV)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List pending then completed tasks
    List {
        /// Only tasks in this category
        #[arg(long)]
        category: Option<String>,
    },
    /// Add a task
    Add {
        title: String,
        #[arg(long)]
        category: Option<String>,
    },
    /// Flip a task between pending and completed
    Toggle { id: String },
    /// Delete a task
    Delete { id: String },
    /// Delete every completed task
    ClearCompleted,
    /// List categories with their task counts
    Categories,
    /// Add a category
    AddCategory {
        name: String,
        #[arg(long)]
        color: Option<String>,
    },
    /// Rename or recolor a category
    UpdateCategory {
        id: String,
        name: String,
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a category; its tasks become uncategorized
    DeleteCategory {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show task totals
    Stats,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::List { .. } => "list",
            Self::Add { .. } => "add",
            Self::Toggle { .. } => "toggle",
            Self::Delete { .. } => "delete",
            Self::ClearCompleted => "clear-completed",
            Self::Categories => "categories",
            Self::AddCategory { .. } => "add-category",
            Self::UpdateCategory { .. } => "update-category",
            Self::DeleteCategory { .. } => "delete-category",
            Self::Stats => "stats",
        }
    }
}

impl Cli {
    fn config(&self) -> CoreConfig {
        let mut config = CoreConfig::default();
        if let Some(storage) = self.db.as_deref().and_then(StorageLocation::parse) {
            config.storage = storage;
        }
        config.log_level = self
            .log_level
            .clone()
            .unwrap_or_else(|| default_log_level().to_string());
        config.log_dir = self.log_dir.clone();
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config();
    init_logging_from_config(&config).context("failed to start logging")?;

    let session = Session::open(&config)
        .await
        .context("failed to open task store")?;
    info!(
        "event=cli_command module=cli status=start command={}",
        cli.command.name()
    );
    run(&session, cli.command).await?;
    session.flush().await;
    Ok(())
}

async fn run(session: &Session, command: Command) -> Result<()> {
    match command {
        Command::List { category } => {
            let view = session.task_view(category.as_deref());
            let names = category_names(session);
            for task in view.pending().chain(view.completed()) {
                println!("{}", task_line(task, &names));
            }
            println!(
                "{} pending, {} completed",
                view.pending_count(),
                view.completed_count()
            );
        }
        Command::Add { title, category } => {
            let mutation = session.tasks().add_task(&title, category.as_deref());
            settle(mutation, |id| format!("added {id}")).await?;
        }
        Command::Toggle { id } => {
            let mutation = session.tasks().toggle_task(&id);
            settle(mutation, |completed| {
                let state = if *completed { "completed" } else { "pending" };
                format!("{id} is now {state}")
            })
            .await?;
        }
        Command::Delete { id } => {
            let mutation = session.tasks().delete_task(&id);
            settle(mutation, |task| format!("deleted {}", task.id)).await?;
        }
        Command::ClearCompleted => {
            let mutation = session.tasks().clear_completed();
            settle(mutation, |removed| format!("cleared {removed} completed task(s)")).await?;
        }
        Command::Categories => {
            let breakdown = session.breakdown();
            for category in session.categories().categories().iter() {
                println!(
                    "{}\t{}\t{}\t{}",
                    category.id,
                    category.name,
                    category.color.as_deref().unwrap_or("-"),
                    breakdown.count_for(&category.id)
                );
            }
            println!(
                "{UNCATEGORIZED_LABEL}: {}",
                breakdown.uncategorized_count()
            );
        }
        Command::AddCategory { name, color } => {
            let mutation = session.categories().add_category(&name, color.as_deref());
            settle(mutation, |id| format!("added category {id}")).await?;
        }
        Command::UpdateCategory { id, name, color } => {
            let mutation = session
                .categories()
                .update_category(&id, &name, color.as_deref());
            settle(mutation, |_| format!("updated category {id}")).await?;
        }
        Command::DeleteCategory { id, yes } => {
            let Some(prompt) = session.delete_category_prompt(&id) else {
                println!("skipped: {}", SkipReason::NotFound.as_str());
                return Ok(());
            };
            if !yes {
                println!("{prompt}");
                println!("Re-run with --yes to confirm.");
                return Ok(());
            }
            let mutation = session.categories().delete_category(&id);
            settle(mutation, |category| {
                format!("deleted category {}", category.name)
            })
            .await?;
        }
        Command::Stats => {
            let stats = session.stats();
            println!(
                "total={} pending={} completed={}",
                stats.total, stats.pending, stats.completed
            );
        }
    }
    Ok(())
}

/// Waits for the command's write and prints its outcome.
///
/// A failed write after an applied change is a warning, not an error.
async fn settle<R: Send + 'static>(
    mutation: Mutation<R>,
    describe: impl FnOnce(&R) -> String,
) -> Result<()> {
    if let Some(reason) = mutation.skip_reason() {
        println!("skipped: {}", reason.as_str());
        return Ok(());
    }
    let line = mutation.value().map(describe);
    match mutation.await {
        Ok(_) => {}
        Err(err) if err.is_fatal() => return Err(err.into()),
        Err(err) => eprintln!("warning: change kept in memory only: {err}"),
    }
    if let Some(line) = line {
        println!("{line}");
    }
    Ok(())
}

fn category_names(session: &Session) -> HashMap<String, String> {
    session
        .categories()
        .categories()
        .iter()
        .map(|category| (category.id.clone(), category.name.clone()))
        .collect()
}

fn task_line(task: &Task, names: &HashMap<String, String>) -> String {
    let mark = if task.completed { "x" } else { " " };
    let category = task
        .category_id
        .as_deref()
        .and_then(|id| names.get(id))
        .map_or(UNCATEGORIZED_LABEL, String::as_str);
    format!("[{mark}] {}\t{}\t({category})", task.id, task.title)
}
