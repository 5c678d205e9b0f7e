//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Drive the async core on a process-wide runtime.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - A storage write failure after an applied change is reported as
//!   `ok=true` with a `warning`; the in-memory change stands.
//! - Calls issued before `open_session` use the env-configured store.
//! - At most one session is opened at a time; the slot lock is held while
//!   opening.

use log::warn;
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex, MutexGuard};
use tasklane_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Category, CoreConfig, Mutation, Session, StorageLocation, Task,
};
use tokio::runtime::Runtime;

static RUNTIME: OnceCell<Runtime> = OnceCell::new();
static SESSION: Mutex<Option<Arc<Session>>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Task row for list rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub id: String,
    pub title: String,
    pub completed: bool,
    /// Creation time in Unix epoch milliseconds.
    pub created_at_ms: i64,
    /// Category as stored; may name a deleted category.
    pub category_id: Option<String>,
}

/// Filtered task list with its completion split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResponse {
    /// Pending tasks first, then completed, each in insertion order.
    pub items: Vec<TaskItem>,
    pub pending_count: u32,
    pub completed_count: u32,
    /// Human-readable response message for diagnostics.
    pub message: String,
}

/// Category row with the number of tasks displayed under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryItem {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub task_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryListResponse {
    pub items: Vec<CategoryItem>,
    /// Tasks shown under "Uncategorized".
    pub uncategorized_count: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatsResponse {
    pub total: u32,
    pub pending: u32,
    pub completed: u32,
    pub message: String,
}

/// Generic action response envelope for command flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether the change was applied.
    pub ok: bool,
    /// Created or affected entity id.
    pub id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
    /// Set when the change was applied but could not be saved.
    pub warning: Option<String>,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: Option<String>) -> Self {
        Self {
            ok: true,
            id,
            message: message.into(),
            warning: None,
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
            warning: None,
        }
    }
}

/// Opens the store at `db_path` and makes it the active session.
///
/// `db_path` may be a file path or `:memory:`; blank falls back to
/// `TASKLANE_DB_PATH` and then the default location.
///
/// # FFI contract
/// - Sync call, blocks until both stores are loaded.
/// - Replaces any previously opened session.
#[flutter_rust_bridge::frb(sync)]
pub fn open_session(db_path: String) -> ActionResponse {
    let mut config = CoreConfig::from_env();
    if let Some(storage) = StorageLocation::parse(&db_path) {
        config.storage = storage;
    }
    match open_into_slot(&config) {
        Ok(session) => ActionResponse::success(
            format!(
                "Session opened with {} task(s) and {} categories.",
                session.tasks().tasks().len(),
                session.categories().category_count()
            ),
            None,
        ),
        Err(err) => ActionResponse::failure(format!("open_session failed: {err}")),
    }
}

/// Lists tasks, optionally limited to one category.
///
/// A filter naming a deleted category yields an empty list.
#[flutter_rust_bridge::frb(sync)]
pub fn list_tasks(category_filter: Option<String>) -> TaskListResponse {
    let filter = category_filter
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    match with_session(|session| session.task_view(filter)) {
        Ok(view) => {
            let items: Vec<TaskItem> = view
                .pending()
                .chain(view.completed())
                .map(to_task_item)
                .collect();
            let message = if items.is_empty() {
                "No tasks.".to_string()
            } else {
                format!("Found {} task(s).", items.len())
            };
            TaskListResponse {
                items,
                pending_count: to_count(view.pending_count()),
                completed_count: to_count(view.completed_count()),
                message,
            }
        }
        Err(err) => TaskListResponse {
            items: Vec::new(),
            pending_count: 0,
            completed_count: 0,
            message: format!("list_tasks failed: {err}"),
        },
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn task_stats() -> TaskStatsResponse {
    match with_session(|session| session.stats()) {
        Ok(stats) => TaskStatsResponse {
            total: to_count(stats.total),
            pending: to_count(stats.pending),
            completed: to_count(stats.completed),
            message: String::new(),
        },
        Err(err) => TaskStatsResponse {
            total: 0,
            pending: 0,
            completed: 0,
            message: format!("task_stats failed: {err}"),
        },
    }
}

/// Adds a task; blank titles are skipped with `ok=false`.
#[flutter_rust_bridge::frb(sync)]
pub fn add_task(title: String, category_id: Option<String>) -> ActionResponse {
    settle("add_task", "Task added.", |session| {
        let mutation = session.tasks().add_task(&title, category_id.as_deref());
        let id = mutation.value().cloned();
        (mutation, id)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn toggle_task(id: String) -> ActionResponse {
    settle("toggle_task", "Task updated.", |session| {
        (session.tasks().toggle_task(&id), Some(id.clone()))
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn delete_task(id: String) -> ActionResponse {
    settle("delete_task", "Task deleted.", |session| {
        (session.tasks().delete_task(&id), Some(id.clone()))
    })
}

/// Removes every completed task in one change.
#[flutter_rust_bridge::frb(sync)]
pub fn clear_completed() -> ActionResponse {
    settle("clear_completed", "Completed tasks cleared.", |session| {
        (session.tasks().clear_completed(), None)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn list_categories() -> CategoryListResponse {
    match with_session(|session| (session.categories().categories(), session.breakdown())) {
        Ok((categories, breakdown)) => CategoryListResponse {
            items: categories
                .iter()
                .map(|category| to_category_item(category, breakdown.count_for(&category.id)))
                .collect(),
            uncategorized_count: to_count(breakdown.uncategorized_count()),
            message: format!("Found {} categories.", categories.len()),
        },
        Err(err) => CategoryListResponse {
            items: Vec::new(),
            uncategorized_count: 0,
            message: format!("list_categories failed: {err}"),
        },
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn add_category(name: String, color: Option<String>) -> ActionResponse {
    settle("add_category", "Category added.", |session| {
        let mutation = session.categories().add_category(&name, color.as_deref());
        let id = mutation.value().cloned();
        (mutation, id)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn update_category(id: String, name: String, color: Option<String>) -> ActionResponse {
    settle("update_category", "Category updated.", |session| {
        (
            session.categories().update_category(&id, &name, color.as_deref()),
            Some(id.clone()),
        )
    })
}

/// Deletes a category; its tasks are kept and shown as uncategorized.
#[flutter_rust_bridge::frb(sync)]
pub fn delete_category(id: String) -> ActionResponse {
    settle("delete_category", "Category deleted.", |session| {
        (session.categories().delete_category(&id), Some(id.clone()))
    })
}

/// Confirmation text to show before `delete_category`.
///
/// Returns `None` when the category does not exist or no session can be opened.
#[flutter_rust_bridge::frb(sync)]
pub fn delete_category_prompt(id: String) -> Option<String> {
    with_session(|session| session.delete_category_prompt(&id))
        .ok()
        .flatten()
}

fn runtime() -> Result<&'static Runtime, String> {
    RUNTIME.get_or_try_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("tasklane-ffi")
            .build()
            .map_err(|err| format!("runtime start failed: {err}"))
    })
}

type SessionSlot = MutexGuard<'static, Option<Arc<Session>>>;

fn lock_slot() -> Result<SessionSlot, String> {
    SESSION
        .lock()
        .map_err(|_| "session lock poisoned".to_string())
}

fn open_blocking(config: &CoreConfig) -> Result<Arc<Session>, String> {
    runtime()?
        .block_on(Session::open(config))
        .map(Arc::new)
        .map_err(|err| err.to_string())
}

fn open_into_slot(config: &CoreConfig) -> Result<Arc<Session>, String> {
    // The slot stays locked while opening so a concurrent lazy open waits
    // for this session instead of racing it.
    let mut slot = lock_slot()?;
    let session = open_blocking(config)?;
    *slot = Some(Arc::clone(&session));
    Ok(session)
}

fn current_session() -> Result<Arc<Session>, String> {
    let mut slot = lock_slot()?;
    if let Some(session) = slot.as_ref() {
        return Ok(Arc::clone(session));
    }
    let session = open_blocking(&CoreConfig::from_env())?;
    *slot = Some(Arc::clone(&session));
    Ok(session)
}

fn with_session<T>(f: impl FnOnce(&Session) -> T) -> Result<T, String> {
    let session = current_session()?;
    Ok(f(&session))
}

/// Issues a command and waits for its write, flattening the outcome.
fn settle<R: Send + 'static>(
    op: &'static str,
    done: &str,
    issue: impl FnOnce(&Session) -> (Mutation<R>, Option<String>),
) -> ActionResponse {
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(err) => return ActionResponse::failure(format!("{op} failed: {err}")),
    };
    let session = match current_session() {
        Ok(session) => session,
        Err(err) => return ActionResponse::failure(format!("{op} failed: {err}")),
    };

    let (mutation, id) = issue(&session);
    if let Some(reason) = mutation.skip_reason() {
        return ActionResponse::failure(format!("{op} skipped: {}", reason.as_str()));
    }
    match runtime.block_on(mutation.persisted()) {
        Ok(_) => ActionResponse::success(done, id),
        Err(err) if err.is_fatal() => ActionResponse::failure(format!("{op} failed: {err}")),
        Err(err) => {
            warn!("event=ffi_command module=ffi status=degraded op={op} error={err}");
            ActionResponse {
                warning: Some(format!("Saved in memory only: {err}")),
                ..ActionResponse::success(done, id)
            }
        }
    }
}

fn to_task_item(task: &Task) -> TaskItem {
    TaskItem {
        id: task.id.clone(),
        title: task.title.clone(),
        completed: task.completed,
        created_at_ms: task.created_at,
        category_id: task.category_id.clone(),
    }
}

fn to_category_item(category: &Category, task_count: usize) -> CategoryItem {
    CategoryItem {
        id: category.id.clone(),
        name: category.name.clone(),
        color: category.color.clone(),
        task_count: to_count(task_count),
    }
}

fn to_count(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
