use crate::error::AppError;
use crate::model::{Category, Reminder, Task, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};

mod http;

pub use http::HttpApi;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,
    pub status: TaskStatus,
}

/// Partial update body. `None` fields are left out of the request;
/// `target_date: Some(None)` clears the date.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewReminder {
    pub task: TaskId,
    pub remind_at: String,
}

/// Remote task service. Every method is one request.
pub trait TrackerApi {
    fn obtain_token(&self, credentials: &Credentials) -> Result<TokenPair, AppError>;

    fn list_tasks(&self) -> Result<Vec<Task>, AppError>;

    fn create_task(&self, task: &NewTask) -> Result<Task, AppError>;

    fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, AppError>;

    fn delete_task(&self, id: TaskId) -> Result<(), AppError>;

    fn create_reminder(&self, reminder: &NewReminder) -> Result<Reminder, AppError>;

    /// Asks the server to dispatch due reminders; returns how many were sent.
    fn check_reminders(&self) -> Result<u64, AppError>;

    /// Asks the server to purge expired failed tasks; returns how many went.
    fn cleanup_failed(&self) -> Result<u64, AppError>;
}
