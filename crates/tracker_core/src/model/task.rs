use crate::datetime::parse_timestamp;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::{Duration, OffsetDateTime};

pub type TaskId = u64;

/// How long a failed task is kept before the server removes it.
pub const FAILED_RETENTION: Duration = Duration::days(2);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub id: Option<u64>,
    pub old_status: TaskStatus,
    pub new_status: TaskStatus,
    #[serde(default)]
    pub changed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    #[serde(default)]
    pub id: Option<u64>,
    pub task: TaskId,
    pub remind_at: String,
    #[serde(default)]
    pub is_sent: bool,
}

impl Reminder {
    pub fn at(&self) -> Result<OffsetDateTime, AppError> {
        parse_timestamp(&self.remind_at, "remind_at")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Category,
    pub status: TaskStatus,
    #[serde(default)]
    pub target_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub failed_at: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
}

impl Task {
    pub fn description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn is_failed(&self) -> bool {
        self.status == TaskStatus::Failure
    }

    /// When the server is expected to drop this task, if it has failed.
    /// An unreadable `failed_at` yields `None`.
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        if !self.is_failed() {
            return None;
        }
        let value = self.failed_at.as_deref()?;
        match parse_timestamp(value, "failed_at") {
            Ok(at) => Some(at + FAILED_RETENTION),
            Err(err) => {
                tracing::warn!(task = self.id, value, error = %err, "ignoring unreadable failed_at");
                None
            }
        }
    }

    /// Earliest unsent reminder that is not yet due. Reminders with an
    /// unreadable time are skipped.
    pub fn soonest_reminder(&self, now: OffsetDateTime) -> Option<&Reminder> {
        let mut soonest: Option<(OffsetDateTime, &Reminder)> = None;
        for reminder in self.reminders.iter().filter(|reminder| !reminder.is_sent) {
            let at = match reminder.at() {
                Ok(at) => at,
                Err(err) => {
                    tracing::warn!(task = self.id, remind_at = %reminder.remind_at, error = %err, "skipping reminder");
                    continue;
                }
            };
            if at < now {
                continue;
            }
            if soonest.is_none_or(|(best, _)| at < best) {
                soonest = Some((at, reminder));
            }
        }
        soonest.map(|(_, reminder)| reminder)
    }

    /// Unsent reminders whose time has passed, in stored order. A reminder
    /// whose time cannot be read comes back as an error in its slot.
    pub fn due_reminders(&self, now: OffsetDateTime) -> Vec<Result<&Reminder, AppError>> {
        self.reminders
            .iter()
            .filter(|reminder| !reminder.is_sent)
            .filter_map(|reminder| match reminder.at() {
                Ok(at) if at <= now => Some(Ok(reminder)),
                Ok(_) => None,
                Err(err) => Some(Err(err)),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Progress,
    Success,
    Failure,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Progress => "progress",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "progress" | "in_progress" | "in-progress" => Ok(Self::Progress),
            "success" | "done" => Ok(Self::Success),
            "failure" | "failed" | "fail" => Ok(Self::Failure),
            other => Err(AppError::invalid_input(format!(
                "unknown status '{other}' (expected pending, progress, success or failure)"
            ))),
        }
    }
}

/// Board column a task is grouped under. Free text categories are kept but
/// never land in one of the fixed columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Internship,
    #[default]
    Project,
    Hackathon,
    Other(String),
}

impl Category {
    pub fn columns() -> [Category; 3] {
        [Category::Internship, Category::Project, Category::Hackathon]
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Internship => "internship",
            Self::Project => "project",
            Self::Hackathon => "hackathon",
            Self::Other(value) => value,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Internship => "Internships",
            Self::Project => "Projects",
            Self::Hackathon => "Hackathons",
            Self::Other(value) => value,
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "internship" => Self::Internship,
            "project" => Self::Project,
            "hackathon" => Self::Hackathon,
            _ => Self::Other(value),
        }
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.as_str().to_string()
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("category is required"));
        }
        Ok(Category::from(trimmed.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{Category, Reminder, Task, TaskStatus};
    use time::macros::datetime;

    fn task(status: TaskStatus) -> Task {
        Task {
            id: 1,
            title: "demo".to_string(),
            description: None,
            category: Category::Project,
            status,
            target_date: None,
            created_at: None,
            updated_at: None,
            failed_at: None,
            history: Vec::new(),
            reminders: Vec::new(),
        }
    }

    fn reminder(remind_at: &str, is_sent: bool) -> Reminder {
        Reminder {
            id: None,
            task: 1,
            remind_at: remind_at.to_string(),
            is_sent,
        }
    }

    #[test]
    fn deserializes_server_payload() {
        let payload = serde_json::json!({
            "id": 7,
            "title": "Apply to internship",
            "description": "",
            "category": "internship",
            "status": "progress",
            "target_date": null,
            "created_at": "2025-12-20T10:00:00.512345Z",
            "updated_at": "2025-12-20T10:00:00.512345Z",
            "failed_at": null,
            "history": [
                {"id": 1, "task": 7, "old_status": "progress", "new_status": "success", "changed_at": "2025-12-20T11:00:00Z"}
            ],
            "reminders": [
                {"id": 3, "task": 7, "remind_at": "2025-12-21T09:00:00Z", "is_sent": false}
            ]
        });

        let task: Task = serde_json::from_value(payload).unwrap();

        assert_eq!(task.id, 7);
        assert_eq!(task.category, Category::Internship);
        assert_eq!(task.status, TaskStatus::Progress);
        assert_eq!(task.description(), None);
        assert_eq!(task.history[0].new_status, TaskStatus::Success);
        assert_eq!(task.reminders[0].task, 7);
    }

    #[test]
    fn free_text_category_is_kept() {
        let category: Category = serde_json::from_value(serde_json::json!("Research")).unwrap();
        assert_eq!(category, Category::Other("Research".to_string()));
        assert_eq!(serde_json::to_value(&category).unwrap(), "Research");
        assert_eq!(
            serde_json::to_value(Category::Hackathon).unwrap(),
            "hackathon"
        );
    }

    #[test]
    fn status_parses_aliases() {
        assert_eq!("failed".parse::<TaskStatus>().unwrap(), TaskStatus::Failure);
        assert_eq!(
            "In-Progress".parse::<TaskStatus>().unwrap(),
            TaskStatus::Progress
        );
        let err = "archived".parse::<TaskStatus>().unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn expires_two_days_after_failure() {
        let mut failed = task(TaskStatus::Failure);
        failed.failed_at = Some("2025-12-20T10:00:00Z".to_string());

        assert_eq!(
            failed.expires_at(),
            Some(datetime!(2025-12-22 10:00 UTC))
        );
        assert_eq!(task(TaskStatus::Progress).expires_at(), None);
    }

    #[test]
    fn unreadable_failed_at_has_no_expiry() {
        let mut failed = task(TaskStatus::Failure);
        failed.failed_at = Some("yesterday".to_string());

        assert_eq!(failed.expires_at(), None);
    }

    #[test]
    fn soonest_reminder_skips_sent_and_past() {
        let mut item = task(TaskStatus::Progress);
        item.reminders = vec![
            reminder("2025-12-19T09:00:00Z", false),
            reminder("2025-12-23T09:00:00Z", false),
            reminder("2025-12-21T09:00:00Z", true),
            reminder("2025-12-22T09:00:00Z", false),
        ];

        let now = datetime!(2025-12-20 12:00 UTC);
        let soonest = item.soonest_reminder(now).unwrap();

        assert_eq!(soonest.remind_at, "2025-12-22T09:00:00Z");
    }

    #[test]
    fn due_reminders_are_unsent_and_past() {
        let mut item = task(TaskStatus::Progress);
        item.reminders = vec![
            reminder("2025-12-19T09:00:00Z", false),
            reminder("2025-12-19T10:00:00Z", true),
            reminder("2025-12-23T09:00:00Z", false),
        ];

        let due = item.due_reminders(datetime!(2025-12-20 12:00 UTC));

        assert_eq!(due.len(), 1);
        assert_eq!(due[0].as_ref().unwrap().remind_at, "2025-12-19T09:00:00Z");
    }

    #[test]
    fn naive_reminder_time_does_not_hide_others() {
        let mut item = task(TaskStatus::Progress);
        item.reminders = vec![
            reminder("2025-12-21T09:30:00", false),
            reminder("2025-12-22T09:00:00Z", false),
            reminder("2025-12-19T09:00:00Z", false),
        ];
        let now = datetime!(2025-12-20 12:00 UTC);

        let soonest = item.soonest_reminder(now).unwrap();
        assert_eq!(soonest.remind_at, "2025-12-22T09:00:00Z");

        let due = item.due_reminders(now);
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].as_ref().unwrap_err().code(), "invalid_data");
        assert_eq!(due[1].as_ref().unwrap().remind_at, "2025-12-19T09:00:00Z");
    }
}
