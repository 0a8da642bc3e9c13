mod task;

pub use task::{
    Category, FAILED_RETENTION, HistoryEntry, Reminder, Task, TaskId, TaskStatus,
};
