use std::fmt::Write as _;
use tabled::{Table, Tabled};
use time::OffsetDateTime;
use tracker_core::board::Column;
use tracker_core::config::Palette;
use tracker_core::datetime::format_timestamp;
use tracker_core::error::AppError;
use tracker_core::model::{FAILED_RETENTION, Task, TaskId, TaskStatus};

#[derive(Tabled)]
struct BoardRow {
    #[tabled(rename = "ID")]
    id: TaskId,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Next reminder")]
    reminder: String,
}

#[derive(Tabled)]
struct FailedRow {
    #[tabled(rename = "ID")]
    id: TaskId,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Failed at")]
    failed_at: String,
    #[tabled(rename = "Deleted after")]
    expires_at: String,
}

pub fn status_label(status: TaskStatus, palette: &Palette) -> String {
    match status {
        TaskStatus::Success => palette.successize(status.as_str()),
        TaskStatus::Failure => palette.failurize(status.as_str()),
        _ => status.as_str().to_string(),
    }
}

fn expiry_label(task: &Task) -> Result<String, AppError> {
    match task.expires_at() {
        Some(at) => format_timestamp(at),
        None => Ok("-".to_string()),
    }
}

fn soonest_label(task: &Task, now: OffsetDateTime) -> String {
    task.soonest_reminder(now)
        .map(|reminder| reminder.remind_at.clone())
        .unwrap_or_else(|| "-".to_string())
}

fn board_rows(tasks: &[&Task], now: OffsetDateTime) -> Vec<BoardRow> {
    tasks
        .iter()
        .map(|task| BoardRow {
            id: task.id,
            title: task.title.clone(),
            status: task.status.as_str().to_string(),
            target: task.target_date.clone().unwrap_or_else(|| "-".to_string()),
            reminder: soonest_label(task, now),
        })
        .collect()
}

fn push_section(
    out: &mut String,
    heading: &str,
    tasks: &[&Task],
    palette: &Palette,
    now: OffsetDateTime,
) {
    let _ = writeln!(
        out,
        "{}",
        palette.accentize(&format!("== {} ({}) ==", heading, tasks.len()))
    );
    if tasks.is_empty() {
        let _ = writeln!(out, "{}", palette.mutedize("(no tasks)"));
    } else {
        let _ = writeln!(out, "{}", Table::new(board_rows(tasks, now)));
    }
    let _ = writeln!(out);
}

pub fn board_text(
    columns: &[Column<'_>],
    uncategorized: &[&Task],
    failed_count: usize,
    palette: &Palette,
    now: OffsetDateTime,
) -> String {
    let mut out = String::new();
    for column in columns {
        push_section(&mut out, column.category.label(), &column.tasks, palette, now);
    }
    if !uncategorized.is_empty() {
        push_section(&mut out, "Other", uncategorized, palette, now);
    }
    let _ = write!(
        out,
        "{}",
        palette.mutedize(&format!(
            "Failed tasks: {failed_count} (see `tracker failed`)"
        ))
    );
    out
}

pub fn failed_text(tasks: &[&Task], palette: &Palette) -> Result<String, AppError> {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        palette.accentize(&format!("== Failed tasks ({}) ==", tasks.len()))
    );

    if tasks.is_empty() {
        let _ = write!(out, "{}", palette.mutedize("(no failed tasks)"));
        return Ok(out);
    }

    let mut rows = Vec::with_capacity(tasks.len());
    for task in tasks {
        rows.push(FailedRow {
            id: task.id,
            title: task.title.clone(),
            category: task.category.label().to_string(),
            failed_at: task.failed_at.clone().unwrap_or_else(|| "-".to_string()),
            expires_at: expiry_label(task)?,
        });
    }
    let _ = writeln!(out, "{}", Table::new(rows));
    let _ = write!(
        out,
        "{}",
        palette.mutedize(&format!(
            "Failed tasks are removed {} days after failing.",
            FAILED_RETENTION.whole_days()
        ))
    );
    Ok(out)
}

pub fn task_detail_text(
    task: &Task,
    palette: &Palette,
    now: OffsetDateTime,
) -> Result<String, AppError> {
    let mut out = String::new();
    let _ = writeln!(out, "{} (#{})", palette.accentize(&task.title), task.id);
    let _ = writeln!(out, "Category: {}", task.category.label());
    let _ = writeln!(out, "Status: {}", status_label(task.status, palette));
    if let Some(description) = task.description() {
        let _ = writeln!(out, "Description: {description}");
    }
    if let Some(target) = task.target_date.as_deref() {
        let _ = writeln!(out, "Target: {target}");
    }
    if task.is_failed() {
        let _ = writeln!(out, "Deleted after: {}", expiry_label(task)?);
    }
    let _ = writeln!(out, "Next reminder: {}", soonest_label(task, now));

    let _ = writeln!(out, "History:");
    if task.history.is_empty() {
        let _ = writeln!(out, "  {}", palette.mutedize("(none)"));
    }
    for entry in &task.history {
        let _ = writeln!(
            out,
            "  {} -> {}{}",
            entry.old_status,
            entry.new_status,
            entry
                .changed_at
                .as_deref()
                .map(|at| format!(" ({at})"))
                .unwrap_or_default()
        );
    }

    let _ = write!(out, "Reminders:");
    if task.reminders.is_empty() {
        let _ = write!(out, "\n  {}", palette.mutedize("(none)"));
    }
    for reminder in &task.reminders {
        let state = if reminder.is_sent { "sent" } else { "pending" };
        let _ = write!(out, "\n  {} [{}]", reminder.remind_at, state);
    }

    Ok(out)
}

pub fn task_json(task: &Task, now: OffsetDateTime) -> Result<serde_json::Value, AppError> {
    let expires_at = match task.expires_at() {
        Some(at) => Some(format_timestamp(at)?),
        None => None,
    };
    let soonest = task
        .soonest_reminder(now)
        .map(|reminder| reminder.remind_at.clone());

    Ok(serde_json::json!({
        "id": task.id,
        "title": task.title,
        "description": task.description(),
        "category": task.category,
        "status": task.status,
        "target_date": task.target_date,
        "failed_at": task.failed_at,
        "expires_at": expires_at,
        "next_reminder": soonest,
        "history": task.history,
        "reminders": task.reminders,
    }))
}

pub fn tasks_json(tasks: &[&Task], now: OffsetDateTime) -> Result<serde_json::Value, AppError> {
    let mut payload = Vec::with_capacity(tasks.len());
    for task in tasks {
        payload.push(task_json(task, now)?);
    }
    Ok(serde_json::Value::Array(payload))
}

pub fn board_json(
    columns: &[Column<'_>],
    uncategorized: &[&Task],
    failed_count: usize,
    now: OffsetDateTime,
) -> Result<serde_json::Value, AppError> {
    let mut payload = Vec::with_capacity(columns.len());
    for column in columns {
        payload.push(serde_json::json!({
            "category": column.category,
            "label": column.category.label(),
            "tasks": tasks_json(&column.tasks, now)?,
        }));
    }

    Ok(serde_json::json!({
        "columns": payload,
        "uncategorized": tasks_json(uncategorized, now)?,
        "failed_count": failed_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::{board_json, board_text, failed_text, task_detail_text};
    use time::macros::datetime;
    use tracker_core::board::partition_columns;
    use tracker_core::config::palette_for_theme;
    use tracker_core::model::{Category, HistoryEntry, Reminder, Task, TaskStatus};

    fn task(id: u64, title: &str, category: Category, status: TaskStatus) -> Task {
        Task {
            id,
            title: title.to_string(),
            description: None,
            category,
            status,
            target_date: None,
            created_at: None,
            updated_at: None,
            failed_at: None,
            history: Vec::new(),
            reminders: Vec::new(),
        }
    }

    #[test]
    fn board_text_lists_columns_in_order() {
        let tasks = vec![
            task(1, "Apply to ACME", Category::Internship, TaskStatus::Progress),
            task(2, "Portfolio", Category::Project, TaskStatus::Success),
        ];
        let columns = partition_columns(&tasks);
        let palette = palette_for_theme(None);

        let text = board_text(&columns, &[], 0, &palette, datetime!(2025-12-20 12:00 UTC));

        let internships = text.find("== Internships (1) ==").unwrap();
        let projects = text.find("== Projects (1) ==").unwrap();
        let hackathons = text.find("== Hackathons (0) ==").unwrap();
        assert!(internships < projects && projects < hackathons);
        assert!(text.contains("Apply to ACME"));
        assert!(text.contains("(no tasks)"));
        assert!(text.ends_with("Failed tasks: 0 (see `tracker failed`)"));
    }

    #[test]
    fn failed_text_shows_expiry() {
        let mut failed = task(3, "Hack night", Category::Hackathon, TaskStatus::Failure);
        failed.failed_at = Some("2025-12-20T10:00:00Z".to_string());
        let palette = palette_for_theme(None);

        let text = failed_text(&[&failed], &palette).unwrap();

        assert!(text.contains("Hack night"));
        assert!(text.contains("2025-12-22T10:00:00Z"));
        assert!(text.contains("removed 2 days after failing"));
    }

    #[test]
    fn detail_lists_history_and_reminders() {
        let mut item = task(4, "Portfolio", Category::Project, TaskStatus::Success);
        item.history.push(HistoryEntry {
            id: Some(1),
            old_status: TaskStatus::Progress,
            new_status: TaskStatus::Success,
            changed_at: None,
        });
        item.reminders.push(Reminder {
            id: Some(1),
            task: 4,
            remind_at: "2025-12-21T09:00:00Z".to_string(),
            is_sent: false,
        });
        let palette = palette_for_theme(None);

        let text = task_detail_text(&item, &palette, datetime!(2025-12-20 12:00 UTC)).unwrap();

        assert!(text.contains("Portfolio (#4)"));
        assert!(text.contains("progress -> success"));
        assert!(text.contains("Next reminder: 2025-12-21T09:00:00Z"));
        assert!(text.contains("2025-12-21T09:00:00Z [pending]"));
    }

    #[test]
    fn board_json_groups_by_category() {
        let tasks = vec![
            task(1, "proj", Category::Project, TaskStatus::Progress),
            task(2, "lost", Category::Project, TaskStatus::Failure),
        ];
        let columns = partition_columns(&tasks);

        let json = board_json(&columns, &[], 1, datetime!(2025-12-20 12:00 UTC)).unwrap();

        assert_eq!(json["columns"][0]["category"], "internship");
        assert_eq!(json["columns"][0]["tasks"].as_array().unwrap().len(), 0);
        assert_eq!(json["columns"][1]["label"], "Projects");
        assert_eq!(json["columns"][1]["tasks"][0]["id"], 1);
        assert_eq!(json["failed_count"], 1);
    }

    #[test]
    fn naive_reminder_does_not_break_board() {
        let mut naive = task(1, "Portfolio", Category::Project, TaskStatus::Progress);
        naive.reminders.push(Reminder {
            id: Some(1),
            task: 1,
            remind_at: "2025-12-21T09:30:00".to_string(),
            is_sent: false,
        });
        let tasks = vec![naive, task(2, "Blog", Category::Project, TaskStatus::Pending)];
        let columns = partition_columns(&tasks);
        let palette = palette_for_theme(None);
        let now = datetime!(2025-12-20 12:00 UTC);

        let text = board_text(&columns, &[], 0, &palette, now);
        assert!(text.contains("== Projects (2) =="));
        assert!(text.contains("Portfolio"));
        assert!(text.contains("Blog"));

        let json = board_json(&columns, &[], 0, now).unwrap();
        assert_eq!(json["columns"][1]["tasks"][0]["next_reminder"], serde_json::Value::Null);
    }

    #[test]
    fn unreadable_failed_at_shows_dash() {
        let mut failed = task(3, "Hack night", Category::Hackathon, TaskStatus::Failure);
        failed.failed_at = Some("not a date".to_string());
        let palette = palette_for_theme(None);

        let text = failed_text(&[&failed], &palette).unwrap();

        assert!(text.contains("Hack night"));
        assert!(text.contains("not a date"));
    }
}
