use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::analytics::CompletionReport;
use crate::model::{DashboardStats, Priority, TaskStats, TaskView};
use crate::service::TaskPage;

fn fmt_due(due: Option<DateTime<Utc>>) -> String {
    due.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_task_detail(view: &TaskView) -> String {
    let task = &view.task;
    let mut out = String::new();
    out.push_str(&format!("ID:          {}\n", task.id));
    out.push_str(&format!("Title:       {}\n", task.title));
    out.push_str(&format!("Status:      {}\n", task.status));
    out.push_str(&format!("Priority:    {}\n", task.priority));
    if let Some(due) = task.due_date {
        let flag = if view.is_overdue { " (overdue)" } else { "" };
        out.push_str(&format!("Due:         {}{flag}\n", fmt_ts(&due)));
    }
    if task.archived {
        out.push_str("Archived:    yes\n");
    }
    if !task.description.is_empty() {
        out.push_str(&format!("Description: {}\n", task.description));
    }
    out.push_str(&format!("Created:     {}\n", fmt_ts(&task.created_at)));
    out.push_str(&format!("Updated:     {}\n", fmt_ts(&task.updated_at)));
    if let Some(done) = task.completed_at {
        out.push_str(&format!("Completed:   {}\n", fmt_ts(&done)));
    }
    out
}

/// One line per task: `<icon> <id> [priority] title  due  description`.
pub fn format_task_list(tasks: &[TaskView]) -> String {
    let mut out = String::new();
    for view in tasks {
        let task = &view.task;
        let due = match task.due_date {
            Some(_) if view.is_overdue => format!("  due {} !", fmt_due(task.due_date)),
            Some(_) => format!("  due {}", fmt_due(task.due_date)),
            None => String::new(),
        };
        let desc = if task.description.is_empty() {
            String::new()
        } else {
            format!("  {}", task.description)
        };
        out.push_str(&format!(
            "{} {:>4} [{}] {}{}{}\n",
            task.icon(),
            task.id,
            task.priority,
            task.title,
            due,
            desc
        ));
    }
    out
}

pub fn format_page(page: &TaskPage) -> String {
    let pages = page.total_count.div_ceil(page.page_size.max(1)).max(1);
    let mut out = format_task_list(&page.tasks);
    out.push_str(&format!(
        "-- page {}/{} ({} tasks) --\n",
        page.page, pages, page.total_count
    ));
    out
}

pub fn format_stats(stats: &TaskStats) -> String {
    format!(
        "Total:     {}\nActive:    {}\nCompleted: {}\nOverdue:   {}\nDue today: {}\nThis week: {}\n",
        stats.total_tasks,
        stats.active_tasks,
        stats.completed_tasks,
        stats.overdue_tasks,
        stats.today_tasks,
        stats.week_tasks,
    )
}

pub fn format_dashboard(dash: &DashboardStats) -> String {
    let mut out = format_stats(&dash.task_stats);

    let by_priority: Vec<String> = dash
        .priority_breakdown
        .iter()
        .map(|(p, n)| format!("{p}={n}"))
        .collect();
    let by_status: Vec<String> = dash
        .status_breakdown
        .iter()
        .map(|(s, n)| format!("{s}={n}"))
        .collect();
    out.push_str(&format!("\nBy priority: {}\n", by_priority.join(" ")));
    out.push_str(&format!("By status:   {}\n", by_status.join(" ")));

    if !dash.recent_tasks.is_empty() {
        out.push_str("\nRecent:\n");
        out.push_str(&format_task_list(&dash.recent_tasks));
    }
    if !dash.upcoming_tasks.is_empty() {
        out.push_str("\nUpcoming:\n");
        out.push_str(&format_task_list(&dash.upcoming_tasks));
    }
    out
}

pub fn format_completion(report: &CompletionReport) -> String {
    let mut out = format!(
        "Period:          {}\nCompletion rate: {:.1}%\nDue in period:   {}\nCompleted:       {}\nActive:          {}\n",
        report.period.as_str(),
        report.completion_rate,
        report.total_tasks,
        report.completed_tasks,
        report.active_tasks,
    );
    if let Some(n) = report.overdue_tasks {
        out.push_str(&format!("Overdue:         {n}\n"));
    }
    if let Some(rate) = report.overdue_rate {
        out.push_str(&format!("Overdue rate:    {rate:.1}%\n"));
    }
    out
}

/// Highest priority first.
pub fn format_priority_groups(groups: &BTreeMap<Priority, Vec<TaskView>>) -> String {
    let mut out = String::new();
    for (priority, tasks) in groups.iter().rev() {
        out.push_str(&format!("{priority} ({})\n", tasks.len()));
        for line in format_task_list(tasks).lines() {
            out.push_str(&format!("  {line}\n"));
        }
    }
    out
}
