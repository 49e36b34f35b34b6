use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{DashboardStats, Priority, Status, Task, TaskStats, TaskView};
use crate::query::{DateFilter, SortField, SortOrder, TaskFilter, TaskSort};
use crate::service::TaskService;

pub const DASHBOARD_LIST_LEN: usize = 5;

/// Look-back window for completion rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Week,
    Month,
    Year,
    #[default]
    ThirtyDays,
}

impl Period {
    /// Unknown strings fall back to the 30-day window.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "week" => Self::Week,
            "month" => Self::Month,
            "year" => Self::Year,
            _ => Self::ThirtyDays,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
            Self::ThirtyDays => "thirty_days",
        }
    }

    /// Start of the window ending at `now`. Months are calendar months.
    pub fn start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let months = |n| now.checked_sub_months(Months::new(n));
        match self {
            Self::Week => now - Duration::days(7),
            Self::Month => months(1).unwrap_or(now - Duration::days(30)),
            Self::Year => months(12).unwrap_or(now - Duration::days(365)),
            Self::ThirtyDays => now - Duration::days(30),
        }
    }
}

/// Completion figures for tasks due inside a period. Tasks without a due
/// date never count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionReport {
    pub period: Period,
    pub completion_rate: f64,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub active_tasks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overdue_tasks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overdue_rate: Option<f64>,
}

impl CompletionReport {
    /// The counts come from separate queries, so `completed_tasks` may
    /// exceed `total_tasks` under a concurrent writer.
    pub fn new(
        period: Period,
        total_tasks: usize,
        completed_tasks: usize,
        overdue_tasks: Option<usize>,
    ) -> Self {
        Self {
            period,
            completion_rate: percent(completed_tasks, total_tasks),
            total_tasks,
            completed_tasks,
            active_tasks: total_tasks.saturating_sub(completed_tasks),
            overdue_tasks,
            overdue_rate: overdue_tasks
                .filter(|_| total_tasks > 0)
                .map(|n| percent(n, total_tasks)),
        }
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// Count tasks per priority and status. Every variant is present.
pub fn breakdowns<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
) -> (BTreeMap<Priority, usize>, BTreeMap<Status, usize>) {
    let mut by_priority: BTreeMap<Priority, usize> =
        Priority::ALL.iter().map(|p| (*p, 0)).collect();
    let mut by_status: BTreeMap<Status, usize> = Status::ALL.iter().map(|s| (*s, 0)).collect();
    for task in tasks {
        *by_priority.entry(task.priority).or_default() += 1;
        *by_status.entry(task.status).or_default() += 1;
    }
    (by_priority, by_status)
}

/// Read-only aggregates over the task set.
pub struct Analytics<'a> {
    tasks: &'a TaskService,
}

impl<'a> Analytics<'a> {
    pub fn new(tasks: &'a TaskService) -> Self {
        Self { tasks }
    }

    pub fn stats(&self) -> Result<TaskStats> {
        self.tasks.store().stats()
    }

    pub fn dashboard_stats(&self) -> Result<DashboardStats> {
        let store = self.tasks.store();
        let task_stats = store.stats()?;
        let recent = store.recent(DASHBOARD_LIST_LEN)?;
        let upcoming = store.upcoming(DASHBOARD_LIST_LEN)?;

        let mut seen = BTreeSet::new();
        let loaded = recent
            .iter()
            .chain(upcoming.iter())
            .filter(|t| seen.insert(t.id));
        let (priority_breakdown, status_breakdown) = breakdowns(loaded);

        Ok(DashboardStats {
            task_stats,
            priority_breakdown,
            status_breakdown,
            recent_tasks: self.tasks.views(recent),
            upcoming_tasks: self.tasks.views(upcoming),
        })
    }

    pub fn completion_rate(&self, period: Period) -> Result<CompletionReport> {
        let now = self.tasks.now();
        let window = TaskFilter::default().due_between(period.start(now), now);
        let sort = TaskSort::default();

        let total_tasks = self.tasks.get_tasks(&window, &sort)?.len();
        let completed_tasks = self
            .tasks
            .get_tasks(&window.clone().status(Status::Completed), &sort)?
            .len();

        let overdue = match self.overdue_tasks() {
            Ok(overdue) => Some(overdue.len()),
            Err(e) => {
                log::warn!("completion rate: overdue lookup failed: {e}");
                None
            }
        };
        Ok(CompletionReport::new(period, total_tasks, completed_tasks, overdue))
    }

    /// Active tasks past their due date, most overdue first.
    pub fn overdue_tasks(&self) -> Result<Vec<Task>> {
        let filter = TaskFilter::default()
            .status(Status::Active)
            .date(DateFilter::Overdue);
        let sort = TaskSort::new(SortField::DueDate, SortOrder::Asc);
        self.tasks.get_tasks(&filter, &sort)
    }

    /// Active high-priority tasks, newest first.
    pub fn high_priority_tasks(&self) -> Result<Vec<Task>> {
        let filter = TaskFilter::default()
            .status(Status::Active)
            .priority(Priority::High);
        self.tasks.get_tasks(&filter, &TaskSort::default())
    }

    /// Active tasks grouped by priority; all three groups are always present.
    pub fn tasks_by_priority(&self) -> Result<BTreeMap<Priority, Vec<TaskView>>> {
        let filter = TaskFilter::default().status(Status::Active);
        let sort = TaskSort::new(SortField::Priority, SortOrder::Desc);
        let tasks = self.tasks.get_tasks(&filter, &sort)?;

        let mut groups: BTreeMap<Priority, Vec<TaskView>> =
            Priority::ALL.iter().map(|p| (*p, Vec::new())).collect();
        for view in self.tasks.views(tasks) {
            groups.entry(view.task.priority).or_default().push(view);
        }
        Ok(groups)
    }
}
