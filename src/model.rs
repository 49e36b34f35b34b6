use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Completed,
}

impl Status {
    pub const ALL: [Status; 2] = [Status::Active, Status::Completed];

    /// Strict parse; unknown values are a validation error.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            _ => Err(Error::validation(
                "status",
                format!("'{s}' must be active or completed"),
            )),
        }
    }

    /// Permissive parse used by the front-end bindings: anything that is not
    /// a known status string maps to `Active`.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "active" => Self::Active,
            _ => Self::Active,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::Active => ".",
            Self::Completed => "x",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Self::parse(s).map_err(|_| FromSqlError::Other(format!("unknown status '{s}'").into()))
    }
}

/// Task priority. Variant order is severity order, so `Ord` sorts
/// low < medium < high.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(Error::validation(
                "priority",
                format!("'{s}' must be low, medium, or high"),
            )),
        }
    }

    /// Permissive parse used by the front-end bindings: unknown or empty
    /// strings map to `Medium`.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Priority {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Self::parse(s).map_err(|_| FromSqlError::Other(format!("unknown priority '{s}'").into()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// An active task whose due date has passed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == Status::Active && self.due_date.is_some_and(|due| due < now)
    }

    pub fn icon(&self) -> &'static str {
        self.status.icon()
    }
}

/// Fields the store needs to insert a task; identity and timestamps are
/// assigned on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: Status,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
}

/// A task as handed to callers, with derived fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub is_overdue: bool,
}

impl TaskView {
    pub fn new(task: Task, now: DateTime<Utc>) -> Self {
        let is_overdue = task.is_overdue(now);
        Self { task, is_overdue }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total_tasks: usize,
    pub active_tasks: usize,
    pub completed_tasks: usize,
    pub overdue_tasks: usize,
    pub today_tasks: usize,
    pub week_tasks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub task_stats: TaskStats,
    pub priority_breakdown: BTreeMap<Priority, usize>,
    pub status_breakdown: BTreeMap<Status, usize>,
    pub recent_tasks: Vec<TaskView>,
    pub upcoming_tasks: Vec<TaskView>,
}
