//! Front-end bindings. Arguments arrive as plain strings and numbers the way
//! a desktop shell passes them; unknown enum strings fall back to defaults.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::analytics::{Analytics, CompletionReport, Period};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db;
use crate::error::{Error, Result};
use crate::export::{self, ExportFormat};
use crate::model::{DashboardStats, Priority, Status, TaskStats, TaskView};
use crate::query::{SortField, SortOrder, TaskFilter, TaskSort};
use crate::service::{CreateTaskRequest, TaskPage, TaskService, UpdateTaskRequest};
use crate::store::TaskStore;

/// Parse a `YYYY-MM-DD` due date as midnight UTC. Empty means no due date.
pub fn parse_due_date(s: &str) -> Result<Option<DateTime<Utc>>> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| Error::validation("due_date", format!("'{s}' is not a YYYY-MM-DD date")))?;
    Ok(date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()))
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

pub struct App {
    service: TaskService,
}

impl App {
    /// Open the configured database, creating the schema if needed.
    pub fn open(config: &Config) -> Result<Self> {
        let conn = db::open(&config.db_path(), config.busy_timeout_ms())?;
        Self::with_connection(conn, Arc::new(SystemClock))
    }

    pub fn with_connection(conn: Connection, clock: Arc<dyn Clock>) -> Result<Self> {
        db::init(&conn)?;
        Ok(Self {
            service: TaskService::new(TaskStore::new(conn, clock)),
        })
    }

    pub fn in_memory(clock: Arc<dyn Clock>) -> Result<Self> {
        Self::with_connection(db::open_memory()?, clock)
    }

    pub fn service(&self) -> &TaskService {
        &self.service
    }

    fn analytics(&self) -> Analytics<'_> {
        Analytics::new(&self.service)
    }

    pub fn get_tasks(&self, filter: &TaskFilter, sort: &TaskSort) -> Result<Vec<TaskView>> {
        let tasks = self.service.get_tasks(filter, sort)?;
        Ok(self.service.views(tasks))
    }

    pub fn create_task(
        &self,
        title: &str,
        description: &str,
        priority: &str,
        due_date: &str,
    ) -> Result<TaskView> {
        let req = CreateTaskRequest {
            title: title.to_string(),
            description: description.to_string(),
            priority: Some(Priority::from_wire(priority)),
            due_date: parse_due_date(due_date)?,
        };
        let task = self.service.create_task(req)?;
        Ok(self.service.view(task))
    }

    /// Every non-archived task, newest first.
    pub fn get_all_tasks(&self) -> Result<Vec<TaskView>> {
        self.get_tasks(&TaskFilter::default().archived(false), &TaskSort::default())
    }

    /// Empty `status` or `priority` means "any".
    pub fn list_tasks(&self, status: &str, priority: &str, archived: bool) -> Result<Vec<TaskView>> {
        let mut filter = TaskFilter::default().archived(archived);
        if !status.is_empty() {
            filter = filter.status(Status::from_wire(status));
        }
        if !priority.is_empty() {
            filter = filter.priority(Priority::from_wire(priority));
        }
        self.get_tasks(&filter, &TaskSort::default())
    }

    pub fn get_task(&self, id: i64) -> Result<TaskView> {
        let task = self.service.get_task_by_id(id)?;
        Ok(self.service.view(task))
    }

    /// Replace the editable fields. The archived flag is left as stored.
    pub fn update_task(
        &self,
        id: i64,
        title: &str,
        description: &str,
        priority: &str,
        due_date: &str,
    ) -> Result<TaskView> {
        let due_date = parse_due_date(due_date)?;
        let existing = self.service.get_task_by_id(id)?;
        let req = UpdateTaskRequest {
            id,
            title: title.to_string(),
            description: description.to_string(),
            priority: Priority::from_wire(priority),
            due_date,
            archived: existing.archived,
        };
        let task = self.service.update_task(&req)?;
        Ok(self.service.view(task))
    }

    pub fn delete_task(&self, id: i64) -> Result<()> {
        self.service.delete_task(id)
    }

    pub fn toggle_status(&self, id: i64) -> Result<TaskView> {
        let task = self.service.toggle_status(id)?;
        Ok(self.service.view(task))
    }

    pub fn get_stats(&self) -> Result<TaskStats> {
        self.analytics().stats()
    }

    pub fn get_dashboard_stats(&self) -> Result<DashboardStats> {
        self.analytics().dashboard_stats()
    }

    pub fn archive_task(&self, id: i64) -> Result<TaskView> {
        let task = self.service.get_task_by_id(id)?;
        if task.status != Status::Completed {
            return Err(Error::conflict(
                "archive",
                id,
                "task must be completed before archiving",
            ));
        }
        let mut req = UpdateTaskRequest::from_task(&task);
        req.archived = true;
        let task = self.service.update_task(&req)?;
        Ok(self.service.view(task))
    }

    /// Archived tasks, most recently touched first.
    pub fn get_archived_tasks(&self) -> Result<Vec<TaskView>> {
        self.get_tasks(
            &TaskFilter::default().archived(true),
            &TaskSort::new(SortField::UpdatedAt, SortOrder::Desc),
        )
    }

    pub fn get_tasks_page(
        &self,
        filter: &TaskFilter,
        sort: &TaskSort,
        page: i64,
        page_size: i64,
    ) -> Result<TaskPage> {
        self.service.get_tasks_paged(filter, sort, page, page_size)
    }

    pub fn get_completion_rate(&self, period: &str) -> Result<CompletionReport> {
        self.analytics().completion_rate(Period::from_wire(period))
    }

    pub fn get_overdue_tasks(&self) -> Result<Vec<TaskView>> {
        let tasks = self.analytics().overdue_tasks()?;
        Ok(self.service.views(tasks))
    }

    pub fn get_high_priority_tasks(&self) -> Result<Vec<TaskView>> {
        let tasks = self.analytics().high_priority_tasks()?;
        Ok(self.service.views(tasks))
    }

    pub fn get_tasks_by_priority(&self) -> Result<BTreeMap<Priority, Vec<TaskView>>> {
        self.analytics().tasks_by_priority()
    }

    /// Render the filtered task list, newest first.
    pub fn export(&self, format: ExportFormat, filter: &TaskFilter) -> Result<String> {
        let tasks = self.get_tasks(filter, &TaskSort::default())?;
        log::info!("exporting {} tasks as {}", tasks.len(), format.extension());
        export::render(format, &tasks, filter, self.service.now())
    }

    pub fn health_check(&self) -> HealthReport {
        let ping = self
            .service
            .store()
            .connection()
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0));
        let (status, database, database_error) = match ping {
            Ok(_) => ("ok", "ok", None),
            Err(e) => ("error", "error", Some(e.to_string())),
        };
        HealthReport {
            status,
            database,
            database_error,
            timestamp: self.service.now(),
        }
    }
}
