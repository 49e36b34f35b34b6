//! Business rules around the task store: field validation, creation
//! defaults, completed-task immutability, the archive rule and pagination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{NewTask, Priority, Status, Task, TaskView};
use crate::query::{TaskFilter, TaskSort};
use crate::store::TaskStore;
use crate::validate::{validate_description, validate_due_date, validate_id, validate_title};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// `None` becomes `medium`.
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Full replacement of a task's editable fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdateTaskRequest {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub archived: bool,
}

impl UpdateTaskRequest {
    /// A request that leaves every field of `task` as it is.
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            due_date: task.due_date,
            archived: task.archived,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskPage {
    pub tasks: Vec<TaskView>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub filter: TaskFilter,
    pub sort: TaskSort,
}

/// Clamp a requested page and page size to usable values.
pub fn clamp_page(page: i64, page_size: i64) -> (usize, usize) {
    let page = usize::try_from(page.max(1)).unwrap_or(1);
    let page_size = match usize::try_from(page_size) {
        Ok(size) if (1..=MAX_PAGE_SIZE).contains(&size) => size,
        _ => DEFAULT_PAGE_SIZE,
    };
    (page, page_size)
}

pub struct TaskService {
    store: TaskStore,
}

impl TaskService {
    pub fn new(store: TaskStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.store.now()
    }

    pub fn view(&self, task: Task) -> TaskView {
        TaskView::new(task, self.now())
    }

    pub fn views(&self, tasks: Vec<Task>) -> Vec<TaskView> {
        let now = self.now();
        tasks.into_iter().map(|t| TaskView::new(t, now)).collect()
    }

    pub fn create_task(&self, req: CreateTaskRequest) -> Result<Task> {
        let title = validate_title(&req.title)?;
        validate_description(&req.description)?;
        validate_due_date(req.due_date, self.now())?;

        let task = self.store.create(&NewTask {
            title: title.to_string(),
            description: req.description,
            status: Status::Active,
            priority: req.priority.unwrap_or_default(),
            due_date: req.due_date,
        })?;
        log::info!("created task {} ({})", task.id, task.priority);
        Ok(task)
    }

    pub fn update_task(&self, req: &UpdateTaskRequest) -> Result<Task> {
        validate_id(req.id)?;
        let title = validate_title(&req.title)?;
        validate_description(&req.description)?;
        validate_due_date(req.due_date, self.now())?;

        let existing = self.store.get_by_id(req.id)?;
        if existing.status == Status::Completed
            && (title != existing.title || req.priority != existing.priority)
        {
            return Err(Error::conflict(
                "update",
                req.id,
                "cannot change title or priority of a completed task",
            ));
        }
        if req.archived && !existing.archived && existing.status != Status::Completed {
            return Err(Error::conflict(
                "update",
                req.id,
                "only completed tasks can be archived",
            ));
        }

        let task = Task {
            title: title.to_string(),
            description: req.description.clone(),
            priority: req.priority,
            due_date: req.due_date,
            archived: req.archived,
            ..existing
        };
        self.store.update(&task)
    }

    pub fn delete_task(&self, id: i64) -> Result<()> {
        validate_id(id)?;
        self.store.get_by_id(id)?;
        self.store.delete(id)?;
        log::info!("deleted task {id}");
        Ok(())
    }

    /// Flip active <-> completed and return the task as stored afterwards.
    pub fn toggle_status(&self, id: i64) -> Result<Task> {
        validate_id(id)?;
        let task = self.store.get_by_id(id)?;
        match task.status {
            Status::Active => {
                if task.is_overdue(self.now()) {
                    log::info!("task {id} completed after its due date");
                }
                self.store.mark_completed(id)?;
            }
            Status::Completed => self.store.mark_active(id)?,
        }
        self.store.get_by_id(id)
    }

    pub fn get_tasks(&self, filter: &TaskFilter, sort: &TaskSort) -> Result<Vec<Task>> {
        filter.validate()?;
        self.store.get_all(filter, sort)
    }

    pub fn get_task_by_id(&self, id: i64) -> Result<Task> {
        validate_id(id)?;
        self.store.get_by_id(id)
    }

    pub fn get_tasks_paged(
        &self,
        filter: &TaskFilter,
        sort: &TaskSort,
        page: i64,
        page_size: i64,
    ) -> Result<TaskPage> {
        let (page, page_size) = clamp_page(page, page_size);
        let all = self.get_tasks(filter, sort)?;
        let total_count = all.len();
        let start = (page - 1).saturating_mul(page_size);
        let tasks = all.into_iter().skip(start).take(page_size).collect();
        Ok(TaskPage {
            tasks: self.views(tasks),
            total_count,
            page,
            page_size,
            filter: filter.clone(),
            sort: *sort,
        })
    }
}
