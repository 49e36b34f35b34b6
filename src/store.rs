use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, ToSql};

use crate::clock::Clock;
use crate::db::{decode_ts, encode_ts};
use crate::error::{Error, Result, StorageContext};
use crate::model::{NewTask, Task, TaskStats};
use crate::query::{start_of_day, where_clause, TaskFilter, TaskSort};

const TASK_COLUMNS: &str = "id, title, description, status, priority, due_date, archived, \
                            created_at, updated_at, completed_at";

fn ts(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    decode_ts(idx, &raw)
}

fn opt_ts(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|r| decode_ts(idx, &r)).transpose()
}

fn read_task_row(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        priority: row.get(4)?,
        due_date: opt_ts(row, 5)?,
        archived: row.get(6)?,
        created_at: ts(row, 7)?,
        updated_at: ts(row, 8)?,
        completed_at: opt_ts(row, 9)?,
    })
}

fn count_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<usize> {
    let n: i64 = row.get(idx)?;
    Ok(usize::try_from(n).unwrap_or_default())
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

const INSERT_TASK: &str = "
INSERT INTO tasks (title, description, status, priority, due_date, created_at, updated_at, completed_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, CASE WHEN ?3 = 'completed' THEN ?6 END)
RETURNING id, title, description, status, priority, due_date, archived,
          created_at, updated_at, completed_at
";

const UPDATE_TASK: &str = "
UPDATE tasks
SET title = ?2, description = ?3, priority = ?4, due_date = ?5, archived = ?6,
    updated_at = ?7
WHERE id = ?1
RETURNING id, title, description, status, priority, due_date, archived,
          created_at, updated_at, completed_at
";

const SET_COMPLETED: &str = "
UPDATE tasks
SET status = 'completed', completed_at = ?2, updated_at = ?2
WHERE id = ?1
";

const SET_ACTIVE: &str = "
UPDATE tasks
SET status = 'active', completed_at = NULL, updated_at = ?2
WHERE id = ?1
";

const TASK_STATS: &str = "
SELECT
    COUNT(*),
    COUNT(CASE WHEN status = 'active' THEN 1 END),
    COUNT(CASE WHEN status = 'completed' THEN 1 END),
    COUNT(CASE WHEN status = 'active' AND due_date < ?1 THEN 1 END),
    COUNT(CASE WHEN status = 'active' AND due_date >= ?2 AND due_date < ?3 THEN 1 END),
    COUNT(CASE WHEN status = 'active' AND due_date >= ?1 AND due_date <= ?4 THEN 1 END)
FROM tasks
";

/// Durable task storage. Every mutation is a single statement; there is no
/// locking beyond what SQLite provides.
pub struct TaskStore {
    conn: Connection,
    clock: Arc<dyn Clock>,
}

impl TaskStore {
    pub fn new(conn: Connection, clock: Arc<dyn Clock>) -> Self {
        Self { conn, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert a task. Identity and timestamps are assigned here.
    pub fn create(&self, task: &NewTask) -> Result<Task> {
        let now = encode_ts(&self.now());
        let created = self
            .conn
            .query_row(
                INSERT_TASK,
                rusqlite::params![
                    task.title,
                    task.description,
                    task.status,
                    task.priority,
                    task.due_date.as_ref().map(encode_ts),
                    now,
                ],
                read_task_row,
            )
            .storage("create")?;
        log::debug!("created task {} '{}'", created.id, created.title);
        Ok(created)
    }

    pub fn get_by_id(&self, id: i64) -> Result<Task> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
        self.conn
            .query_row(&query, [id], read_task_row)
            .optional()
            .storage("get")?
            .ok_or(Error::NotFound { op: "get", id })
    }

    pub fn get_all(&self, filter: &TaskFilter, sort: &TaskSort) -> Result<Vec<Task>> {
        let (where_sql, params) = where_clause(&filter.predicates(self.now()));
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks {where_sql} {}",
            sort.order_by()
        );
        log::debug!("list tasks: {query}");
        let params: Vec<&dyn ToSql> = params.iter().map(AsRef::as_ref).collect();
        let mut stmt = self.conn.prepare(&query).storage("list")?;
        let rows = stmt
            .query_map(params.as_slice(), read_task_row)
            .storage("list")?;
        rows.collect::<rusqlite::Result<Vec<_>>>().storage("list")
    }

    pub fn count(&self, filter: &TaskFilter) -> Result<usize> {
        let (where_sql, params) = where_clause(&filter.predicates(self.now()));
        let query = format!("SELECT COUNT(*) FROM tasks {where_sql}");
        let params: Vec<&dyn ToSql> = params.iter().map(AsRef::as_ref).collect();
        self.conn
            .query_row(&query, params.as_slice(), |row| count_col(row, 0))
            .storage("count")
    }

    /// Full-row update of the mutable fields; refreshes `updated_at`.
    pub fn update(&self, task: &Task) -> Result<Task> {
        let now = encode_ts(&self.now());
        self.conn
            .query_row(
                UPDATE_TASK,
                rusqlite::params![
                    task.id,
                    task.title,
                    task.description,
                    task.priority,
                    task.due_date.as_ref().map(encode_ts),
                    task.archived,
                    now,
                ],
                read_task_row,
            )
            .optional()
            .storage("update")?
            .ok_or(Error::NotFound {
                op: "update",
                id: task.id,
            })
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", [id])
            .storage("delete")?;
        if changed == 0 {
            return Err(Error::NotFound { op: "delete", id });
        }
        log::debug!("deleted task {id}");
        Ok(())
    }

    pub fn mark_completed(&self, id: i64) -> Result<()> {
        self.set_status(SET_COMPLETED, "mark completed", id)
    }

    pub fn mark_active(&self, id: i64) -> Result<()> {
        self.set_status(SET_ACTIVE, "mark active", id)
    }

    fn set_status(&self, sql: &str, op: &'static str, id: i64) -> Result<()> {
        let now = encode_ts(&self.now());
        let changed = self
            .conn
            .execute(sql, rusqlite::params![id, now])
            .storage(op)?;
        if changed == 0 {
            return Err(Error::NotFound { op, id });
        }
        Ok(())
    }

    pub fn stats(&self) -> Result<TaskStats> {
        let now = self.now();
        let day = start_of_day(now);
        self.conn
            .query_row(
                TASK_STATS,
                rusqlite::params![
                    encode_ts(&now),
                    encode_ts(&day),
                    encode_ts(&(day + Duration::days(1))),
                    encode_ts(&(now + Duration::days(7))),
                ],
                |row| {
                    Ok(TaskStats {
                        total_tasks: count_col(row, 0)?,
                        active_tasks: count_col(row, 1)?,
                        completed_tasks: count_col(row, 2)?,
                        overdue_tasks: count_col(row, 3)?,
                        today_tasks: count_col(row, 4)?,
                        week_tasks: count_col(row, 5)?,
                    })
                },
            )
            .storage("stats")
    }

    /// Most recently created tasks, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<Task>> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at DESC, id DESC LIMIT ?1"
        );
        let mut stmt = self.conn.prepare(&query).storage("recent")?;
        let rows = stmt
            .query_map([limit_param(limit)], read_task_row)
            .storage("recent")?;
        rows.collect::<rusqlite::Result<Vec<_>>>().storage("recent")
    }

    /// Active tasks due now or later, soonest first.
    pub fn upcoming(&self, limit: usize) -> Result<Vec<Task>> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE status = 'active' AND due_date IS NOT NULL AND due_date >= ?1 \
             ORDER BY due_date ASC, id ASC LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&query).storage("upcoming")?;
        let rows = stmt
            .query_map(
                rusqlite::params![encode_ts(&self.now()), limit_param(limit)],
                read_task_row,
            )
            .storage("upcoming")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .storage("upcoming")
    }
}
