//! Filters and sort orders for task listings, and their translation
//! into parameterized SQL.

use chrono::{DateTime, Duration, Utc};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

use crate::db::encode_ts;
use crate::error::{Error, Result};
use crate::model::{Priority, Status};
use crate::validate::validate_year;

pub const MAX_SEARCH_LEN: usize = 255;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFilter {
    #[default]
    All,
    Today,
    Week,
    Overdue,
}

impl DateFilter {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "" | "all" => Ok(Self::All),
            "today" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            "overdue" => Ok(Self::Overdue),
            _ => Err(Error::validation(
                "date filter",
                format!("'{s}' must be all, today, week, or overdue"),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskFilter {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
    pub date: DateFilter,
    pub due_from: Option<DateTime<Utc>>,
    pub due_to: Option<DateTime<Utc>>,
    /// `None` matches archived and non-archived tasks alike.
    pub archived: Option<bool>,
}

impl TaskFilter {
    #[must_use]
    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    #[must_use]
    pub fn date(mut self, date: DateFilter) -> Self {
        self.date = date;
        self
    }

    #[must_use]
    pub fn due_between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.due_from = Some(from);
        self.due_to = Some(to);
        self
    }

    #[must_use]
    pub fn archived(mut self, archived: bool) -> Self {
        self.archived = Some(archived);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(from) = self.due_from {
            validate_year("due_from", from)?;
        }
        if let Some(to) = self.due_to {
            validate_year("due_to", to)?;
        }
        if let (Some(from), Some(to)) = (self.due_from, self.due_to) {
            if from > to {
                return Err(Error::validation(
                    "due date range",
                    format!("from ({from}) is after to ({to})"),
                ));
            }
        }
        if let Some(text) = &self.search {
            if text.chars().count() > MAX_SEARCH_LEN {
                return Err(Error::validation(
                    "search",
                    format!("must be at most {MAX_SEARCH_LEN} characters"),
                ));
            }
        }
        Ok(())
    }

    /// One predicate per non-empty field; the caller ANDs them together.
    pub fn predicates(&self, now: DateTime<Utc>) -> Vec<Predicate> {
        let mut preds = Vec::new();
        if let Some(status) = self.status {
            preds.push(Predicate::StatusIs(status));
        }
        if let Some(priority) = self.priority {
            preds.push(Predicate::PriorityIs(priority));
        }
        if let Some(archived) = self.archived {
            preds.push(Predicate::ArchivedIs(archived));
        }
        if let Some(text) = self.search.as_deref().map(str::trim) {
            if !text.is_empty() {
                preds.push(Predicate::TextContains(text.to_string()));
            }
        }
        match self.date {
            DateFilter::All => {}
            DateFilter::Today => {
                let start = start_of_day(now);
                preds.push(Predicate::DueOnOrAfter(start));
                preds.push(Predicate::DueBefore(start + Duration::days(1)));
            }
            DateFilter::Week => {
                preds.push(Predicate::DueOnOrAfter(now));
                preds.push(Predicate::DueOnOrBefore(now + Duration::days(7)));
            }
            DateFilter::Overdue => {
                preds.push(Predicate::StatusIs(Status::Active));
                preds.push(Predicate::DueBefore(now));
            }
        }
        if let Some(from) = self.due_from {
            preds.push(Predicate::DueOnOrAfter(from));
        }
        if let Some(to) = self.due_to {
            preds.push(Predicate::DueOnOrBefore(to));
        }
        preds
    }
}

/// Midnight UTC of the day containing `ts`.
pub fn start_of_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(ts, |midnight| midnight.and_utc())
}

/// The closed set of conditions a listing can be narrowed by. Comparisons
/// against a NULL due date are never true, so due-date predicates only ever
/// match dated tasks.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    StatusIs(Status),
    PriorityIs(Priority),
    ArchivedIs(bool),
    /// Case-insensitive substring match on title or description, with
    /// Unicode case folding through `taskdesk_lower`.
    TextContains(String),
    DueOnOrAfter(DateTime<Utc>),
    DueBefore(DateTime<Utc>),
    DueOnOrBefore(DateTime<Utc>),
}

impl Predicate {
    fn sql(&self) -> &'static str {
        match self {
            Self::StatusIs(_) => "status = ?",
            Self::PriorityIs(_) => "priority = ?",
            Self::ArchivedIs(_) => "archived = ?",
            Self::TextContains(_) => "(taskdesk_lower(title) LIKE ? ESCAPE '\\' \
                 OR taskdesk_lower(description) LIKE ? ESCAPE '\\')",
            Self::DueOnOrAfter(_) => "due_date >= ?",
            Self::DueBefore(_) => "due_date < ?",
            Self::DueOnOrBefore(_) => "due_date <= ?",
        }
    }

    fn push_params(&self, params: &mut Vec<Box<dyn ToSql>>) {
        match self {
            Self::StatusIs(s) => params.push(Box::new(*s)),
            Self::PriorityIs(p) => params.push(Box::new(*p)),
            Self::ArchivedIs(a) => params.push(Box::new(*a)),
            Self::TextContains(text) => {
                let pattern = format!("%{}%", escape_like(&text.to_lowercase()));
                params.push(Box::new(pattern.clone()));
                params.push(Box::new(pattern));
            }
            Self::DueOnOrAfter(ts) | Self::DueBefore(ts) | Self::DueOnOrBefore(ts) => {
                params.push(Box::new(encode_ts(ts)));
            }
        }
    }
}

/// Escape LIKE wildcards so user text matches literally.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Render predicates as a `WHERE` clause (empty when there are none) and the
/// parameters to bind, in placeholder order.
pub fn where_clause(predicates: &[Predicate]) -> (String, Vec<Box<dyn ToSql>>) {
    let mut params = Vec::new();
    if predicates.is_empty() {
        return (String::new(), params);
    }
    let conditions: Vec<&str> = predicates
        .iter()
        .map(|p| {
            p.push_params(&mut params);
            p.sql()
        })
        .collect();
    (format!("WHERE {}", conditions.join(" AND ")), params)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Priority,
    DueDate,
    Title,
    Status,
}

impl SortField {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "created_at" => Ok(Self::CreatedAt),
            "updated_at" => Ok(Self::UpdatedAt),
            "priority" => Ok(Self::Priority),
            "due_date" => Ok(Self::DueDate),
            "title" => Ok(Self::Title),
            "status" => Ok(Self::Status),
            _ => Err(Error::validation(
                "sort field",
                format!(
                    "'{s}' must be created_at, updated_at, priority, due_date, title, or status"
                ),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(Error::validation(
                "sort order",
                format!("'{s}' must be asc or desc"),
            )),
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Defaults to newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSort {
    pub field: SortField,
    pub order: SortOrder,
}

const PRIORITY_RANK: &str =
    "CASE priority WHEN 'low' THEN 1 WHEN 'medium' THEN 2 WHEN 'high' THEN 3 END";

impl TaskSort {
    pub fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    /// `ORDER BY` clause. Priority sorts by severity, undated tasks go last
    /// when sorting by due date ascending, and `id` breaks ties.
    pub fn order_by(&self) -> String {
        let dir = self.order.sql();
        let key = match self.field {
            SortField::CreatedAt => format!("created_at {dir}"),
            SortField::UpdatedAt => format!("updated_at {dir}"),
            SortField::Priority => format!("{PRIORITY_RANK} {dir}"),
            SortField::DueDate => match self.order {
                SortOrder::Asc => "due_date ASC NULLS LAST".to_string(),
                SortOrder::Desc => "due_date DESC NULLS FIRST".to_string(),
            },
            SortField::Title => format!("title {dir}"),
            SortField::Status => format!("status {dir}"),
        };
        format!("ORDER BY {key}, id {dir}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 14, 15, 30, 0).unwrap()
    }

    #[test]
    fn empty_filter_has_no_where() {
        let (sql, params) = where_clause(&TaskFilter::default().predicates(now()));
        assert!(sql.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn predicates_are_anded_with_matching_params() {
        let filter = TaskFilter::default()
            .status(Status::Active)
            .priority(Priority::High)
            .search("milk");
        let (sql, params) = where_clause(&filter.predicates(now()));
        assert_eq!(
            sql,
            "WHERE status = ? AND priority = ? AND (taskdesk_lower(title) LIKE ? ESCAPE '\\' \
             OR taskdesk_lower(description) LIKE ? ESCAPE '\\')"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn blank_search_is_ignored() {
        let filter = TaskFilter::default().search("   ");
        assert!(filter.predicates(now()).is_empty());
    }

    #[test]
    fn today_spans_the_utc_day() {
        let preds = TaskFilter::default().date(DateFilter::Today).predicates(now());
        let midnight = Utc.with_ymd_and_hms(2026, 5, 14, 0, 0, 0).unwrap();
        assert_eq!(
            preds,
            vec![
                Predicate::DueOnOrAfter(midnight),
                Predicate::DueBefore(midnight + Duration::days(1)),
            ]
        );
    }

    #[test]
    fn overdue_implies_active() {
        let preds = TaskFilter::default()
            .date(DateFilter::Overdue)
            .predicates(now());
        assert_eq!(
            preds,
            vec![Predicate::StatusIs(Status::Active), Predicate::DueBefore(now())]
        );
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let from = now() - Duration::days(3);
        let preds = TaskFilter::default().due_between(from, now()).predicates(now());
        assert_eq!(
            preds,
            vec![Predicate::DueOnOrAfter(from), Predicate::DueOnOrBefore(now())]
        );
    }

    #[test]
    fn reversed_range_is_invalid() {
        let filter = TaskFilter::default().due_between(now(), now() - Duration::days(1));
        assert!(matches!(
            filter.validate(),
            Err(Error::Validation { field: "due date range", .. })
        ));
        let same = TaskFilter::default().due_between(now(), now());
        assert!(same.validate().is_ok());
    }

    #[test]
    fn out_of_range_year_bounds_are_invalid() {
        let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        let filter = TaskFilter::default().due_between(now(), far);
        assert!(matches!(
            filter.validate(),
            Err(Error::Validation { field: "due_to", .. })
        ));
    }

    #[test]
    fn overlong_search_is_invalid() {
        let filter = TaskFilter::default().search("x".repeat(MAX_SEARCH_LEN + 1));
        assert!(filter.validate().is_err());
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn default_sort_is_newest_first() {
        assert_eq!(TaskSort::default().order_by(), "ORDER BY created_at DESC, id DESC");
    }

    #[test]
    fn priority_sort_uses_severity_rank() {
        let asc = TaskSort::new(SortField::Priority, SortOrder::Asc).order_by();
        assert!(asc.starts_with("ORDER BY CASE priority WHEN 'low' THEN 1"));
        assert!(asc.ends_with("END ASC, id ASC"));
    }

    #[test]
    fn wire_names_parse() {
        assert_eq!(SortField::parse("due_date").unwrap(), SortField::DueDate);
        assert!(SortField::parse("dueDate").is_err());
        assert_eq!(SortOrder::parse("asc").unwrap(), SortOrder::Asc);
        assert!(SortOrder::parse("up").is_err());
        assert_eq!(DateFilter::parse("").unwrap(), DateFilter::All);
        assert!(DateFilter::parse("month").is_err());
    }

    #[test]
    fn filter_deserializes_from_partial_json() {
        let filter: TaskFilter =
            serde_json::from_str(r#"{"status":"completed","date":"week"}"#).unwrap();
        assert_eq!(filter.status, Some(Status::Completed));
        assert_eq!(filter.date, DateFilter::Week);
        assert!(filter.archived.is_none());
        assert!(serde_json::from_str::<TaskFilter>(r#"{"priority":"urgent"}"#).is_err());
    }
}
